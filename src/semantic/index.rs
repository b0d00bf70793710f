//! Nearest-neighbor index over issue embeddings.
//!
//! `SimilarityIndex` is the seam between the pipeline and the vector
//! backend. `FlatIndex` is the in-memory exact backend: vectors are unit
//! normalized at build time so the inner product is the cosine similarity.

use std::cmp::Ordering;
use std::collections::HashMap;

use rayon::prelude::*;

/// Search result from the vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Issue ID
    pub id: u64,
    /// Cosine similarity score (-1.0 to 1.0)
    pub score: f32,
}

/// Top-k neighbors for one query vector, best first.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborResult {
    /// ID of the indexed vector used as the query, `None` for ad hoc queries.
    pub source: Option<u64>,
    pub neighbors: Vec<SearchResult>,
}

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Cannot search an empty index")]
    Empty,

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Cannot store or search with zero-norm vector")]
    ZeroNormVector,

    #[error("Duplicate id in index: {0}")]
    DuplicateId(u64),

    #[error("Neighbor count must be at least 1")]
    InvalidK,
}

/// Top-k similarity search over a fixed set of vectors.
pub trait SimilarityIndex {
    /// Length of the indexed vectors.
    fn dimensions(&self) -> usize;

    /// Number of indexed vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the `k` nearest indexed vectors for each query vector.
    fn search(&self, queries: &[Vec<f32>], k: usize) -> Result<Vec<NeighborResult>, IndexError>;

    /// Search with every indexed vector as the query, in index order.
    ///
    /// Rank 0 of each result is the query's own entry.
    fn search_indexed(&self, k: usize) -> Result<Vec<NeighborResult>, IndexError>;
}

/// Scale `v` to unit L2 norm in place.
///
/// Returns `false` and leaves `v` untouched when it has zero norm.
pub fn normalize_l2(v: &mut [f32]) -> bool {
    let norm = l2_norm(v);
    if norm < f32::EPSILON {
        return false;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
    true
}

/// Compute L2 norm of a vector.
fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum::<f32>().clamp(-1.0, 1.0)
}

/// Higher score first, earlier position on ties.
fn by_score_desc(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(&b.0))
}

/// Exact in-memory index scored by inner product of unit vectors.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    ids: Vec<u64>,
    /// Unit-normalized, same order as `ids`
    vectors: Vec<Vec<f32>>,
    positions: HashMap<u64, usize>,
    dimensions: usize,
}

impl FlatIndex {
    /// Create a new empty index with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self {
            ids: Vec::new(),
            vectors: Vec::new(),
            positions: HashMap::new(),
            dimensions,
        }
    }

    /// Normalize and index `(id, embedding)` entries.
    ///
    /// An empty input builds an empty index; searching it is an error.
    pub fn build(
        dimensions: usize,
        entries: impl IntoIterator<Item = (u64, Vec<f32>)>,
    ) -> Result<Self, IndexError> {
        let entries = entries.into_iter();
        let mut index = Self::new(dimensions);
        index.ids.reserve(entries.size_hint().0);
        index.vectors.reserve(entries.size_hint().0);

        for (id, embedding) in entries {
            index.insert(id, embedding)?;
        }

        log::debug!("Built flat index with {} vectors of {} dims", index.len(), dimensions);
        Ok(index)
    }

    fn insert(&mut self, id: u64, mut embedding: Vec<f32>) -> Result<(), IndexError> {
        if embedding.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: embedding.len(),
            });
        }
        if self.positions.contains_key(&id) {
            return Err(IndexError::DuplicateId(id));
        }
        if !normalize_l2(&mut embedding) {
            return Err(IndexError::ZeroNormVector);
        }

        self.positions.insert(id, self.ids.len());
        self.ids.push(id);
        self.vectors.push(embedding);
        Ok(())
    }

    /// Check if an entry exists for the given ID.
    pub fn contains(&self, id: u64) -> bool {
        self.positions.contains_key(&id)
    }

    /// Get the normalized vector stored for an ID.
    pub fn get(&self, id: u64) -> Option<&[f32]> {
        self.positions.get(&id).map(|&pos| self.vectors[pos].as_slice())
    }

    fn check_searchable(&self, k: usize) -> Result<(), IndexError> {
        if self.vectors.is_empty() {
            return Err(IndexError::Empty);
        }
        if k == 0 {
            return Err(IndexError::InvalidK);
        }
        Ok(())
    }

    /// Score every indexed vector against a unit query, skipping `exclude`,
    /// and keep the best `k`.
    fn top_k(&self, query: &[f32], k: usize, exclude: Option<usize>) -> Vec<SearchResult> {
        if k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .filter(|(pos, _)| Some(*pos) != exclude)
            .map(|(pos, v)| (pos, dot(query, v)))
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, by_score_desc);
            scored.truncate(k);
        }
        scored.sort_by(by_score_desc);

        scored
            .into_iter()
            .map(|(pos, score)| SearchResult {
                id: self.ids[pos],
                score,
            })
            .collect()
    }
}

impl SimilarityIndex for FlatIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn search(&self, queries: &[Vec<f32>], k: usize) -> Result<Vec<NeighborResult>, IndexError> {
        self.check_searchable(k)?;

        let mut normalized = Vec::with_capacity(queries.len());
        for query in queries {
            if query.len() != self.dimensions {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dimensions,
                    got: query.len(),
                });
            }
            let mut query = query.clone();
            if !normalize_l2(&mut query) {
                return Err(IndexError::ZeroNormVector);
            }
            normalized.push(query);
        }

        Ok(normalized
            .par_iter()
            .map(|query| NeighborResult {
                source: None,
                neighbors: self.top_k(query, k, None),
            })
            .collect())
    }

    fn search_indexed(&self, k: usize) -> Result<Vec<NeighborResult>, IndexError> {
        self.check_searchable(k)?;

        // Self goes first explicitly: an identical vector elsewhere in the
        // index would otherwise tie with it at 1.0.
        Ok((0..self.vectors.len())
            .into_par_iter()
            .map(|pos| {
                let query = &self.vectors[pos];
                let mut neighbors = Vec::with_capacity(k);
                neighbors.push(SearchResult {
                    id: self.ids[pos],
                    score: dot(query, query),
                });
                neighbors.extend(self.top_k(query, k - 1, Some(pos)));
                NeighborResult {
                    source: Some(self.ids[pos]),
                    neighbors,
                }
            })
            .collect())
    }
}
