//! Free-text search over issue bodies.

use std::collections::HashMap;

use crate::issues::IssueRecord;
use crate::semantic::embeddings::Embedder;
use crate::semantic::index::SimilarityIndex;
use crate::semantic::SimilarityError;

/// Default number of issues returned for a query.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// An issue matched by a query.
#[derive(Debug, Clone)]
pub struct SearchHit<'a> {
    pub record: &'a IssueRecord,
    /// The cleaned body that was embedded
    pub text: &'a str,
    /// Cosine similarity between the query and the cleaned body
    pub score: f32,
}

/// Query-time view over an index of issue bodies.
///
/// Holds the embedder the index was built with, the index itself, and the
/// records with their cleaned bodies keyed by id so hits can be resolved
/// back to issues.
pub struct IssueSearch<'e, E: Embedder + ?Sized, I: SimilarityIndex> {
    embedder: &'e E,
    index: I,
    records: HashMap<u64, (IssueRecord, String)>,
}

impl<'e, E: Embedder + ?Sized, I: SimilarityIndex> IssueSearch<'e, E, I> {
    /// The first record seen for an id is the one hits resolve to.
    pub fn new(
        embedder: &'e E,
        index: I,
        records: impl IntoIterator<Item = (IssueRecord, String)>,
    ) -> Self {
        let mut by_id = HashMap::new();
        for (record, text) in records {
            by_id.entry(record.id).or_insert((record, text));
        }
        Self {
            embedder,
            index,
            records: by_id,
        }
    }

    /// Number of searchable issues.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Return the `k` issues whose bodies are closest to `query`.
    ///
    /// No score cutoff is applied; callers judge relevance from the scores.
    pub fn search_text(&self, query: &str, k: usize) -> Result<Vec<SearchHit<'_>>, SimilarityError> {
        let query_embedding = self.embedder.embed(query)?;
        let results = self.index.search(&[query_embedding], k)?;

        let hits = results
            .into_iter()
            .flat_map(|result| result.neighbors)
            .filter_map(|neighbor| match self.records.get(&neighbor.id) {
                Some((record, text)) => Some(SearchHit {
                    record,
                    text,
                    score: neighbor.score,
                }),
                None => {
                    log::warn!("Index returned unknown issue id {}", neighbor.id);
                    None
                }
            })
            .collect();

        Ok(hits)
    }
}
