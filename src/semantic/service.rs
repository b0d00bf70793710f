//! Issue similarity service.
//!
//! Wires the pipeline stages together for both capabilities:
//! - duplicate detection over open issue titles
//! - semantic search over cleaned issue bodies
//!
//! The embedder is owned by the service and handed to each stage; indexes
//! are built per call and never persisted.

use std::collections::{HashMap, HashSet};

use crate::config::{Config, DuplicatesConfig, FilterConfig};
use crate::issues::{self, IssueRecord};
use crate::semantic::duplicates::select_duplicates;
use crate::semantic::embeddings::{Embedder, EmbeddingError};
use crate::semantic::index::{FlatIndex, IndexError, SimilarityIndex};
use crate::semantic::preprocess::BodyCleaner;
use crate::semantic::search::IssueSearch;

/// Errors that can occur during similarity operations.
#[derive(Debug, thiserror::Error)]
pub enum SimilarityError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),
}

/// A duplicate pair resolved back to its issues.
#[derive(Debug, Clone)]
pub struct DuplicateMatch<'a> {
    pub issue: &'a IssueRecord,
    pub duplicate: &'a IssueRecord,
    pub score: f32,
}

pub struct IssueSimilarityService<E: Embedder> {
    embedder: E,
    duplicates: DuplicatesConfig,
    filters: FilterConfig,
    cleaner: BodyCleaner,
}

impl<E: Embedder> IssueSimilarityService<E> {
    pub fn new(embedder: E, config: &Config) -> Self {
        Self {
            embedder,
            duplicates: config.duplicates.clone(),
            filters: config.filters.clone(),
            cleaner: BodyCleaner::new(config.filters.boilerplate_phrases.iter().cloned()),
        }
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Find likely duplicates among open, non-PR issue titles.
    ///
    /// Returns pairs best first; every issue appears in at most one pair.
    pub fn find_duplicates<'a>(
        &self,
        issues: &'a [IssueRecord],
    ) -> Result<Vec<DuplicateMatch<'a>>, SimilarityError> {
        let candidates = issues::duplicate_candidates(issues);
        log::info!(
            "Checking {} open issues for duplicates (threshold {:.2}, k {})",
            candidates.len(),
            self.duplicates.threshold,
            self.duplicates.neighbors
        );

        let texts = candidates
            .iter()
            .map(|issue| (issue.id, issue.title.trim().to_string()));
        let index = self.build_index(texts)?;

        if index.is_empty() {
            log::info!("No titles to compare");
            return Ok(Vec::new());
        }

        let neighbors = index.search_indexed(self.duplicates.neighbors)?;
        let pairs = select_duplicates(&neighbors, self.duplicates.threshold);

        let mut by_id: HashMap<u64, &IssueRecord> = HashMap::with_capacity(candidates.len());
        for issue in &candidates {
            by_id.entry(issue.id).or_insert(*issue);
        }

        let matches: Vec<DuplicateMatch<'a>> = pairs
            .into_iter()
            .filter_map(|pair| {
                let issue = by_id.get(&pair.issue).copied()?;
                let duplicate = by_id.get(&pair.duplicate).copied()?;
                Some(DuplicateMatch {
                    issue,
                    duplicate,
                    score: pair.score,
                })
            })
            .collect();

        log::info!("Found {} likely duplicate pairs", matches.len());
        Ok(matches)
    }

    /// Build a searchable index over cleaned issue bodies.
    pub fn body_search(
        &self,
        issues: &[IssueRecord],
    ) -> Result<IssueSearch<'_, E, FlatIndex>, SimilarityError> {
        let corpus = issues::searchable_issues(issues, &self.filters);
        log::info!("Indexing {} issue bodies", corpus.len());

        let cleaned: Vec<(&IssueRecord, String)> = corpus
            .into_iter()
            .map(|issue| (issue, self.cleaner.clean(issue.body.as_deref())))
            .collect();
        let index = self.build_index(
            cleaned
                .iter()
                .map(|(issue, text)| (issue.id, text.clone())),
        )?;

        let records: Vec<(IssueRecord, String)> = cleaned
            .into_iter()
            .filter(|(issue, _)| index.contains(issue.id))
            .map(|(issue, text)| (issue.clone(), text))
            .collect();
        Ok(IssueSearch::new(&self.embedder, index, records))
    }

    /// Embed `(id, text)` pairs and index them.
    ///
    /// Empty texts are never embedded, and vectors the model returns with
    /// zero norm are dropped; both just leave the issue out of the index.
    /// Only the first record with a given id is indexed.
    fn build_index(
        &self,
        texts: impl Iterator<Item = (u64, String)>,
    ) -> Result<FlatIndex, SimilarityError> {
        let mut seen = HashSet::new();
        let (ids, texts): (Vec<u64>, Vec<String>) = texts
            .filter(|(id, text)| {
                if text.is_empty() {
                    log::debug!("Skipping issue {} with empty text", id);
                    return false;
                }
                if !seen.insert(*id) {
                    log::warn!("Skipping repeated issue id {}", id);
                    return false;
                }
                true
            })
            .unzip();

        let embeddings = self.embedder.embed_batch(&texts)?;
        if embeddings.len() != ids.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: ids.len(),
                got: embeddings.len(),
            }
            .into());
        }

        let entries = ids.into_iter().zip(embeddings).filter(|(id, embedding)| {
            if embedding.iter().all(|x| *x == 0.0) {
                log::warn!("Skipping issue {}: model returned a zero vector", id);
                return false;
            }
            true
        });

        Ok(FlatIndex::build(self.embedder.dimensions(), entries)?)
    }
}
