//! Embedding-based similarity over issue text.
//!
//! # Architecture
//!
//! - `preprocess`: Cleans issue bodies before embedding
//! - `embeddings`: Embedder trait plus the fastembed-backed model
//! - `index`: Similarity index trait and the exact in-memory backend
//! - `duplicates`: Greedy duplicate pair selection
//! - `search`: Free-text search over issue bodies
//! - `service`: Runs both pipelines end to end

pub mod duplicates;
pub mod embeddings;
pub mod index;
pub mod preprocess;
pub mod search;
mod service;

pub use duplicates::select_duplicates;
pub use embeddings::{Embedder, EmbeddingError, EmbeddingModel};
pub use index::{FlatIndex, SimilarityIndex};
pub use search::SearchHit;
pub use service::{DuplicateMatch, IssueSimilarityService, SimilarityError};

/// Default embedding model name
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";
