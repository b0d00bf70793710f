use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::semantic::duplicates::{DEFAULT_DUPLICATE_THRESHOLD, DEFAULT_NEIGHBORS};
use crate::semantic::embeddings::DEFAULT_BATCH_SIZE;
use crate::semantic::preprocess::DEFAULT_BOILERPLATE_PHRASES;
use crate::semantic::search::DEFAULT_SEARCH_LIMIT;
use crate::semantic::DEFAULT_MODEL;

/// Default directory for downloaded model files
const DEFAULT_CACHE_DIR: &str = ".issue-radar";
/// Path segment that marks a pull request URL
const DEFAULT_PULL_REQUEST_URL_PATTERN: &str = "/pull/";
/// Heading of the pull request template
const DEFAULT_PULL_REQUEST_BODY_MARKER: &str = "### What changes are included in this PR?";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config is malformed: {0}")]
    Malformed(#[from] serde_yml::Error),

    #[error("Invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Embedding model settings
#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name for embeddings (e.g., "all-MiniLM-L6-v2")
    #[serde(default = "default_model")]
    pub model: String,

    /// Directory where model files are cached
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Texts per model call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            cache_dir: default_cache_dir(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Duplicate detection settings
#[derive(Clone, Debug, Deserialize)]
pub struct DuplicatesConfig {
    /// Similarity a neighbor must exceed to count as a duplicate [-1.0, 1.0]
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Neighbors fetched per issue, the issue itself included
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,
}

impl Default for DuplicatesConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DUPLICATE_THRESHOLD,
            neighbors: DEFAULT_NEIGHBORS,
        }
    }
}

/// Semantic search settings
#[derive(Clone, Debug, Deserialize)]
pub struct SearchConfig {
    /// Number of issues returned per query
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

/// Corpus filtering and cleaning settings
#[derive(Clone, Debug, Deserialize)]
pub struct FilterConfig {
    /// Issues whose URL contains this are pull requests. Empty disables the check.
    #[serde(default = "default_pull_request_url_pattern")]
    pub pull_request_url_pattern: String,

    /// Bodies containing this are pull request descriptions. Empty disables the check.
    #[serde(default = "default_pull_request_body_marker")]
    pub pull_request_body_marker: String,

    /// Template phrases stripped from bodies before embedding
    #[serde(default = "default_boilerplate_phrases")]
    pub boilerplate_phrases: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            pull_request_url_pattern: default_pull_request_url_pattern(),
            pull_request_body_marker: default_pull_request_body_marker(),
            boilerplate_phrases: default_boilerplate_phrases(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_threshold() -> f32 {
    DEFAULT_DUPLICATE_THRESHOLD
}

fn default_neighbors() -> usize {
    DEFAULT_NEIGHBORS
}

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

fn default_pull_request_url_pattern() -> String {
    DEFAULT_PULL_REQUEST_URL_PATTERN.to_string()
}

fn default_pull_request_body_marker() -> String {
    DEFAULT_PULL_REQUEST_BODY_MARKER.to_string()
}

fn default_boilerplate_phrases() -> Vec<String> {
    DEFAULT_BOILERPLATE_PHRASES
        .iter()
        .map(|p| p.to_string())
        .collect()
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub duplicates: DuplicatesConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub filters: FilterConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let emb = &self.embedding;
        if emb.model.trim().is_empty() {
            return Err(ConfigError::invalid("embedding.model", "must not be empty"));
        }
        if emb.batch_size == 0 {
            return Err(ConfigError::invalid(
                "embedding.batch_size",
                "must be greater than 0",
            ));
        }

        let dup = &self.duplicates;
        if !(-1.0..=1.0).contains(&dup.threshold) {
            return Err(ConfigError::invalid(
                "duplicates.threshold",
                format!("must be between -1.0 and 1.0, got {}", dup.threshold),
            ));
        }
        // One neighbor is only the issue itself.
        if dup.neighbors < 2 {
            return Err(ConfigError::invalid(
                "duplicates.neighbors",
                format!("must be at least 2, got {}", dup.neighbors),
            ));
        }

        if self.search.limit == 0 {
            return Err(ConfigError::invalid("search.limit", "must be greater than 0"));
        }

        Ok(())
    }

    /// Load config from a YAML file, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let config_str =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                        path: path.to_path_buf(),
                        source,
                    })?;
                log::debug!("Loaded config from {}", path.display());
                Self::from_yaml(&config_str)?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(config_str: &str) -> Result<Self, ConfigError> {
        if config_str.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(config_str)?)
    }
}
