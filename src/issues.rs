//! Issue records and the corpus filters applied before embedding.
//!
//! Issues are read from a JSON array, optionally gzip compressed, in the
//! shape the GitHub issues API returns. Only the fields the pipeline needs
//! are kept.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::Value;

use crate::config::FilterConfig;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed issue data: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IssueState {
    Open,
    Closed,
    Other(String),
}

impl IssueState {
    fn parse(state: Option<&str>) -> Self {
        match state.map(|s| s.to_lowercase()) {
            Some(s) if s == "open" => IssueState::Open,
            Some(s) if s == "closed" => IssueState::Closed,
            Some(s) => IssueState::Other(s),
            None => IssueState::Other(String::new()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct IssueRecord {
    pub id: u64,
    pub title: String,
    /// `None` when the source body was missing or not a string
    pub body: Option<String>,
    pub state: IssueState,
    pub url: String,
    pub is_pull_request: bool,
}

/// Issue object as found in the input file.
#[derive(Debug, Deserialize)]
struct RawIssue {
    #[serde(default)]
    number: Option<u64>,
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Value,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    pull_request: Value,
}

impl RawIssue {
    fn into_record(self, position: usize, filters: &FilterConfig) -> IssueRecord {
        let url = self.html_url.or(self.url).unwrap_or_default();
        let is_pull_request = has_pull_request_marker(&self.pull_request)
            || (!filters.pull_request_url_pattern.is_empty()
                && url.contains(&filters.pull_request_url_pattern));

        IssueRecord {
            id: self.number.or(self.id).unwrap_or(position as u64),
            title: self.title.unwrap_or_default(),
            body: match self.body {
                Value::String(body) => Some(body),
                _ => None,
            },
            state: IssueState::parse(self.state.as_deref()),
            url,
            is_pull_request,
        }
    }
}

/// A marker counts when it is present and not empty.
fn has_pull_request_marker(marker: &Value) -> bool {
    match marker {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}

/// Load issues from a JSON array file, gunzipping it if needed.
pub fn load_issues(path: &Path, filters: &FilterConfig) -> Result<Vec<IssueRecord>, LoadError> {
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;

    let issues = parse_issues(&bytes, filters)?;
    log::info!("Loaded {} issues from {}", issues.len(), path.display());
    Ok(issues)
}

/// Parse issues from raw bytes, gzip or plain JSON.
pub fn parse_issues(bytes: &[u8], filters: &FilterConfig) -> Result<Vec<IssueRecord>, LoadError> {
    let raw: Vec<RawIssue> = if bytes.starts_with(&GZIP_MAGIC) {
        serde_json::from_reader(GzDecoder::new(bytes))?
    } else {
        serde_json::from_slice(bytes)?
    };

    Ok(raw
        .into_iter()
        .enumerate()
        .map(|(position, issue)| issue.into_record(position, filters))
        .collect())
}

/// Open issues that are not pull requests: the duplicate detection corpus.
pub fn duplicate_candidates(issues: &[IssueRecord]) -> Vec<&IssueRecord> {
    issues
        .iter()
        .filter(|issue| issue.state == IssueState::Open && !issue.is_pull_request)
        .collect()
}

/// Issues with a real body that are not pull requests: the search corpus.
pub fn searchable_issues<'a>(
    issues: &'a [IssueRecord],
    filters: &FilterConfig,
) -> Vec<&'a IssueRecord> {
    issues
        .iter()
        .filter(|issue| !issue.is_pull_request)
        .filter(|issue| match &issue.body {
            Some(body) => {
                body.chars().count() > 1
                    && (filters.pull_request_body_marker.is_empty()
                        || !body.contains(&filters.pull_request_body_marker))
            }
            None => false,
        })
        .collect()
}
