//! Rendering of duplicate reports and search results.

use std::fmt::Write;

use clap::ValueEnum;
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Serialize;

use crate::semantic::{DuplicateMatch, SearchHit};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Html,
    Text,
    Json,
}

#[derive(Clone, Debug, Serialize)]
pub struct DuplicateEntry {
    pub issue_url: String,
    pub issue_title: String,
    pub duplicate_url: String,
    pub duplicate_title: String,
    pub score: f32,
}

impl From<&DuplicateMatch<'_>> for DuplicateEntry {
    fn from(m: &DuplicateMatch<'_>) -> Self {
        Self {
            issue_url: m.issue.url.clone(),
            issue_title: m.issue.title.clone(),
            duplicate_url: m.duplicate.url.clone(),
            duplicate_title: m.duplicate.title.clone(),
            score: m.score,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchEntry {
    pub body: String,
    pub score: f32,
    pub url: String,
}

impl From<&SearchHit<'_>> for SearchEntry {
    fn from(hit: &SearchHit<'_>) -> Self {
        Self {
            body: hit.text.to_string(),
            score: hit.score,
            url: hit.record.url.clone(),
        }
    }
}

pub fn render_duplicates(entries: &[DuplicateEntry], format: ReportFormat) -> anyhow::Result<String> {
    Ok(match format {
        ReportFormat::Html => duplicates_html(entries),
        ReportFormat::Text => duplicates_text(entries),
        ReportFormat::Json => serde_json::to_string_pretty(entries)?,
    })
}

pub fn render_search(entries: &[SearchEntry], format: ReportFormat) -> anyhow::Result<String> {
    Ok(match format {
        ReportFormat::Json => serde_json::to_string_pretty(entries)?,
        // No HTML layout for search hits; print them as text.
        ReportFormat::Html | ReportFormat::Text => search_text(entries),
    })
}

fn duplicates_html(entries: &[DuplicateEntry]) -> String {
    entries
        .iter()
        .map(|e| {
            format!(
                "\n<br>\n<b>Issue:</b> <a target=\"blank\" href=\"{}\">{}</a><br>\n<b>Duplicate:</b> <a target=\"blank\" href=\"{}\">{}</a><br>\n<b>Score:</b> {:.3}<br>\n<br>\n",
                encode_double_quoted_attribute(&e.issue_url),
                encode_text(&e.issue_title),
                encode_double_quoted_attribute(&e.duplicate_url),
                encode_text(&e.duplicate_title),
                e.score
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn duplicates_text(entries: &[DuplicateEntry]) -> String {
    let mut out = String::new();
    for e in entries {
        let _ = writeln!(out, "Issue:     {} ({})", e.issue_title, e.issue_url);
        let _ = writeln!(out, "Duplicate: {} ({})", e.duplicate_title, e.duplicate_url);
        let _ = writeln!(out, "Score:     {:.3}", e.score);
        out.push('\n');
    }
    out
}

fn search_text(entries: &[SearchEntry]) -> String {
    let mut out = String::new();
    for e in entries {
        let _ = writeln!(out, "{}\nscore: {:.4}\n{}\n", e.body, e.score, e.url);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> DuplicateEntry {
        DuplicateEntry {
            issue_url: "https://github.com/apache/arrow/issues/1".to_string(),
            issue_title: "Fix memory leak in reader".to_string(),
            duplicate_url: "https://github.com/apache/arrow/issues/2".to_string(),
            duplicate_title: "Memory leak in <Reader> is not fixed".to_string(),
            score: 0.93,
        }
    }

    #[test]
    fn test_html_block() {
        let html = render_duplicates(&[entry()], ReportFormat::Html).unwrap();
        assert!(html.contains(
            "<b>Issue:</b> <a target=\"blank\" href=\"https://github.com/apache/arrow/issues/1\">Fix memory leak in reader</a><br>"
        ));
        assert!(html.contains("Memory leak in &lt;Reader&gt; is not fixed"));
        assert!(html.contains("<b>Score:</b> 0.930<br>"));
    }

    #[test]
    fn test_html_empty() {
        assert_eq!(render_duplicates(&[], ReportFormat::Html).unwrap(), "");
    }

    #[test]
    fn test_text_report() {
        let text = render_duplicates(&[entry()], ReportFormat::Text).unwrap();
        assert!(text.starts_with("Issue:     Fix memory leak in reader"));
        assert!(text.contains("Score:     0.930"));
    }

    #[test]
    fn test_json_report() {
        let json = render_duplicates(&[entry()], ReportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["duplicate_url"], "https://github.com/apache/arrow/issues/2");
    }

    #[test]
    fn test_search_text() {
        let entries = vec![SearchEntry {
            body: "decimal precision rounding".to_string(),
            score: 0.5,
            url: "https://github.com/apache/arrow/issues/9".to_string(),
        }];
        let text = render_search(&entries, ReportFormat::Text).unwrap();
        assert_eq!(
            text,
            "decimal precision rounding\nscore: 0.5000\nhttps://github.com/apache/arrow/issues/9\n\n"
        );
    }

    #[test]
    fn test_html_escapes_href_quotes() {
        let mut e = entry();
        e.issue_url = "https://example.com/?a=1&b=\"x\"".to_string();
        e.issue_title = "R&D \"quoted\"".to_string();
        let html = render_duplicates(&[e], ReportFormat::Html).unwrap();
        assert!(html.contains("href=\"https://example.com/?a=1&amp;b=&quot;x&quot;\""));
        assert!(html.contains(">R&amp;D \"quoted\"</a>"));
    }
}
