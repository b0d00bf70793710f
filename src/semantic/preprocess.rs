//! Issue body cleaning for embedding generation.
//!
//! Issue bodies carry a lot of noise that drowns the signal an embedding
//! model picks up: template prompts, stack traces in code fences, links.
//! Cleaning runs in a fixed order:
//! 1. Remove template boilerplate phrases
//! 2. Drop blank lines
//! 3. Remove fenced code blocks, inline code and indented code lines
//! 4. Remove URLs
//! 5. Drop lines left blank by the removals

use once_cell::sync::Lazy;
use regex::Regex;

/// Template prompts found in issue bodies opened through the issue forms.
pub const DEFAULT_BOILERPLATE_PHRASES: &[&str] = &[
    "### Describe the enhancement requested",
    "### Describe the bug, including details regarding any error messages, version, and platform.",
    "### Component(s)",
    "### Describe the usage question you have. Please include as many useful details as  possible.",
];

static FENCED_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```.*?\n.*?```").expect("Failed to compile fenced code regex")
});

static INLINE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`[^`]*`").expect("Failed to compile inline code regex"));

static INDENTED_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(?: {4,}|\t).*\n?").expect("Failed to compile indented code regex")
});

// Trailing spaces go with the URL so "http://x more" leaves "more", not " more".
static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:https?://\S+|www\.\S+|ftp://\S+)[ \t]*").expect("Failed to compile URL regex")
});

/// Cleans issue bodies before they are embedded.
#[derive(Debug, Clone)]
pub struct BodyCleaner {
    phrases: Vec<String>,
}

impl Default for BodyCleaner {
    fn default() -> Self {
        Self::new(DEFAULT_BOILERPLATE_PHRASES.iter().map(|p| p.to_string()))
    }
}

impl BodyCleaner {
    /// Create a cleaner that strips the given boilerplate phrases.
    pub fn new(phrases: impl IntoIterator<Item = String>) -> Self {
        Self {
            phrases: phrases.into_iter().filter(|p| !p.is_empty()).collect(),
        }
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    /// Clean a raw issue body.
    ///
    /// A missing body cleans to an empty string. Cleaning is best effort and
    /// never fails: malformed markdown just gets mangled a little.
    pub fn clean(&self, raw: Option<&str>) -> String {
        let Some(raw) = raw else {
            return String::new();
        };

        let mut body = raw.to_string();
        for phrase in &self.phrases {
            body = body.replace(phrase.as_str(), "");
        }

        let body = collapse_blank_lines(&body);
        let body = remove_code_chunks(&body);
        let body = remove_urls(&body);

        collapse_blank_lines(&body)
    }
}

/// Keep only the lines that have something other than whitespace on them.
pub fn collapse_blank_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove fenced code blocks, inline code spans and indented code lines.
pub fn remove_code_chunks(text: &str) -> String {
    let text = FENCED_CODE.replace_all(text, "");
    let text = INLINE_CODE.replace_all(&text, "");
    INDENTED_CODE.replace_all(&text, "").into_owned()
}

/// Remove http(s), ftp and www-prefixed links.
pub fn remove_urls(text: &str) -> String {
    URL.replace_all(text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_body_is_empty() {
        let cleaner = BodyCleaner::default();
        assert_eq!(cleaner.clean(None), "");
    }

    #[test]
    fn test_code_block_and_url_removed() {
        let cleaner = BodyCleaner::default();
        let body = "Some text\n```\ncode here\n```\nhttp://example.com more text";
        assert_eq!(cleaner.clean(Some(body)), "Some text\nmore text");
    }

    #[test]
    fn test_clean_input_round_trip() {
        let cleaner = BodyCleaner::default();
        let body = "Reading a dataset fails\n\n  when the schema has nested lists\n\nThanks!\n";
        assert_eq!(cleaner.clean(Some(body)), collapse_blank_lines(body));
        assert_eq!(
            cleaner.clean(Some(body)),
            "Reading a dataset fails\n  when the schema has nested lists\nThanks!"
        );
    }

    #[test]
    fn test_boilerplate_removed() {
        let cleaner = BodyCleaner::default();
        let body = "### Describe the enhancement requested\n\nSupport decimal256 in the CSV reader\n\n### Component(s)\n\nC++";
        assert_eq!(
            cleaner.clean(Some(body)),
            "Support decimal256 in the CSV reader\nC++"
        );
    }

    #[test]
    fn test_custom_phrases() {
        let cleaner = BodyCleaner::new(vec!["## Steps".to_string(), String::new()]);
        assert_eq!(cleaner.phrases().len(), 1);
        assert_eq!(cleaner.clean(Some("## Steps\nrun it")), "run it");
    }

    #[test]
    fn test_inline_code_removed() {
        assert_eq!(
            remove_code_chunks("call `read_table()` twice"),
            "call  twice"
        );
    }

    #[test]
    fn test_indented_code_removed() {
        let text = "Traceback:\n    File \"x.py\", line 1\n\tboom\nafter";
        assert_eq!(remove_code_chunks(text), "Traceback:\nafter");
    }

    #[test]
    fn test_three_space_indent_is_kept() {
        let text = "list:\n   - item";
        assert_eq!(remove_code_chunks(text), text);
    }

    #[test]
    fn test_urls_removed() {
        assert_eq!(
            remove_urls("see https://github.com/a/b/issues/1 and www.example.org"),
            "see and "
        );
        assert_eq!(remove_urls("mirror ftp://host/path"), "mirror ");
    }

    #[test]
    fn test_line_with_only_url_dropped() {
        let cleaner = BodyCleaner::default();
        assert_eq!(
            cleaner.clean(Some("first\n  https://example.com/x\nlast")),
            "first\nlast"
        );
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("\n a\n\t\n\nb \n\n"), " a\nb ");
    }
}
