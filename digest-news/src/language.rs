//! Language detection for excluding domestic-language coverage
//!
//! The digest is meant for foreign-press mentions, so entries written in
//! Korean are dropped. Detection sits behind [`LanguageDetector`] so the
//! heuristic can be replaced without touching the candidate filter.

use std::sync::LazyLock;

use regex::Regex;

/// Markup tags, as found in feed summaries
static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^<]+?>").unwrap_or_else(|_| unreachable!()));

/// Decides whether a piece of text is in the excluded language
pub trait LanguageDetector: Send + Sync {
    /// `true` when the text should be excluded from the digest
    fn is_excluded(&self, text: &str) -> bool;
}

/// Flags any text containing a precomposed Hangul syllable
#[derive(Debug, Clone, Copy, Default)]
pub struct HangulDetector;

impl HangulDetector {
    pub fn new() -> Self {
        Self
    }
}

impl LanguageDetector for HangulDetector {
    fn is_excluded(&self, text: &str) -> bool {
        text.chars().any(|c| ('\u{AC00}'..='\u{D7A3}').contains(&c))
    }
}

impl<F> LanguageDetector for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_excluded(&self, text: &str) -> bool {
        self(text)
    }
}

/// Replace every markup tag with a space
pub fn strip_tags(html: &str) -> String {
    TAG_PATTERN.replace_all(html, " ").into_owned()
}
