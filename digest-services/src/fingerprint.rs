//! Fingerprint Generator
//!
//! Turns a raw URL and title into two dedup keys. The same story is often
//! syndicated with a different `[Source]` or `(Site)` tag, so bracketed and
//! parenthesized segments are dropped from titles before hashing.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use digest_core::FingerprintPair;

static FRAGMENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#.*$").unwrap_or_else(|_| unreachable!()));

static WHITESPACE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").unwrap_or_else(|_| unreachable!()));

static BRACKETED_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap_or_else(|_| unreachable!()));

static PARENTHESIZED_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^\)]*\)").unwrap_or_else(|_| unreachable!()));

/// Trim and drop the `#fragment`. Query string, scheme and case are kept.
pub fn normalize_url(url: &str) -> String {
    FRAGMENT_PATTERN.replace(url.trim(), "").into_owned()
}

/// Lowercase, strip `[...]` / `(...)` segments and collapse whitespace.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let collapsed = WHITESPACE_PATTERN.replace_all(&lowered, " ");
    let no_brackets = BRACKETED_PATTERN.replace_all(&collapsed, " ");
    let no_parens = PARENTHESIZED_PATTERN.replace_all(&no_brackets, " ");
    WHITESPACE_PATTERN
        .replace_all(&no_parens, " ")
        .trim()
        .to_string()
}

/// Hex SHA-256 of `namespace::value`, or empty when `value` is empty
fn key(namespace: &str, value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }

    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b"::");
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compute the URL and title keys for an item
pub fn fingerprint(url: &str, title: &str) -> FingerprintPair {
    FingerprintPair {
        url_key: key("url", &normalize_url(url)),
        title_key: key("title", &normalize_title(title)),
    }
}
