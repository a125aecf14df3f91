//! Candidate Filter
//!
//! Decides, entry by entry, whether a fetched item belongs in this run's
//! digest. Checks run in a fixed order and stop at the first rejection:
//!
//! 1. publication time inside the recency window
//! 2. not in the excluded language
//! 3. URL / title not already accepted earlier in this run
//! 4. URL / title not delivered in a previous run
//!
//! Accepted entries register their keys in the run's batch set so the same
//! story found through a second query is not counted twice.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use digest_core::{Candidate, FeedEntry, FingerprintPair, SeenItem, TimestampError};
use digest_news::{strip_tags, LanguageDetector};

use crate::fingerprint::fingerprint;

/// How an entry published exactly at the recency cutoff is treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecencyBoundary {
    /// Published at the cutoff is still recent
    #[default]
    Inclusive,
    /// Published at the cutoff is too old
    Exclusive,
}

impl RecencyBoundary {
    /// `cutoff` is `None` when the window reaches past the earliest
    /// representable time, in which case everything is recent.
    fn is_recent(self, published_at: DateTime<Utc>, cutoff: Option<DateTime<Utc>>) -> bool {
        let Some(cutoff) = cutoff else {
            return true;
        };
        match self {
            RecencyBoundary::Inclusive => published_at >= cutoff,
            RecencyBoundary::Exclusive => published_at > cutoff,
        }
    }
}

/// Two sets of non-empty dedup keys
#[derive(Debug, Clone, Default)]
pub struct KeySets {
    url_keys: HashSet<String>,
    title_keys: HashSet<String>,
}

impl KeySets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Membership sets for everything already delivered
    pub fn from_seen(items: &[SeenItem]) -> Self {
        let mut sets = Self::new();
        for item in items {
            sets.insert_url(&item.url_key);
            sets.insert_title(&item.title_key);
        }
        sets
    }

    pub fn contains_url(&self, key: &str) -> bool {
        !key.is_empty() && self.url_keys.contains(key)
    }

    pub fn contains_title(&self, key: &str) -> bool {
        !key.is_empty() && self.title_keys.contains(key)
    }

    /// Register both keys of a pair; empty keys are skipped
    pub fn insert(&mut self, pair: &FingerprintPair) {
        self.insert_url(&pair.url_key);
        self.insert_title(&pair.title_key);
    }

    fn insert_url(&mut self, key: &str) {
        if !key.is_empty() {
            self.url_keys.insert(key.to_string());
        }
    }

    fn insert_title(&mut self, key: &str) {
        if !key.is_empty() {
            self.title_keys.insert(key.to_string());
        }
    }

    pub fn url_count(&self) -> usize {
        self.url_keys.len()
    }

    pub fn title_count(&self) -> usize {
        self.title_keys.len()
    }
}

/// Why an entry was left out
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    MissingTimestamp,
    UnparseableTimestamp,
    TooOld,
    ExcludedLanguage,
    DuplicateUrlInBatch,
    DuplicateTitleInBatch,
    SeenUrl,
    SeenTitle,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Rejection::MissingTimestamp => "missing timestamp",
            Rejection::UnparseableTimestamp => "unparseable timestamp",
            Rejection::TooOld => "outside recency window",
            Rejection::ExcludedLanguage => "excluded language",
            Rejection::DuplicateUrlInBatch => "duplicate url in run",
            Rejection::DuplicateTitleInBatch => "duplicate title in run",
            Rejection::SeenUrl => "url already delivered",
            Rejection::SeenTitle => "title already delivered",
        };
        f.write_str(label)
    }
}

/// Outcome of evaluating one entry
#[derive(Debug, Clone)]
pub enum Decision {
    Accept(Candidate),
    Reject(Rejection),
}

impl Decision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Decision::Accept(_))
    }
}

/// Applies the recency, language and dedup checks to fetched entries
#[derive(Clone)]
pub struct CandidateFilter {
    window: Duration,
    boundary: RecencyBoundary,
    language: Arc<dyn LanguageDetector>,
}

impl CandidateFilter {
    pub fn new(
        window: Duration,
        boundary: RecencyBoundary,
        language: Arc<dyn LanguageDetector>,
    ) -> Self {
        Self {
            window,
            boundary,
            language,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Evaluate `entry`, registering its keys in `batch` when accepted.
    pub fn evaluate(
        &self,
        entry: &FeedEntry,
        now: DateTime<Utc>,
        seen: &KeySets,
        batch: &mut KeySets,
    ) -> Decision {
        let published_at = match entry.published_at() {
            Ok(ts) => ts,
            Err(TimestampError::Missing) => return Decision::Reject(Rejection::MissingTimestamp),
            Err(TimestampError::Unparseable(_)) => {
                return Decision::Reject(Rejection::UnparseableTimestamp)
            }
        };

        let cutoff = now.checked_sub_signed(self.window);
        if !self.boundary.is_recent(published_at, cutoff) {
            return Decision::Reject(Rejection::TooOld);
        }

        let title = entry.title.trim();
        let url = entry.link.trim();

        let lang_text = format!("{}\n{}", title, strip_tags(&entry.summary));
        if self.language.is_excluded(lang_text.trim()) {
            return Decision::Reject(Rejection::ExcludedLanguage);
        }

        let keys = fingerprint(url, title);

        if batch.contains_url(&keys.url_key) {
            return Decision::Reject(Rejection::DuplicateUrlInBatch);
        }
        if batch.contains_title(&keys.title_key) {
            return Decision::Reject(Rejection::DuplicateTitleInBatch);
        }
        if seen.contains_url(&keys.url_key) {
            return Decision::Reject(Rejection::SeenUrl);
        }
        if seen.contains_title(&keys.title_key) {
            return Decision::Reject(Rejection::SeenTitle);
        }

        batch.insert(&keys);

        Decision::Accept(Candidate {
            title: title.to_string(),
            url: url.to_string(),
            published_at,
            fingerprint: keys,
            query: entry.query.clone(),
        })
    }

    /// Boolean form of [`CandidateFilter::evaluate`]
    pub fn accept(
        &self,
        entry: &FeedEntry,
        now: DateTime<Utc>,
        seen: &KeySets,
        batch: &mut KeySets,
    ) -> bool {
        self.evaluate(entry, now, seen, batch).is_accept()
    }
}

impl fmt::Debug for CandidateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateFilter")
            .field("window", &self.window)
            .field("boundary", &self.boundary)
            .finish_non_exhaustive()
    }
}
