//! News data structures for the brand news digest

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::timestamp::{parse_timestamp, TimestampError};

/// A raw entry as returned by a feed fetcher, before any filtering
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Search query that produced this entry
    pub query: String,
    /// Entry title
    pub title: String,
    /// Article link
    pub link: String,
    /// Summary or description, may contain HTML markup
    #[serde(default)]
    pub summary: String,
    /// Published timestamp as it appeared in the feed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    /// Updated timestamp as it appeared in the feed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

impl FeedEntry {
    /// Resolve the entry's publication time.
    ///
    /// `published` is tried first, then `updated`; the first one that parses
    /// wins. When neither parses the last failure is reported.
    pub fn published_at(&self) -> Result<DateTime<Utc>, TimestampError> {
        let mut last_err = TimestampError::Missing;

        for raw in [self.published.as_deref(), self.updated.as_deref()]
            .into_iter()
            .flatten()
        {
            match parse_timestamp(raw) {
                Ok(ts) => return Ok(ts.with_timezone(&Utc)),
                Err(TimestampError::Missing) => {}
                Err(e) => last_err = e,
            }
        }

        Err(last_err)
    }
}

/// The two dedup keys derived from an item's URL and title.
///
/// An empty key means the normalized source field was empty; it never
/// matches anything, including another empty key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FingerprintPair {
    pub url_key: String,
    pub title_key: String,
}

impl FingerprintPair {
    /// URL key, if present
    pub fn url(&self) -> Option<&str> {
        (!self.url_key.is_empty()).then_some(self.url_key.as_str())
    }

    /// Title key, if present
    pub fn title(&self) -> Option<&str> {
        (!self.title_key.is_empty()).then_some(self.title_key.as_str())
    }
}

/// An entry that passed the candidate filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Trimmed title
    pub title: String,
    /// Trimmed link
    pub url: String,
    /// Publication time
    pub published_at: DateTime<Utc>,
    /// Dedup keys
    pub fingerprint: FingerprintPair,
    /// Query that surfaced the entry
    pub query: String,
}

/// A previously delivered item, as kept in the seen-set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeenItem {
    /// When the item was delivered
    #[serde(rename = "ts")]
    pub timestamp: DateTime<FixedOffset>,
    pub url_key: String,
    pub title_key: String,
    pub url: String,
    pub title: String,
}

impl SeenItem {
    /// Record a delivered candidate at `delivered_at`
    pub fn from_candidate(candidate: &Candidate, delivered_at: DateTime<FixedOffset>) -> Self {
        Self {
            timestamp: delivered_at,
            url_key: candidate.fingerprint.url_key.clone(),
            title_key: candidate.fingerprint.title_key.clone(),
            url: candidate.url.clone(),
            title: candidate.title.clone(),
        }
    }
}
