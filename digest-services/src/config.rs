//! Run configuration
//!
//! Everything a run needs is read once from the environment into explicit
//! structs and passed down; nothing below this module reads env vars.

use std::env;
use std::path::PathBuf;

use chrono::{Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use digest_core::DigestError;
use digest_news::get_brand_queries;

use crate::candidate_filter::RecencyBoundary;

/// Longest accepted retention window (100 years)
const MAX_KEEP_DAYS: i64 = 36_500;

/// Longest accepted recency window (10 years)
const MAX_RECENCY_HOURS: i64 = 87_600;

/// Settings for the dedup engine and digest rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    /// Seen-set file location
    #[serde(default = "default_seen_path")]
    pub seen_path: PathBuf,
    /// Days a delivered item stays in the seen-set
    #[serde(default = "default_keep_days")]
    pub keep_days: i64,
    /// How far back a publication time may be and still count as new
    #[serde(default = "default_recency_hours")]
    pub recency_hours: i64,
    /// Treatment of entries published exactly at the recency cutoff
    #[serde(default)]
    pub recency_boundary: RecencyBoundary,
    /// Maximum digest entries per message
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Offset used for displayed and persisted times, in hours east of UTC
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    /// Label printed after displayed times
    #[serde(default = "default_zone_label")]
    pub zone_label: String,
    /// Header text of the digest message
    #[serde(default = "default_digest_title")]
    pub digest_title: String,
    /// Search queries, fetched in this order
    #[serde(default = "get_brand_queries")]
    pub queries: Vec<String>,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            seen_path: default_seen_path(),
            keep_days: default_keep_days(),
            recency_hours: default_recency_hours(),
            recency_boundary: RecencyBoundary::default(),
            max_items: default_max_items(),
            utc_offset_hours: default_utc_offset_hours(),
            zone_label: default_zone_label(),
            digest_title: default_digest_title(),
            queries: get_brand_queries(),
        }
    }
}

impl DigestConfig {
    /// Load from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load using `lookup` to resolve variable names.
    ///
    /// Recognized keys: `SEEN_PATH`, `KEEP_DAYS`, `RECENCY_HOURS`,
    /// `RECENCY_BOUNDARY`, `MAX_ITEMS`, `DISPLAY_UTC_OFFSET_HOURS`,
    /// `DISPLAY_ZONE_LABEL`, `DIGEST_TITLE`, `NEWS_QUERIES` (JSON array).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get("SEEN_PATH") {
            config.seen_path = PathBuf::from(path.trim());
        }
        if let Some(raw) = get("KEEP_DAYS") {
            config.keep_days = parse_number("KEEP_DAYS", &raw)?;
        }
        if let Some(raw) = get("RECENCY_HOURS") {
            config.recency_hours = parse_number("RECENCY_HOURS", &raw)?;
        }
        if let Some(raw) = get("RECENCY_BOUNDARY") {
            config.recency_boundary = match raw.trim().to_ascii_lowercase().as_str() {
                "inclusive" => RecencyBoundary::Inclusive,
                "exclusive" => RecencyBoundary::Exclusive,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "RECENCY_BOUNDARY".to_string(),
                        value: raw,
                    })
                }
            };
        }
        if let Some(raw) = get("MAX_ITEMS") {
            config.max_items = parse_number("MAX_ITEMS", &raw)?;
        }
        if let Some(raw) = get("DISPLAY_UTC_OFFSET_HOURS") {
            config.utc_offset_hours = parse_number("DISPLAY_UTC_OFFSET_HOURS", &raw)?;
        }
        if let Some(label) = get("DISPLAY_ZONE_LABEL") {
            config.zone_label = label;
        }
        if let Some(title) = get("DIGEST_TITLE") {
            config.digest_title = title;
        }
        if let Some(json) = get("NEWS_QUERIES") {
            config.queries =
                serde_json::from_str(&json).map_err(|e| ConfigError::InvalidJson {
                    field: "NEWS_QUERIES".to_string(),
                    error: e.to_string(),
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check ranges that cannot be expressed in the types
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_KEEP_DAYS).contains(&self.keep_days) {
            return Err(ConfigError::InvalidValue {
                field: "KEEP_DAYS".to_string(),
                value: self.keep_days.to_string(),
            });
        }
        if !(1..=MAX_RECENCY_HOURS).contains(&self.recency_hours) {
            return Err(ConfigError::InvalidValue {
                field: "RECENCY_HOURS".to_string(),
                value: self.recency_hours.to_string(),
            });
        }
        if self.display_offset().is_none() {
            return Err(ConfigError::InvalidValue {
                field: "DISPLAY_UTC_OFFSET_HOURS".to_string(),
                value: self.utc_offset_hours.to_string(),
            });
        }

        if self.queries.iter().all(|q| q.trim().is_empty()) {
            return Err(ConfigError::EmptyQueryList);
        }

        Ok(())
    }

    pub fn recency_window(&self) -> Duration {
        Duration::hours(self.recency_hours)
    }

    /// Offset for displayed and persisted times, `None` when out of range
    pub fn display_offset(&self) -> Option<FixedOffset> {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
    }
}

/// Telegram delivery credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl TelegramConfig {
    /// Load `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`; both are required
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::Missing(key.to_string()))
        };

        Ok(Self {
            bot_token: required("TELEGRAM_BOT_TOKEN")?,
            chat_id: required("TELEGRAM_CHAT_ID")?,
        })
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

fn default_seen_path() -> PathBuf {
    PathBuf::from("seen.json")
}

fn default_keep_days() -> i64 {
    45
}

fn default_recency_hours() -> i64 {
    12
}

fn default_max_items() -> usize {
    20
}

fn default_utc_offset_hours() -> i32 {
    9 // KST
}

fn default_zone_label() -> String {
    "KST".to_string()
}

fn default_digest_title() -> String {
    "NextBiomedical / Nexpowder / Nexsphere F".to_string()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Invalid JSON in {field}: {error}")]
    InvalidJson { field: String, error: String },

    #[error("NEWS_QUERIES cannot be empty")]
    EmptyQueryList,
}

impl From<ConfigError> for DigestError {
    fn from(e: ConfigError) -> Self {
        DigestError::config(e.to_string())
    }
}
