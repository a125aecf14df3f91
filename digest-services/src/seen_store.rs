//! Seen-Set Store
//!
//! JSON file holding every item delivered within the retention window.
//! Each run loads the whole file, prunes it, appends the newly delivered
//! items and writes it back.
//!
//! ## File format
//!
//! ```json
//! { "items": [ { "ts": "2025-03-04T17:30:00+09:00", "url_key": "…",
//!                "title_key": "…", "url": "…", "title": "…" } ] }
//! ```
//!
//! Whole-file rewrites are fine while the retention window keeps the file
//! small; a much larger history would need an indexed store instead.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use digest_core::{parse_timestamp, DigestError, SeenItem};

#[derive(Debug, thiserror::Error)]
pub enum SeenStoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt seen-set at {}: {source}", .path.display())]
    CorruptState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<SeenStoreError> for DigestError {
    fn from(e: SeenStoreError) -> Self {
        match e {
            SeenStoreError::CorruptState { .. } => DigestError::corrupt_state(e.to_string()),
            SeenStoreError::Io { .. } | SeenStoreError::Serialization(_) => {
                DigestError::persistence(e.to_string())
            }
        }
    }
}

/// A persisted item whose timestamp has not been validated yet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeenRecord {
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub url_key: String,
    #[serde(default)]
    pub title_key: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct SeenFile {
    #[serde(default)]
    items: Vec<SeenRecord>,
}

#[derive(Debug, Serialize)]
struct SeenFileRef<'a> {
    items: &'a [SeenItem],
}

/// File-backed seen-set
#[derive(Debug, Clone)]
pub struct SeenStore {
    path: PathBuf,
}

impl SeenStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every persisted record.
    ///
    /// A missing file is a first run and yields no records. A file that
    /// exists but cannot be decoded is an error: treating it as empty would
    /// re-announce the whole retention window.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Vec<SeenRecord>, SeenStoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No seen-set yet, starting empty");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(SeenStoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let file: SeenFile =
            serde_json::from_slice(&bytes).map_err(|source| SeenStoreError::CorruptState {
                path: self.path.clone(),
                source,
            })?;

        debug!("Loaded {} seen records", file.items.len());
        Ok(file.items)
    }

    /// Replace the persisted seen-set with `items`.
    ///
    /// The new content goes to a sibling temp file which is synced and then
    /// renamed over the target, so a reader sees either the old file or the
    /// new one.
    #[instrument(skip(self, items), fields(path = %self.path.display(), count = items.len()))]
    pub fn save(&self, items: &[SeenItem]) -> Result<(), SeenStoreError> {
        let body = serde_json::to_vec_pretty(&SeenFileRef { items })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SeenStoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp_path = self.tmp_path();
        if let Err(source) = write_synced(&tmp_path, &body) {
            let _ = fs::remove_file(&tmp_path);
            return Err(SeenStoreError::Io {
                path: tmp_path,
                source,
            });
        }

        if let Err(source) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(SeenStoreError::Io {
                path: self.path.clone(),
                source,
            });
        }

        info!("Saved {} seen items", items.len());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "seen.json".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()))
    }
}

fn write_synced(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(body)?;
    file.sync_all()
}

/// Drop records that are expired or carry no usable timestamp.
///
/// A record is kept when its timestamp is at or after `now - keep_days`.
/// Missing and unparseable timestamps count as expired. A window reaching
/// past the earliest representable time keeps every dated record.
pub fn prune(records: Vec<SeenRecord>, now: DateTime<Utc>, keep_days: i64) -> Vec<SeenItem> {
    let cutoff = Duration::try_days(keep_days).and_then(|keep| now.checked_sub_signed(keep));
    let total = records.len();

    let kept: Vec<SeenItem> = records
        .into_iter()
        .filter_map(|record| {
            let raw = record.ts.as_deref().unwrap_or_default();
            let timestamp = match parse_timestamp(raw) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!("Dropping seen record for '{}': {}", record.url, e);
                    return None;
                }
            };

            if cutoff.is_some_and(|cutoff| timestamp.with_timezone(&Utc) < cutoff) {
                return None;
            }

            Some(SeenItem {
                timestamp,
                url_key: record.url_key,
                title_key: record.title_key,
                url: record.url,
                title: record.title,
            })
        })
        .collect();

    if kept.len() < total {
        info!(
            "Pruned {} of {} seen records older than {} days",
            total - kept.len(),
            total,
            keep_days
        );
    }

    kept
}
