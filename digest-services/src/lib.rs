//! Dedup engine and run orchestration for the brand news digest
//!
//! This crate decides which fetched articles are new across repeated runs:
//! fingerprinting, the persisted seen-set, the candidate filter and the
//! digest assembler, tied together by [`DigestService`].

pub mod candidate_filter;
pub mod config;
pub mod digest;
pub mod digest_service;
pub mod fingerprint;
pub mod seen_store;

pub use candidate_filter::{CandidateFilter, Decision, KeySets, RecencyBoundary, Rejection};
pub use config::{ConfigError, DigestConfig, TelegramConfig};
pub use digest::{assemble, Digest, DigestFormatter, TELEGRAM_MESSAGE_LIMIT};
pub use digest_service::{DigestService, DigestServiceError, RunReport};
pub use fingerprint::{fingerprint, normalize_title, normalize_url};
pub use seen_store::{prune, SeenRecord, SeenStore, SeenStoreError};
