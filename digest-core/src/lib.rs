//! Core types for the brand news digest
//!
//! This crate defines the shared data structures used across the digest
//! workspace: raw feed entries, accepted candidates, seen-set items and the
//! fingerprint pair that ties them together.

pub mod error;
pub mod news;
pub mod timestamp;

pub use error::{DigestError, DigestResult};
pub use news::{Candidate, FeedEntry, FingerprintPair, SeenItem};
pub use timestamp::{parse_timestamp, parse_timestamp_utc, TimestampError};
