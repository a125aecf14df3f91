//! Error types for the digest

use thiserror::Error;

/// Workspace-wide error type
#[derive(Error, Debug)]
pub enum DigestError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Corrupt persisted state: {0}")]
    CorruptState(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Notifier error: {0}")]
    Notify(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DigestError {
    pub fn network(msg: impl Into<String>) -> Self {
        DigestError::Network(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        DigestError::Parse(msg.into())
    }

    pub fn corrupt_state(msg: impl Into<String>) -> Self {
        DigestError::CorruptState(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        DigestError::Persistence(msg.into())
    }

    pub fn notify(msg: impl Into<String>) -> Self {
        DigestError::Notify(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        DigestError::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        DigestError::Internal(msg.into())
    }

    /// Whether a retry on the next scheduled run can be expected to succeed
    /// without operator intervention.
    pub fn is_transient(&self) -> bool {
        matches!(self, DigestError::Network(_) | DigestError::Notify(_))
    }
}

/// Result type alias for digest operations
pub type DigestResult<T> = Result<T, DigestError>;
