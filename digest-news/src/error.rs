//! Error types for the news module

use digest_core::DigestError;
use thiserror::Error;

/// Errors that can occur while fetching feeds or delivering messages
#[derive(Debug, Error)]
pub enum NewsError {
    /// The HTTP request never produced a response
    #[error("Transport error: {0}")]
    Transport(String),

    /// Remote returned an error response
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message or response body
        message: String,
    },

    /// Failed to parse a feed or response
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<reqwest::Error> for NewsError {
    fn from(e: reqwest::Error) -> Self {
        NewsError::Transport(e.to_string())
    }
}

impl From<NewsError> for DigestError {
    fn from(e: NewsError) -> Self {
        match e {
            NewsError::Transport(msg) => DigestError::network(msg),
            NewsError::ApiError { .. } => DigestError::notify(e.to_string()),
            NewsError::ParseError(msg) => DigestError::parse(msg),
            NewsError::InvalidConfig(msg) => DigestError::config(msg),
        }
    }
}
