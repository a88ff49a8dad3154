//! Error types for the news module

use gold_core::GoldError;
use thiserror::Error;

/// Errors that can occur while fetching headlines
#[derive(Debug, Error)]
pub enum NewsError {
    /// HTTP request failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// API returned an error response
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },

    /// Failed to parse API response
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<NewsError> for GoldError {
    fn from(err: NewsError) -> Self {
        match err {
            NewsError::ParseError(msg) => GoldError::parse(msg),
            NewsError::InvalidConfig(msg) => GoldError::config(msg),
            other => GoldError::internal(other.to_string()),
        }
    }
}
