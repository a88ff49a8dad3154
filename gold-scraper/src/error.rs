//! Error types for the scraper

use gold_core::GoldError;
use thiserror::Error;

/// Errors that can occur while fetching the price page
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// HTTP request failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Source returned a non-success status
    #[error("HTTP error (status {status})")]
    HttpStatus {
        /// HTTP status code
        status: u16,
    },

    /// The fetch did not complete within the configured timeout
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<ScrapeError> for GoldError {
    fn from(err: ScrapeError) -> Self {
        GoldError::scrape_failed(err.to_string())
    }
}
