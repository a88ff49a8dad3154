//! Error types for the tracker

use thiserror::Error;

/// Tracker-wide error type
#[derive(Error, Debug)]
pub enum GoldError {
    /// The price page could not be fetched (network, HTTP status, timeout)
    #[error("Scrape failed: {0}")]
    ScrapeFailed(String),

    /// No cache tier had data and recomputation also failed
    #[error("Recompute failed: {0}")]
    RecomputeFailed(String),

    /// Forecast and observed curves cannot be paired index-by-index
    #[error("Alignment error: {0}")]
    Alignment(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GoldError {
    pub fn scrape_failed(msg: impl Into<String>) -> Self {
        GoldError::ScrapeFailed(msg.into())
    }

    pub fn recompute_failed(msg: impl Into<String>) -> Self {
        GoldError::RecomputeFailed(msg.into())
    }

    pub fn alignment(msg: impl Into<String>) -> Self {
        GoldError::Alignment(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        GoldError::NotFound(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        GoldError::Storage(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        GoldError::Parse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        GoldError::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        GoldError::Internal(msg.into())
    }
}

/// Result type alias for tracker operations
pub type GoldResult<T> = Result<T, GoldError>;
