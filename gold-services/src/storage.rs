//! Shared SQLite plumbing for the storage modules

use std::path::Path;

use gold_core::GoldError;
use rusqlite::Connection;

/// Errors that can occur during storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(String),

    /// A row exists but a required field could not be decoded
    #[error("Malformed row: {0}")]
    Malformed(String),
}

impl From<StoreError> for GoldError {
    fn from(err: StoreError) -> Self {
        GoldError::storage(err.to_string())
    }
}

/// Open a database file, creating its parent directory if needed
pub(crate) fn open_file<P: AsRef<Path>>(db_path: P) -> Result<Connection, StoreError> {
    if let Some(parent) = db_path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Io(format!("Failed to create database directory: {}", e))
            })?;
        }
    }

    Ok(Connection::open(db_path)?)
}
