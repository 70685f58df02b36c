//! Store error types

use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("corrupt durability log entry in {collection}: {reason}")]
    CorruptLog { collection: String, reason: String },
}

impl StoreError {
    /// Transient I/O failures the caller may retry; corruption and not-found are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Sqlite(_) | StoreError::Io(_))
    }
}
