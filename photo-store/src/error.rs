//! Error types for the photo store.

use thiserror::Error;

/// Errors surfaced by the record store, the aggregate cache and the query engine.
///
/// Per-record upload failures are not errors; they are reported as
/// [`crate::upload::UploadOutcome`] values in the upload result map.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced record id does not exist.
    #[error("photo not found: {0}")]
    NotFound(String),

    /// The database failed to open or a statement/transaction failed.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),

    /// Another caller panicked while holding the connection.
    #[error("storage unavailable: connection lock poisoned")]
    Poisoned,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

impl StoreError {
    /// True for failures of the underlying store itself (as opposed to a
    /// missing record or a bad argument).
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, StoreError::StorageUnavailable(_) | StoreError::Poisoned)
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
