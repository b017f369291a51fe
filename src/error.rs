use photo_store::{CaptureError, StoreError};
use thiserror::Error;

/// Central error types for the camera app
#[derive(Debug, Error)]
pub enum AppError {
    /// Photo store error (database, cache, pagination)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),
    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),
    /// Validation error (e.g. invalid inputs)
    #[error("Validation error: {0}")]
    Validation(String),
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),
    /// Capture did not produce a stored photo
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),
    /// Upload could not start or write back
    #[error("Upload error: {0}")]
    Upload(String),
}

/// User-friendly error messages
impl AppError {
    pub fn user_message(&self) -> String {
        match self {
            AppError::Store(e) if e.is_storage_unavailable() => {
                "Photo storage is unavailable. Please try again.".to_string()
            }
            AppError::Store(StoreError::NotFound(id)) => format!("Photo {} was not found.", id),
            AppError::Store(StoreError::InvalidCursor(_)) => {
                "The page position is no longer valid. Start from the first page.".to_string()
            }
            AppError::Store(_) => "A storage error occurred. Please try again.".to_string(),
            AppError::Config(e) => format!("The configuration file is invalid: {}", e),
            AppError::Filesystem(_) => {
                "Error accessing files. Please check permissions.".to_string()
            }
            AppError::Capture(CaptureError::Cancelled) => "The capture was cancelled.".to_string(),
            AppError::Capture(CaptureError::Store(e)) if e.is_storage_unavailable() => {
                "Photo storage is unavailable. Please try again.".to_string()
            }
            AppError::Capture(_) => "The photo could not be saved.".to_string(),
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(msg) => format!("{} was not found.", msg),
            AppError::Upload(msg) => format!("Upload failed: {}", msg),
        }
    }
}
