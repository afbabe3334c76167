//! Storage error types

use thiserror::Error;

/// Result type alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Storage-specific error types
#[derive(Error, Debug)]
pub enum StorageError {
    #[error(transparent)]
    Core(#[from] contour_core::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ingestion failed with {count} fatal diagnostics: {first}")]
    Ingestion { count: usize, first: String },

    #[error("Write rejected: {errors} validation errors")]
    Rejected {
        errors: usize,
        report: Box<contour_core::Focus>,
    },
}

impl From<contour_core::limits::ValidationError> for StorageError {
    fn from(error: contour_core::limits::ValidationError) -> Self {
        Self::Core(error.into())
    }
}
