//! Query error types

use thiserror::Error;

/// Result type alias for query operations
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Query-specific error types
#[derive(Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Core(#[from] contour_core::Error),
}

impl QueryError {
    /// Whether the request can't be served by this engine, as opposed to being malformed
    pub fn is_capability(&self) -> bool {
        matches!(self, Self::Core(error) if error.is_capability())
    }
}

pub(crate) fn unsupported(message: impl Into<String>) -> QueryError {
    QueryError::Core(contour_core::Error::Unsupported(message.into()))
}
