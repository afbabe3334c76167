//! Error types for Contour Core

use thiserror::Error;

/// Result type alias using Contour's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Contour error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed shape: {0}")]
    SpecMalformed(String),

    #[error("Alias conflict for {edge}: {first} <> {second}")]
    AliasConflict {
        edge: String,
        first: String,
        second: String,
    },

    #[error("Unknown path step: {0}")]
    UnknownStep(String),

    #[error("Not implemented: {0}")]
    Unsupported(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Limit exceeded: {0}")]
    Limit(#[from] crate::limits::ValidationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the error signals a missing engine capability rather than bad input
    pub fn is_capability(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}
