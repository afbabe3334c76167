//! Contour Storage - Graph store collaborators
//!
//! This crate provides the storage backend trait consumed by validation and
//! queries, in-memory and JSON file backends, document ingestion with
//! diagnostics, and validation-gated writes.

#![allow(clippy::result_large_err)]

pub mod error;
pub mod file;
pub mod gate;
pub mod ingest;
pub mod memory;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use file::FileStorage;
pub use gate::gated_write;
pub use ingest::{Diagnostics, Ingest};
pub use memory::MemoryStorage;
pub use traits::{Mutation, Pattern, StorageBackend};
