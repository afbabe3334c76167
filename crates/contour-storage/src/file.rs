//! JSON file storage backend

use crate::error::StorageResult;
use crate::memory::MemoryStorage;
use crate::traits::{Mutation, Pattern, StorageBackend};
use async_trait::async_trait;
use contour_core::{limits, Model, Statement};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// File name used inside a data directory
pub const DEFAULT_FILE: &str = "graph.json";

/// Statement store persisted as a JSON array
///
/// The graph is held in memory and rewritten in full on each write,
/// through a temporary file renamed over the previous one. A write only
/// becomes visible in memory once its file is in place.
pub struct FileStorage {
    path: PathBuf,
    memory: MemoryStorage,
    writer: Mutex<()>,
}

impl FileStorage {
    /// Storage backed by `path`; nothing is read until [`StorageBackend::initialize`]
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            memory: MemoryStorage::new(),
            writer: Mutex::new(()),
        }
    }

    /// Storage backed by the default file inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::open(dir.as_ref().join(DEFAULT_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, model: &Model) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(model)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, &self.path).await?;

        tracing::debug!(path = %self.path.display(), statements = model.len(), "Persisted graph");
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FileStorage {
    async fn initialize(&self) -> StorageResult<()> {
        if !tokio::fs::try_exists(&self.path).await? {
            tracing::debug!(path = %self.path.display(), "No graph file, starting empty");
            return Ok(());
        }

        let bytes = tokio::fs::read(&self.path).await?;
        let model: Model = serde_json::from_slice(&bytes)?;

        tracing::info!(path = %self.path.display(), statements = model.len(), "Loaded graph");
        self.memory.replace(model)
    }

    async fn close(&self) -> StorageResult<()> {
        let _writer = self.writer.lock().await;
        self.persist(&self.memory.snapshot().await?).await
    }

    async fn health_check(&self) -> StorageResult<bool> {
        self.memory.health_check().await
    }

    async fn read(&self, pattern: &Pattern) -> StorageResult<Vec<Statement>> {
        self.memory.read(pattern).await
    }

    async fn write(&self, mutation: &Mutation) -> StorageResult<()> {
        limits::validate_mutation(mutation.len())?;

        let _writer = self.writer.lock().await;
        let mut model = self.memory.snapshot().await?;
        mutation.apply(&mut model);

        self.persist(&model).await?;
        self.memory.replace(model)
    }

    async fn snapshot(&self) -> StorageResult<Model> {
        self.memory.snapshot().await
    }
}
