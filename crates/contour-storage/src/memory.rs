//! In-memory storage backend

use crate::error::{StorageError, StorageResult};
use crate::traits::{Mutation, Pattern, StorageBackend};
use async_trait::async_trait;
use contour_core::{limits, Model, Statement};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory storage backend
///
/// Useful for testing and as the working set of file-backed storage.
pub struct MemoryStorage {
    model: RwLock<Model>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::from_model(Model::new())
    }

    pub fn from_model(model: Model) -> Self {
        Self {
            model: RwLock::new(model),
        }
    }

    /// Replace the whole graph
    pub fn replace(&self, model: Model) -> StorageResult<()> {
        *self.lock_write()? = model;
        Ok(())
    }

    fn lock_read(&self) -> StorageResult<RwLockReadGuard<'_, Model>> {
        self.model
            .read()
            .map_err(|e| StorageError::Database(format!("Lock error: {}", e)))
    }

    fn lock_write(&self) -> StorageResult<RwLockWriteGuard<'_, Model>> {
        self.model
            .write()
            .map_err(|e| StorageError::Database(format!("Lock error: {}", e)))
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<bool> {
        Ok(self.model.read().is_ok())
    }

    async fn read(&self, pattern: &Pattern) -> StorageResult<Vec<Statement>> {
        let model = self.lock_read()?;
        Ok(pattern.select(&*model))
    }

    async fn write(&self, mutation: &Mutation) -> StorageResult<()> {
        limits::validate_mutation(mutation.len())?;

        let mut model = self.lock_write()?;
        let before = model.len();
        mutation.apply(&mut model);

        tracing::debug!(
            deleted = mutation.delete.len(),
            inserted = mutation.insert.len(),
            before,
            after = model.len(),
            "Applied mutation"
        );

        Ok(())
    }

    async fn snapshot(&self) -> StorageResult<Model> {
        Ok(self.lock_read()?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contour_core::Value;

    fn statement(subject: &str, object: i64) -> Statement {
        Statement::new(Value::iri(subject), "urn:salary", Value::integer(object))
    }

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();
        storage.initialize().await.unwrap();

        storage
            .write(
                &Mutation::new()
                    .with_insert(statement("urn:e1", 100))
                    .with_insert(statement("urn:e2", 200)),
            )
            .await
            .unwrap();

        assert_eq!(storage.count().await.unwrap(), 2);

        let described = storage.describe(&Value::iri("urn:e1")).await.unwrap();
        assert_eq!(described.len(), 1);
        assert!(described.contains(&statement("urn:e1", 100)));

        // deletions apply before insertions
        storage
            .write(
                &Mutation::new()
                    .with_delete(statement("urn:e1", 100))
                    .with_insert(statement("urn:e1", 150)),
            )
            .await
            .unwrap();

        let read = storage
            .read(&Pattern::any().with_object(Value::integer(150)))
            .await
            .unwrap();
        assert_eq!(read, vec![statement("urn:e1", 150)]);
        assert_eq!(storage.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_is_isolated() {
        let storage = MemoryStorage::new();
        storage
            .write(&Mutation::new().with_insert(statement("urn:e1", 100)))
            .await
            .unwrap();

        let snapshot = storage.snapshot().await.unwrap();

        storage
            .write(&Mutation::new().with_delete(statement("urn:e1", 100)))
            .await
            .unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(storage.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mutation_limit() {
        let storage = MemoryStorage::new();
        let mutation = Mutation {
            delete: Vec::new(),
            insert: (0..=limits::MAX_MUTATION_STATEMENTS as i64)
                .map(|i| statement("urn:e1", i))
                .collect(),
        };

        assert!(storage.write(&mutation).await.is_err());
        assert_eq!(storage.count().await.unwrap(), 0);
    }
}
