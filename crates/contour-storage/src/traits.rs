//! Storage backend trait definitions

use crate::error::StorageResult;
use async_trait::async_trait;
use contour_core::{Graph, Iri, Model, Statement, Value};
use serde::{Deserialize, Serialize};

/// Statement pattern; unset positions match anything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<Iri>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,
}

impl Pattern {
    /// Pattern matching every statement
    pub fn any() -> Self {
        Self::default()
    }

    /// Statements describing `subject`
    pub fn subject(subject: Value) -> Self {
        Self::any().with_subject(subject)
    }

    pub fn with_subject(mut self, subject: Value) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_predicate(mut self, predicate: impl Into<Iri>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn with_object(mut self, object: Value) -> Self {
        self.object = Some(object);
        self
    }

    /// Statements of `graph` matching this pattern
    pub fn select(&self, graph: &dyn Graph) -> Vec<Statement> {
        graph.matching(self.subject.as_ref(), self.predicate.as_ref(), self.object.as_ref())
    }
}

/// Statements to delete and insert in one transaction
///
/// Deletions are applied before insertions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutation {
    #[serde(default)]
    pub delete: Vec<Statement>,

    #[serde(default)]
    pub insert: Vec<Statement>,
}

impl Mutation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert every statement of `model`
    pub fn inserting(model: &Model) -> Self {
        Self {
            delete: Vec::new(),
            insert: model.iter().cloned().collect(),
        }
    }

    pub fn with_insert(mut self, statement: Statement) -> Self {
        self.insert.push(statement);
        self
    }

    pub fn with_delete(mut self, statement: Statement) -> Self {
        self.delete.push(statement);
        self
    }

    /// Total number of statements touched
    pub fn len(&self) -> usize {
        self.delete.len() + self.insert.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delete.is_empty() && self.insert.is_empty()
    }

    /// Apply to a model in place
    pub fn apply(&self, model: &mut Model) {
        for statement in &self.delete {
            model.remove(statement);
        }
        model.extend(self.insert.iter().cloned());
    }

    /// Resource subjects of the touched statements
    pub fn subjects(&self) -> Vec<Value> {
        let mut subjects: Vec<Value> = self
            .delete
            .iter()
            .chain(&self.insert)
            .map(|statement| statement.subject.clone())
            .collect();
        subjects.sort();
        subjects.dedup();
        subjects
    }
}

/// Trait for graph store implementations
///
/// Reads and writes are each atomic; a snapshot is a consistent copy that
/// later writes don't affect.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Initialize the storage (load persisted data, etc.)
    async fn initialize(&self) -> StorageResult<()>;

    /// Flush and close the storage
    async fn close(&self) -> StorageResult<()>;

    /// Health check
    async fn health_check(&self) -> StorageResult<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Statement Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Statements matching a pattern
    async fn read(&self, pattern: &Pattern) -> StorageResult<Vec<Statement>>;

    /// Apply a mutation in one transaction
    async fn write(&self, mutation: &Mutation) -> StorageResult<()>;

    /// Consistent copy of the whole graph
    async fn snapshot(&self) -> StorageResult<Model>;

    // ─────────────────────────────────────────────────────────────────────────
    // Provided
    // ─────────────────────────────────────────────────────────────────────────

    /// Statements describing one resource
    async fn describe(&self, resource: &Value) -> StorageResult<Model> {
        let statements = self.read(&Pattern::subject(resource.clone())).await?;
        Ok(statements.into_iter().collect())
    }

    /// Number of stored statements
    async fn count(&self) -> StorageResult<usize> {
        Ok(self.snapshot().await?.len())
    }
}
