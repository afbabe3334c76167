//! Validation-gated writes

use crate::error::{StorageError, StorageResult};
use crate::ingest::Diagnostics;
use crate::traits::{Mutation, StorageBackend};
use contour_core::{Focus, Level, Shape, Validator, Value};
use std::collections::BTreeSet;

/// Apply `mutation` only if the resulting graph satisfies `shape`
///
/// Writes are refused when ingestion produced fatal diagnostics, or when
/// validating `focus` (the subjects touched by the mutation if empty) over the
/// post-write snapshot raises errors. The report is returned on success so
/// warnings can be surfaced. Isolation between the snapshot and the write is
/// left to the storage backend.
pub async fn gated_write<S: StorageBackend + ?Sized>(
    storage: &S,
    shape: &Shape,
    focus: &BTreeSet<Value>,
    mutation: &Mutation,
    diagnostics: &Diagnostics,
) -> StorageResult<Focus> {
    if let Some(first) = diagnostics.fatals.first() {
        return Err(StorageError::Ingestion {
            count: diagnostics.fatals.len(),
            first: first.clone(),
        });
    }

    let focus: BTreeSet<Value> = if focus.is_empty() {
        mutation
            .subjects()
            .into_iter()
            .filter(Value::is_resource)
            .collect()
    } else {
        focus.clone()
    };

    let mut model = storage.snapshot().await?;
    mutation.apply(&mut model);

    let report = Validator::new(&model).validate(shape, &focus);

    if report.assess(Level::Error) {
        let errors = report
            .prune(Level::Error)
            .map(|pruned| count_issues(&pruned))
            .unwrap_or(0);

        tracing::info!(errors, resources = focus.len(), "Rejected write");

        return Err(StorageError::Rejected {
            errors,
            report: Box::new(report),
        });
    }

    storage.write(mutation).await?;
    Ok(report)
}

fn count_issues(focus: &Focus) -> usize {
    focus.issues.len()
        + focus
            .frames
            .values()
            .map(|frame| frame.issues.len() + frame.fields.values().map(count_issues).sum::<usize>())
            .sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::Ingest;
    use crate::memory::MemoryStorage;
    use contour_core::shape::{field, integer, max_inclusive, required};
    use contour_core::Statement;

    fn shape() -> Shape {
        field("urn:salary", [required(), integer(), max_inclusive(Value::integer(1000))])
    }

    fn salary(value: i64) -> Statement {
        Statement::new(Value::iri("urn:e1"), "urn:salary", Value::integer(value))
    }

    #[tokio::test]
    async fn test_gated_write_accepts_valid() {
        let storage = MemoryStorage::new();
        let mutation = Mutation::new().with_insert(salary(100));

        let report = gated_write(&storage, &shape(), &BTreeSet::new(), &mutation, &Diagnostics::new())
            .await
            .unwrap();

        assert!(!report.assess(Level::Error));
        assert_eq!(storage.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_gated_write_rejects_invalid() {
        let storage = MemoryStorage::new();
        storage.write(&Mutation::new().with_insert(salary(100))).await.unwrap();

        // a second salary breaks the cardinality
        let mutation = Mutation::new().with_insert(salary(2000));
        let error = gated_write(&storage, &shape(), &BTreeSet::new(), &mutation, &Diagnostics::new())
            .await
            .unwrap_err();

        match error {
            StorageError::Rejected { errors, .. } => assert!(errors >= 2),
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(storage.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_gated_write_refuses_fatals() {
        let storage = MemoryStorage::new();
        let ingest = Ingest::parse("{ broken");

        let error = gated_write(
            &storage,
            &shape(),
            &BTreeSet::new(),
            &Mutation::inserting(&ingest.model),
            &ingest.diagnostics,
        )
        .await
        .unwrap_err();

        assert!(matches!(error, StorageError::Ingestion { count: 1, .. }));
        assert_eq!(storage.count().await.unwrap(), 0);
    }
}
