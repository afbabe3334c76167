//! Guard redaction
//!
//! Resolves guards on one axis against the values allowed by the caller,
//! turning them into pass/fail sentinels for the optimizer to erase.

use crate::shape::{Axis, Field, Shape, CONVEY, FILTER};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Replace guards on `axis` with `And()` if they admit one of `values`, else `Or()`
///
/// Guards on other axes are left in place.
pub fn redact(shape: &Shape, axis: Axis, values: &BTreeSet<String>) -> Shape {
    match shape {
        Shape::Guard {
            axis: guarded,
            values: admitted,
        } if *guarded == axis => {
            let retained = !admitted.is_disjoint(values);
            tracing::trace!(%axis, ?admitted, retained, "Resolved guard");

            if retained {
                Shape::pass()
            } else {
                Shape::fail()
            }
        }

        Shape::Field(field) => Shape::Field(redact_field(field, axis, values)),

        Shape::Virtual { field, derivation } => Shape::Virtual {
            field: redact_field(field, axis, values),
            derivation: derivation.clone(),
        },

        Shape::And(shapes) => Shape::And(redact_all(shapes, axis, values)),
        Shape::Or(shapes) => Shape::Or(redact_all(shapes, axis, values)),

        Shape::When { test, pass, fail } => Shape::When {
            test: Arc::new(redact(test, axis, values)),
            pass: Arc::new(redact(pass, axis, values)),
            fail: Arc::new(redact(fail, axis, values)),
        },

        _ => shape.clone(),
    }
}

fn redact_field(field: &Field, axis: Axis, values: &BTreeSet<String>) -> Field {
    Field {
        edge: field.edge.clone(),
        shape: Arc::new(redact(&field.shape, axis, values)),
    }
}

fn redact_all(shapes: &[Shape], axis: Axis, values: &BTreeSet<String>) -> Arc<[Shape]> {
    shapes
        .iter()
        .map(|shape| redact(shape, axis, values))
        .collect::<Vec<_>>()
        .into()
}

/// Guard axis context supplied by the caller
///
/// Axes left unset are not redacted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<BTreeSet<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<BTreeSet<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<BTreeSet<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<BTreeSet<String>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<S: Into<String>>(mut self, axis: Axis, values: impl IntoIterator<Item = S>) -> Self {
        let values = Some(values.into_iter().map(Into::into).collect());
        match axis {
            Axis::Role => self.role = values,
            Axis::Task => self.task = values,
            Axis::View => self.view = values,
            Axis::Mode => self.mode = values,
        }
        self
    }

    pub fn with_role<S: Into<String>>(self, values: impl IntoIterator<Item = S>) -> Self {
        self.with(Axis::Role, values)
    }

    pub fn with_task<S: Into<String>>(self, values: impl IntoIterator<Item = S>) -> Self {
        self.with(Axis::Task, values)
    }

    pub fn with_view<S: Into<String>>(self, values: impl IntoIterator<Item = S>) -> Self {
        self.with(Axis::View, values)
    }

    pub fn with_mode<S: Into<String>>(self, values: impl IntoIterator<Item = S>) -> Self {
        self.with(Axis::Mode, values)
    }

    /// Context for the projection side of a query
    pub fn convey() -> Self {
        Self::new().with_mode([CONVEY])
    }

    /// Context for the filtering side of a query
    pub fn filter() -> Self {
        Self::new().with_mode([FILTER])
    }

    pub fn get(&self, axis: Axis) -> Option<&BTreeSet<String>> {
        match axis {
            Axis::Role => self.role.as_ref(),
            Axis::Task => self.task.as_ref(),
            Axis::View => self.view.as_ref(),
            Axis::Mode => self.mode.as_ref(),
        }
    }

    /// Redact every axis set in this context, one pass per axis
    pub fn redact(&self, shape: &Shape) -> Shape {
        [Axis::Role, Axis::Task, Axis::View, Axis::Mode]
            .into_iter()
            .fold(shape.clone(), |shape, axis| match self.get(axis) {
                Some(values) => redact(&shape, axis, values),
                None => shape,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::optimize;
    use crate::shape::*;

    fn salesman() -> BTreeSet<String> {
        ["salesman".to_string()].into_iter().collect()
    }

    #[test]
    fn test_guard_resolution() {
        assert!(redact(&role(["salesman", "manager"]), Axis::Role, &salesman()).is_pass());
        assert!(redact(&role(["manager"]), Axis::Role, &salesman()).is_fail());

        // other axes pass through
        assert_eq!(redact(&create(), Axis::Role, &salesman()), create());
    }

    #[test]
    fn test_role_redaction_erases_foreign_fields() {
        let shape = and([
            field("urn:code", [required()]),
            then(role(["salesman"]), [field("urn:territory", [string()])]),
            then(role(["manager"]), [field("urn:salary", [integer()])]),
            field("urn:bonus", [role(["manager"]), integer()]),
        ]);

        let redacted = optimize(&redact(&shape, Axis::Role, &salesman())).unwrap();

        assert_eq!(
            redacted,
            and([
                field("urn:code", [required()]),
                field("urn:territory", [string()]),
            ])
        );
    }

    #[test]
    fn test_context_redacts_each_axis() {
        let shape = and([
            then(create(), [field("urn:code", [required()])]),
            then(convey(), [field("urn:label", [])]),
            then(filter(), [field("urn:label", [pattern("^A")])]),
        ]);

        let context = Context::new().with_task([RELATE]).with_mode([CONVEY]);
        let redacted = optimize(&context.redact(&shape)).unwrap();

        assert_eq!(redacted, field("urn:label", []));
        assert!(!redacted.is_guarded());
    }

    #[test]
    fn test_unset_axes_are_kept() {
        let shape = then(role(["manager"]), [field("urn:salary", [])]);
        let redacted = Context::new().with_task([CREATE]).redact(&shape);
        assert_eq!(redacted, shape);
    }
}
