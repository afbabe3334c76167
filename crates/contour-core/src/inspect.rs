//! Shape inspection helpers

use crate::edge::Edge;
use crate::error::{Error, Result};
use crate::shape::{and, Derivation, Field, Shape, LABEL};
use crate::value::Value;
use std::collections::BTreeSet;

/// A field declared at the top level of a shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declared {
    pub field: Field,
    pub derivation: Option<Derivation>,
}

/// Fields reachable through logical nodes, without descending into nested shapes
///
/// Conditional tests are skipped: only their branches declare fields.
pub fn fields(shape: &Shape) -> Vec<Declared> {
    let mut declared = Vec::new();
    collect_fields(shape, &mut declared);
    declared
}

fn collect_fields(shape: &Shape, declared: &mut Vec<Declared>) {
    match shape {
        Shape::Field(field) => declared.push(Declared {
            field: field.clone(),
            derivation: None,
        }),
        Shape::Virtual { field, derivation } => declared.push(Declared {
            field: field.clone(),
            derivation: Some(derivation.clone()),
        }),
        Shape::And(shapes) | Shape::Or(shapes) => {
            for shape in shapes.iter() {
                collect_fields(shape, declared);
            }
        }
        Shape::When { pass, fail, .. } => {
            collect_fields(pass, declared);
            collect_fields(fail, declared);
        }
        _ => {}
    }
}

/// Nested shape of the field reached by following `path`
///
/// Shapes of repeated fields on the same edge are combined in conjunction.
pub fn field(shape: &Shape, path: &[Edge]) -> Result<Shape> {
    let mut current = shape.clone();

    for step in path {
        let nested: Vec<Shape> = fields(&current)
            .into_iter()
            .filter(|declared| declared.field.edge == *step)
            .map(|declared| declared.field.shape.as_ref().clone())
            .collect();

        if nested.is_empty() {
            return Err(Error::UnknownStep(step.to_string()));
        }

        current = and(nested);
    }

    Ok(current)
}

/// Values of top-level universal constraints
pub fn all(shape: &Shape) -> Option<BTreeSet<Value>> {
    values(shape, universal)
}

/// Values of top-level existential constraints
pub fn any(shape: &Shape) -> Option<BTreeSet<Value>> {
    values(shape, existential)
}

fn universal(shape: &Shape) -> Option<&BTreeSet<Value>> {
    match shape {
        Shape::All(values) => Some(values),
        _ => None,
    }
}

fn existential(shape: &Shape) -> Option<&BTreeSet<Value>> {
    match shape {
        Shape::Any(values) => Some(values),
        _ => None,
    }
}

fn values(
    shape: &Shape,
    select: fn(&Shape) -> Option<&BTreeSet<Value>>,
) -> Option<BTreeSet<Value>> {
    match shape {
        Shape::And(shapes) => shapes
            .iter()
            .filter_map(|shape| values(shape, select))
            .reduce(|mut x, y| {
                x.extend(y);
                x
            }),
        _ => select(shape).cloned(),
    }
}

/// Top-level annotation values for `key`
pub fn metas<'a>(shape: &'a Shape, key: &str) -> Vec<&'a Value> {
    match shape {
        Shape::Meta { key: k, value } if k == key => vec![value],
        Shape::And(shapes) => shapes.iter().flat_map(|shape| metas(shape, key)).collect(),
        _ => Vec::new(),
    }
}

/// Human-readable label annotation
pub fn label(shape: &Shape) -> Option<String> {
    metas(shape, LABEL)
        .first()
        .map(|value| value.lexical().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{self as s, and, create, derived, min_count, or, string, then};

    #[test]
    fn test_fields_through_logical_nodes() {
        let shape = and([
            s::field("urn:a", []),
            or([s::field("urn:b", []), then(create(), [s::field("urn:c", [])])]),
            derived("urn:d", [], vec![Edge::forward("urn:e")]),
        ]);

        let edges: Vec<Edge> = fields(&shape).into_iter().map(|d| d.field.edge).collect();
        assert_eq!(
            edges,
            vec![
                Edge::forward("urn:a"),
                Edge::forward("urn:b"),
                Edge::forward("urn:c"),
                Edge::forward("urn:d"),
            ]
        );
    }

    #[test]
    fn test_field_path() {
        let shape = and([
            s::field("urn:a", [s::field("urn:b", [string()])]),
            s::field("urn:a", [min_count(1)]),
        ]);

        let nested = field(&shape, &[Edge::forward("urn:a")]).unwrap();
        assert_eq!(nested, and([s::field("urn:b", [string()]), min_count(1)]));

        let leaf = field(&shape, &[Edge::forward("urn:a"), Edge::forward("urn:b")]).unwrap();
        assert_eq!(leaf, string());

        assert!(matches!(
            field(&shape, &[Edge::forward("urn:x")]),
            Err(Error::UnknownStep(_))
        ));
    }

    #[test]
    fn test_values_and_label() {
        let shape = and([
            s::all([Value::integer(1)]),
            s::all([Value::integer(2)]),
            s::any([Value::integer(3)]),
            s::label("Employee"),
        ]);

        assert_eq!(all(&shape).map(|v| v.len()), Some(2));
        assert_eq!(any(&shape).map(|v| v.len()), Some(1));
        assert_eq!(label(&shape).as_deref(), Some("Employee"));
        assert_eq!(all(&string()), None);
    }
}
