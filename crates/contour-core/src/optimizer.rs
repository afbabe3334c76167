//! Algebraic shape simplifier
//!
//! A single bottom-up pass: children are optimized first, then each logical
//! node is flattened, folded against the pass/fail sentinels, deduplicated and
//! packed by merging same-kind constraints.

use crate::alias;
use crate::error::{Error, Result};
use crate::shape::{Field, Shape};
use crate::vocab;
use std::sync::Arc;

/// Stateless optimizer
pub struct Optimizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Junction {
    Conjunction,
    Disjunction,
}

impl Optimizer {
    /// Simplify a shape
    ///
    /// Fails only with [`Error::AliasConflict`] when two fields on the same
    /// edge declare different aliases.
    pub fn optimize(shape: &Shape) -> Result<Shape> {
        match shape {
            Shape::Field(field) => Ok(Self::field(field)?.map_or_else(Shape::pass, Shape::Field)),

            Shape::Virtual { field, derivation } => Ok(Self::field(field)?.map_or_else(
                Shape::pass,
                |field| Shape::Virtual {
                    field,
                    derivation: derivation.clone(),
                },
            )),

            Shape::And(shapes) => Self::pack(Junction::Conjunction, shapes),
            Shape::Or(shapes) => Self::pack(Junction::Disjunction, shapes),

            Shape::When { test, pass, fail } => {
                let test = Self::optimize(test)?;
                let pass = Self::optimize(pass)?;
                let fail = Self::optimize(fail)?;

                if test.is_pass() {
                    Ok(pass)
                } else if test.is_fail() {
                    Ok(fail)
                } else if pass == fail {
                    Ok(pass)
                } else {
                    Ok(Shape::When {
                        test: Arc::new(test),
                        pass: Arc::new(pass),
                        fail: Arc::new(fail),
                    })
                }
            }

            _ => Ok(shape.clone()),
        }
    }

    /// Optimize a field's nested shape; unsatisfiable fields are erased
    fn field(field: &Field) -> Result<Option<Field>> {
        let nested = Self::optimize(&field.shape)?;

        if nested.is_fail() {
            return Ok(None);
        }

        let shape = if nested == *field.shape {
            field.shape.clone()
        } else {
            Arc::new(nested)
        };

        Ok(Some(Field {
            edge: field.edge.clone(),
            shape,
        }))
    }

    fn pack(junction: Junction, shapes: &[Shape]) -> Result<Shape> {
        let mut members = Vec::with_capacity(shapes.len());

        for shape in shapes {
            let optimized = Self::optimize(shape)?;
            Self::flatten(junction, optimized, &mut members);
        }

        let members = match Self::fold(junction, members) {
            Some(members) => members,
            None => return Ok(Self::absorbing(junction)),
        };

        let members = Self::dedupe(members);
        let members = Self::merge(junction, members)?;

        // merged fields may have collapsed into sentinels
        let mut flat = Vec::with_capacity(members.len());
        for member in members {
            Self::flatten(junction, member, &mut flat);
        }

        match Self::fold(junction, flat) {
            Some(mut members) if members.len() == 1 => Ok(members.remove(0)),
            Some(members) => Ok(Self::build(junction, members)),
            None => Ok(Self::absorbing(junction)),
        }
    }

    fn flatten(junction: Junction, shape: Shape, members: &mut Vec<Shape>) {
        match (junction, shape) {
            (Junction::Conjunction, Shape::And(shapes)) | (Junction::Disjunction, Shape::Or(shapes)) => {
                members.extend(shapes.iter().cloned())
            }
            (_, shape) => members.push(shape),
        }
    }

    /// `None` if an absorbing member is present
    fn fold(junction: Junction, members: Vec<Shape>) -> Option<Vec<Shape>> {
        let absorbing = |shape: &Shape| match junction {
            Junction::Conjunction => shape.is_fail(),
            Junction::Disjunction => shape.is_pass(),
        };

        if members.iter().any(absorbing) {
            None
        } else {
            Some(members)
        }
    }

    fn absorbing(junction: Junction) -> Shape {
        match junction {
            Junction::Conjunction => Shape::fail(),
            Junction::Disjunction => Shape::pass(),
        }
    }

    fn build(junction: Junction, members: Vec<Shape>) -> Shape {
        match junction {
            Junction::Conjunction => Shape::And(Arc::from(members)),
            Junction::Disjunction => Shape::Or(Arc::from(members)),
        }
    }

    fn dedupe(members: Vec<Shape>) -> Vec<Shape> {
        let mut unique: Vec<Shape> = Vec::with_capacity(members.len());
        for member in members {
            if !unique.contains(&member) {
                unique.push(member);
            }
        }
        unique
    }

    /// Combine same-kind constraints, keeping each merged constraint at the
    /// position of its first occurrence
    fn merge(junction: Junction, members: Vec<Shape>) -> Result<Vec<Shape>> {
        let conjunction = junction == Junction::Conjunction;

        let min_count = Self::bound(&members, |shape| match shape {
            Shape::MinCount(limit) => Some(*limit),
            _ => None,
        }, conjunction);

        let max_count = Self::bound(&members, |shape| match shape {
            Shape::MaxCount(limit) => Some(*limit),
            _ => None,
        }, !conjunction);

        let datatypes: Vec<&str> = members
            .iter()
            .filter_map(|shape| match shape {
                Shape::Datatype(iri) => Some(iri.as_str()),
                _ => None,
            })
            .collect();

        let classes: Vec<&str> = members
            .iter()
            .filter_map(|shape| match shape {
                Shape::Class(iri) => Some(iri.as_str()),
                _ => None,
            })
            .collect();

        let mut merged = Vec::with_capacity(members.len());
        let mut min_done = false;
        let mut max_done = false;
        let mut fields_done: Vec<usize> = Vec::new();

        for (index, member) in members.iter().enumerate() {
            match member {
                Shape::MinCount(_) => {
                    if !min_done {
                        min_done = true;
                        merged.extend(min_count.map(Shape::MinCount));
                    }
                }

                Shape::MaxCount(_) => {
                    if !max_done {
                        max_done = true;
                        merged.extend(max_count.map(Shape::MaxCount));
                    }
                }

                Shape::Datatype(iri) => {
                    if Self::retained(junction, iri.as_str(), &datatypes) {
                        merged.push(member.clone());
                    }
                }

                Shape::Class(iri) => {
                    if Self::retained(junction, iri.as_str(), &classes) {
                        merged.push(member.clone());
                    }
                }

                Shape::Field(field) => {
                    if fields_done.contains(&index) {
                        continue;
                    }

                    let peers: Vec<(usize, &Field)> = members
                        .iter()
                        .enumerate()
                        .skip(index)
                        .filter_map(|(i, shape)| match shape {
                            Shape::Field(other) if other.edge == field.edge => Some((i, other)),
                            _ => None,
                        })
                        .collect();

                    if peers.len() == 1 {
                        merged.push(member.clone());
                        continue;
                    }

                    fields_done.extend(peers.iter().map(|(i, _)| *i));
                    merged.push(Self::merge_fields(junction, field, &peers)?);
                }

                _ => merged.push(member.clone()),
            }
        }

        Ok(merged)
    }

    /// Tightest (`max == true`) or loosest bound among the matching members
    fn bound(
        members: &[Shape],
        select: impl Fn(&Shape) -> Option<usize>,
        max: bool,
    ) -> Option<usize> {
        let limits = members.iter().filter_map(select);
        if max {
            limits.max()
        } else {
            limits.min()
        }
    }

    /// Whether a type survives lattice merging against its siblings
    fn retained(junction: Junction, iri: &str, siblings: &[&str]) -> bool {
        siblings.iter().all(|other| {
            *other == iri
                || match junction {
                    // drop types strictly more general than a sibling
                    Junction::Conjunction => !vocab::derives(iri, other),
                    // drop types strictly more specific than a sibling
                    Junction::Disjunction => !vocab::derives(other, iri),
                }
        })
    }

    fn merge_fields(junction: Junction, field: &Field, peers: &[(usize, &Field)]) -> Result<Shape> {
        let mut declared: Option<String> = None;

        for (_, peer) in peers {
            if let Some(name) = alias::declared(&peer.shape) {
                match &declared {
                    Some(existing) if *existing != name => {
                        return Err(Error::AliasConflict {
                            edge: field.edge.to_string(),
                            first: existing.clone(),
                            second: name,
                        });
                    }
                    _ => declared = Some(name),
                }
            }
        }

        let nested: Vec<Shape> = peers.iter().map(|(_, peer)| peer.shape.as_ref().clone()).collect();

        let combined = match junction {
            Junction::Conjunction => Shape::And(Arc::from(nested)),
            Junction::Disjunction => Shape::Or(Arc::from(nested)),
        };

        let packed = Self::optimize(&combined)?;

        Ok(if packed.is_fail() {
            Shape::pass()
        } else {
            Shape::Field(Field {
                edge: field.edge.clone(),
                shape: Arc::new(packed),
            })
        })
    }
}

/// Simplify a shape, see [`Optimizer::optimize`]
pub fn optimize(shape: &Shape) -> Result<Shape> {
    Optimizer::optimize(shape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;
    use crate::redactor::Context;
    use crate::shape::*;
    use crate::value::Value;
    use proptest::prelude::*;
    use crate::shape::any;

    fn opt(shape: Shape) -> Shape {
        optimize(&shape).unwrap()
    }

    #[test]
    fn test_constant_folding() {
        let x = field("urn:p", [string()]);

        assert_eq!(opt(and([Shape::fail(), x.clone()])), Shape::fail());
        assert_eq!(opt(or([Shape::pass(), x.clone()])), Shape::pass());
        assert_eq!(opt(and([Shape::pass(), x.clone()])), x);
        assert_eq!(opt(or([Shape::fail(), x.clone()])), x);
    }

    #[test]
    fn test_flattening_and_dedupe() {
        let a = pattern("a");
        let b = pattern("b");
        let c = pattern("c");

        let shape = and([a.clone(), and([b.clone(), and([c.clone(), a.clone()])])]);
        assert_eq!(opt(shape), and([a.clone(), b.clone(), c.clone()]));

        let shape = or([b.clone(), or([a.clone(), b.clone()])]);
        assert_eq!(opt(shape), or([b, a]));
    }

    #[test]
    fn test_count_merging() {
        assert_eq!(opt(and([min_count(3), min_count(5)])), min_count(5));
        assert_eq!(opt(or([min_count(3), min_count(5)])), min_count(3));
        assert_eq!(opt(and([max_count(3), max_count(5)])), max_count(3));
        assert_eq!(opt(or([max_count(3), max_count(5)])), max_count(5));
    }

    #[test]
    fn test_merged_bound_keeps_first_position() {
        let shape = and([pattern("x"), min_count(1), string(), min_count(2)]);
        assert_eq!(opt(shape), and([pattern("x"), min_count(2), string()]));
    }

    #[test]
    fn test_datatype_lattice() {
        let iri = datatype(vocab::IRI_TYPE);
        let resource = datatype(vocab::RESOURCE_TYPE);

        assert_eq!(opt(and([iri.clone(), resource.clone()])), iri);
        assert_eq!(opt(or([iri.clone(), resource.clone()])), resource);

        // incompatible types are retained under conjunction
        let shape = and([datatype(vocab::XSD_STRING), datatype(vocab::XSD_INTEGER)]);
        assert_eq!(opt(shape.clone()), shape);

        assert_eq!(
            opt(or([string(), datatype(vocab::LITERAL_TYPE)])),
            datatype(vocab::LITERAL_TYPE)
        );
    }

    #[test]
    fn test_field_merging() {
        let shape = and([
            field("urn:p", [min_count(1)]),
            field("urn:q", [string()]),
            field("urn:p", [max_count(1)]),
        ]);

        assert_eq!(
            opt(shape),
            and([
                field("urn:p", [min_count(1), max_count(1)]),
                field("urn:q", [string()]),
            ])
        );

        // inverse edges are distinct fields
        let shape = and([field("urn:p", [min_count(1)]), field(Edge::inverse("urn:p"), [min_count(2)])]);
        assert_eq!(opt(shape.clone()), shape);
    }

    #[test]
    fn test_alias_conflict() {
        let shape = and([
            field("urn:p", [alias("first")]),
            field("urn:p", [alias("second")]),
        ]);

        assert!(matches!(optimize(&shape), Err(Error::AliasConflict { .. })));

        let shape = and([field("urn:p", [alias("same")]), field("urn:p", [alias("same"), string()])]);
        assert_eq!(opt(shape), field("urn:p", [alias("same"), string()]));
    }

    #[test]
    fn test_conditional_collapsing() {
        let a = field("urn:a", []);
        let b = field("urn:b", []);

        assert_eq!(opt(when(Shape::pass(), a.clone(), b.clone())), a);
        assert_eq!(opt(when(Shape::fail(), a.clone(), b.clone())), b);
        assert_eq!(opt(when(create(), a.clone(), a.clone())), a);
        assert_eq!(opt(when(and([Shape::pass(), Shape::pass()]), a.clone(), b.clone())), a);

        let guarded = when(create(), a.clone(), b.clone());
        assert_eq!(opt(guarded.clone()), guarded);
    }

    #[test]
    fn test_unsatisfiable_field_is_erased() {
        let shape = and([field("urn:p", [Shape::fail()]), field("urn:q", [])]);
        assert_eq!(opt(shape), field("urn:q", []));
    }

    #[test]
    fn test_set_constraints_untouched() {
        let shape = and([in_set([Value::integer(1)]), any([Value::integer(2)])]);
        assert_eq!(opt(shape.clone()), shape);
    }

    fn leaf() -> impl Strategy<Value = Shape> {
        prop_oneof![
            (0usize..4).prop_map(min_count),
            (0usize..4).prop_map(max_count),
            prop::sample::select(vec![
                vocab::VALUE_TYPE,
                vocab::RESOURCE_TYPE,
                vocab::IRI_TYPE,
                vocab::BNODE_TYPE,
                vocab::LITERAL_TYPE,
                vocab::XSD_STRING,
                vocab::XSD_INTEGER,
            ])
            .prop_map(|iri| datatype(iri)),
            prop::sample::select(vec!["urn:A", "urn:B"]).prop_map(|iri| class(iri)),
            prop::sample::select(vec!["a", "b"]).prop_map(|text| pattern(text)),
            prop::sample::select(vec!["x", "y"]).prop_map(|name| alias(name)),
            (0i64..3).prop_map(|n| any([Value::integer(n)])),
            (0i64..3).prop_map(|n| all([Value::integer(n)])),
            prop::collection::btree_set(0i64..4, 1..3).prop_map(|n| in_set(n.into_iter().map(Value::integer))),
            (0i64..4).prop_map(|n| min_inclusive(Value::integer(n))),
            (0i64..4).prop_map(|n| max_inclusive(Value::integer(n))),
            (0i64..4).prop_map(|n| min_exclusive(Value::integer(n))),
            (0i64..4).prop_map(|n| max_exclusive(Value::integer(n))),
            (0usize..4).prop_map(min_length),
            (0usize..4).prop_map(max_length),
            prop::sample::select(vec!["salesman", "manager"]).prop_map(|name| role([name])),
            prop::sample::select(vec!["create", "update"]).prop_map(|name| task([name])),
            prop::sample::select(vec![CONVEY, FILTER]).prop_map(|name| mode([name])),
            Just(label("Employee")),
            Just(Shape::pass()),
            Just(Shape::fail()),
        ]
    }

    fn paths() -> impl Strategy<Value = Vec<Edge>> {
        prop::collection::vec(
            prop::sample::select(vec![Edge::forward("urn:p"), Edge::inverse("urn:q")]),
            1..3,
        )
    }

    fn guarded(shape: &Shape) -> bool {
        match shape {
            Shape::Guard { .. } => true,
            Shape::Field(field) | Shape::Virtual { field, .. } => guarded(&field.shape),
            Shape::And(shapes) | Shape::Or(shapes) => shapes.iter().any(guarded),
            Shape::When { test, pass, fail } => guarded(test) || guarded(pass) || guarded(fail),
            _ => false,
        }
    }

    fn contexts() -> impl Strategy<Value = Context> {
        (
            prop::option::of(prop::sample::subsequence(vec!["salesman", "manager"], 0..=2)),
            prop::option::of(prop::sample::subsequence(vec!["create", "update"], 0..=2)),
            prop::option::of(prop::sample::subsequence(vec![CONVEY, FILTER], 0..=2)),
        )
            .prop_map(|(roles, tasks, modes)| {
                let mut context = Context::new();
                if let Some(roles) = roles {
                    context = context.with_role(roles);
                }
                if let Some(tasks) = tasks {
                    context = context.with_task(tasks);
                }
                if let Some(modes) = modes {
                    context = context.with_mode(modes);
                }
                context
            })
    }

    fn shapes() -> impl Strategy<Value = Shape> {
        leaf().prop_recursive(4, 48, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(|s| Shape::And(Arc::from(s))),
                prop::collection::vec(inner.clone(), 0..4).prop_map(|s| Shape::Or(Arc::from(s))),
                (
                    prop::sample::select(vec![
                        Edge::forward("urn:p"),
                        Edge::forward("urn:q"),
                        Edge::inverse("urn:p"),
                    ]),
                    inner.clone()
                )
                    .prop_map(|(edge, shape)| Shape::Field(Field::new(edge, shape))),
                (inner.clone(), paths()).prop_map(|(shape, path)| derived("urn:d", [shape], path)),
                (inner.clone(), paths()).prop_map(|(shape, path)| counted("urn:n", [shape], path)),
                (inner.clone(), inner.clone()).prop_map(|(test, shape)| then(test, [shape])),
                (inner.clone(), inner.clone(), inner)
                    .prop_map(|(test, pass, fail)| when(test, pass, fail)),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_optimize_is_idempotent(shape in shapes()) {
            if let Ok(once) = optimize(&shape) {
                let twice = optimize(&once).unwrap();
                prop_assert_eq!(twice, once);
            }
        }

        #[test]
        fn prop_redacted_shapes_are_fixpoints(shape in shapes(), context in contexts()) {
            if let Ok(once) = optimize(&context.redact(&shape)) {
                let twice = optimize(&once).unwrap();
                prop_assert_eq!(twice, once);
            }
        }

        #[test]
        fn prop_full_context_resolves_every_guard(shape in shapes()) {
            let context = Context::new()
                .with_role(["salesman"])
                .with_task(["create"])
                .with_view(["detail"])
                .with_mode([FILTER]);

            prop_assert!(!guarded(&context.redact(&shape)));
        }

        #[test]
        fn prop_sentinels_absorb(shape in shapes()) {
            if optimize(&shape).is_ok() {
                prop_assert_eq!(opt(and([Shape::fail(), shape.clone()])), Shape::fail());
                prop_assert_eq!(opt(or([Shape::pass(), shape])), Shape::pass());
            }
        }
    }
}
