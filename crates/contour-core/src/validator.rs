//! Shape validation over a graph
//!
//! Violations are reported as issues inside the returned [`Focus`]; the
//! validator itself never fails on a well-formed shape.

use crate::focus::{Focus, Frame, Issue, Level};
use crate::graph::Graph;
use crate::pattern;
use crate::shape::{Field, Shape};
use crate::value::Value;
use crate::vocab;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::time::Instant;

/// Validates value sets against shapes over one graph snapshot
pub struct Validator<'g, G: Graph + ?Sized> {
    graph: &'g G,
}

impl<'g, G: Graph + ?Sized> Validator<'g, G> {
    pub fn new(graph: &'g G) -> Self {
        Self { graph }
    }

    /// Validate `focus` against `shape`
    pub fn validate(&self, shape: &Shape, focus: &BTreeSet<Value>) -> Focus {
        let start = Instant::now();
        let report = self.check(shape, focus);

        tracing::debug!(
            values = focus.len(),
            errors = report.assess(Level::Error),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Validated focus"
        );

        report
    }

    /// Validate the description of `resource`, flagging statements the shape
    /// doesn't account for
    pub fn validate_resource(&self, shape: &Shape, resource: &Value) -> Focus {
        let focus: BTreeSet<Value> = [resource.clone()].into_iter().collect();
        let report = self.validate(shape, &focus);
        let outline = report.outline();

        let unexpected = self
            .graph
            .statements()
            .into_iter()
            .filter(|statement| !outline.contains(statement))
            .map(|statement| {
                let issue = Issue::error(format!("unexpected statement {}", statement), shape);
                Frame::new(statement.subject.clone()).with_issue(issue)
            });

        report.merge(Focus::frames(unexpected))
    }

    fn check(&self, shape: &Shape, focus: &BTreeSet<Value>) -> Focus {
        match shape {
            Shape::Meta { .. } => Focus::new(),

            Shape::Guard { axis, .. } => {
                tracing::warn!(%axis, "Unresolved guard ignored during validation");
                Focus::new()
            }

            Shape::Datatype(iri) => self.each(focus, shape, |value| {
                vocab::derives(iri.as_str(), value.datatype())
                    .then_some(())
                    .ok_or_else(|| format!("{} is not of type {}", value, iri))
            }),

            Shape::Class(iri) => {
                let class = Value::Iri(iri.clone());
                self.each(focus, shape, |value| {
                    (value.is_resource() && self.graph.types(value).contains(&class))
                        .then_some(())
                        .ok_or_else(|| format!("{} is not an instance of {}", value, iri))
                })
            }

            Shape::MinExclusive(limit) => self.range(focus, shape, limit, |o| o == Ordering::Greater, ">"),
            Shape::MaxExclusive(limit) => self.range(focus, shape, limit, |o| o == Ordering::Less, "<"),
            Shape::MinInclusive(limit) => self.range(focus, shape, limit, |o| o != Ordering::Less, ">="),
            Shape::MaxInclusive(limit) => self.range(focus, shape, limit, |o| o != Ordering::Greater, "<="),

            Shape::MinLength(limit) => self.each(focus, shape, |value| {
                let length = value.lexical().chars().count();
                (length >= *limit)
                    .then_some(())
                    .ok_or_else(|| format!("{} is shorter than {} characters", value, limit))
            }),

            Shape::MaxLength(limit) => self.each(focus, shape, |value| {
                let length = value.lexical().chars().count();
                (length <= *limit)
                    .then_some(())
                    .ok_or_else(|| format!("{} is longer than {} characters", value, limit))
            }),

            Shape::Pattern { text, flags } => match pattern::full_match(text, flags) {
                Ok(regex) => self.each(focus, shape, |value| {
                    regex
                        .is_match(value.lexical())
                        .then_some(())
                        .ok_or_else(|| format!("{} doesn't match /{}/", value, text))
                }),
                Err(e) => Focus::issue(Issue::error(e.to_string(), shape)),
            },

            Shape::Like(keywords) => {
                match pattern::compile(&pattern::like_expression(keywords), pattern::LIKE_FLAGS) {
                    Ok(regex) => self.each(focus, shape, |value| {
                        regex
                            .is_match(value.lexical())
                            .then_some(())
                            .ok_or_else(|| format!("{} isn't like '{}'", value, keywords))
                    }),
                    Err(e) => Focus::issue(Issue::error(e.to_string(), shape)),
                }
            }

            Shape::MinCount(limit) => {
                if focus.len() < *limit {
                    Focus::issue(Issue::error(
                        format!("expected at least {} values, found {}", limit, focus.len()),
                        shape,
                    ))
                } else {
                    Focus::new()
                }
            }

            Shape::MaxCount(limit) => {
                if focus.len() > *limit {
                    Focus::issue(Issue::error(
                        format!("expected at most {} values, found {}", limit, focus.len()),
                        shape,
                    ))
                } else {
                    Focus::new()
                }
            }

            Shape::In(values) => self.each(focus, shape, |value| {
                values
                    .contains(value)
                    .then_some(())
                    .ok_or_else(|| format!("{} is not an allowed value", value))
            }),

            Shape::All(values) => {
                let missing: Vec<String> = values
                    .difference(focus)
                    .map(|value| value.to_string())
                    .collect();

                if missing.is_empty() {
                    Focus::new()
                } else {
                    Focus::issue(Issue::error(
                        format!("missing required values {}", missing.join(", ")),
                        shape,
                    ))
                }
            }

            Shape::Any(values) => {
                if values.is_disjoint(focus) {
                    Focus::issue(Issue::error("no expected value found", shape))
                } else {
                    Focus::new()
                }
            }

            Shape::Field(field) => self.field(field, focus),

            // computed on read, never stored
            Shape::Virtual { .. } => Focus::new(),

            Shape::And(shapes) => Focus::merged(shapes.iter().map(|shape| self.check(shape, focus))),

            Shape::Or(shapes) => {
                let reports: Vec<Focus> = shapes.iter().map(|shape| self.check(shape, focus)).collect();

                if shapes.is_empty() {
                    return Focus::issue(Issue::error("no alternative can be satisfied", shape));
                }

                let (passing, failing): (Vec<Focus>, Vec<Focus>) = reports
                    .into_iter()
                    .partition(|report| !report.assess(Level::Error));

                if passing.is_empty() {
                    Focus::merged(failing)
                } else {
                    Focus::merged(passing)
                }
            }

            Shape::When { test, pass, fail } => {
                if self.check(test, focus).assess(Level::Error) {
                    self.check(fail, focus)
                } else {
                    self.check(pass, focus)
                }
            }
        }
    }

    fn field(&self, field: &Field, focus: &BTreeSet<Value>) -> Focus {
        Focus::frames(focus.iter().map(|value| {
            let reached = self.graph.traverse(value, &field.edge);
            let nested = self
                .check(&field.shape, &reached)
                .merge(Focus::frames(reached.into_iter().map(Frame::new)));

            Frame::new(value.clone()).with_field(field.edge.clone(), nested)
        }))
    }

    /// Report a frame issue for every value failing `check`
    fn each(
        &self,
        focus: &BTreeSet<Value>,
        shape: &Shape,
        check: impl Fn(&Value) -> Result<(), String>,
    ) -> Focus {
        Focus::frames(focus.iter().filter_map(|value| {
            check(value)
                .err()
                .map(|message| Frame::new(value.clone()).with_issue(Issue::error(message, shape)))
        }))
    }

    fn range(
        &self,
        focus: &BTreeSet<Value>,
        shape: &Shape,
        limit: &Value,
        accept: fn(Ordering) -> bool,
        operator: &str,
    ) -> Focus {
        self.each(focus, shape, |value| match value.compare(limit) {
            Some(ordering) if accept(ordering) => Ok(()),
            Some(_) => Err(format!("{} is not {} {}", value, operator, limit)),
            None => Err(format!("{} is not comparable with {}", value, limit)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;
    use crate::graph::Model;
    use crate::shape::*;
    use crate::value::Statement;

    const TERMS: &str = "http://example.com/terms#";

    fn term(name: &str) -> String {
        format!("{}{}", TERMS, name)
    }

    fn item(name: &str) -> Value {
        Value::iri(format!("http://example.com/employees/{}", name))
    }

    fn set(values: impl IntoIterator<Item = Value>) -> BTreeSet<Value> {
        values.into_iter().collect()
    }

    fn employees() -> Model {
        [
            Statement::new(item("1"), vocab::RDF_TYPE, Value::iri(term("Employee"))),
            Statement::new(item("1"), term("title"), Value::string("President")),
            Statement::new(item("1"), term("seniority"), Value::integer(5)),
            Statement::new(item("2"), vocab::RDF_TYPE, Value::iri(term("Employee"))),
            Statement::new(item("2"), term("title"), Value::string("Sales Rep")),
            Statement::new(item("2"), term("seniority"), Value::integer(7)),
            Statement::new(item("2"), term("supervisor"), item("1")),
        ]
        .into_iter()
        .collect()
    }

    fn employee() -> Shape {
        and([
            class(term("Employee")),
            field(term("title").as_str(), [required(), string()]),
            field(
                term("seniority").as_str(),
                [required(), integer(), min_inclusive(Value::integer(1)), max_inclusive(Value::integer(5))],
            ),
            field(term("supervisor").as_str(), [optional(), resource()]),
        ])
    }

    #[test]
    fn test_counts_on_empty_focus() {
        let model = Model::new();
        let validator = Validator::new(&model);

        assert!(validator.validate(&min_count(2), &BTreeSet::new()).assess(Level::Error));
        assert!(!validator.validate(&max_count(2), &BTreeSet::new()).assess(Level::Error));
    }

    #[test]
    fn test_term_constraints() {
        let model = Model::new();
        let validator = Validator::new(&model);

        let strings = set([Value::string("abc"), Value::string("abcdef")]);
        let report = validator.validate(&max_length(4), &strings);
        assert_eq!(report.frames.len(), 1);
        assert!(report.frames.contains_key(&Value::string("abcdef")));

        assert!(!validator.validate(&pattern("ab.*"), &strings).assess(Level::Error));
        assert!(validator.validate(&pattern("b.*"), &strings).assess(Level::Error));
        assert!(!validator.validate(&like("abc"), &strings).assess(Level::Error));

        let numbers = set([Value::integer(3)]);
        assert!(!validator.validate(&min_exclusive(Value::integer(2)), &numbers).assess(Level::Error));
        assert!(validator.validate(&min_exclusive(Value::integer(3)), &numbers).assess(Level::Error));
        assert!(validator.validate(&min_inclusive(Value::string("x")), &numbers).assess(Level::Error));

        assert!(!validator.validate(&datatype(vocab::LITERAL_TYPE), &numbers).assess(Level::Error));
        assert!(validator.validate(&datatype(vocab::IRI_TYPE), &numbers).assess(Level::Error));
    }

    #[test]
    fn test_set_constraints() {
        let model = Model::new();
        let validator = Validator::new(&model);
        let focus = set([Value::integer(1), Value::integer(2)]);

        assert!(!validator.validate(&all([Value::integer(1)]), &focus).assess(Level::Error));
        assert!(validator.validate(&all([Value::integer(3)]), &focus).assess(Level::Error));
        assert!(!validator.validate(&any([Value::integer(2), Value::integer(9)]), &focus).assess(Level::Error));
        assert!(validator.validate(&any([Value::integer(9)]), &focus).assess(Level::Error));
        assert!(validator.validate(&in_set([Value::integer(1)]), &focus).assess(Level::Error));
    }

    #[test]
    fn test_field_nesting() {
        let model = employees();
        let validator = Validator::new(&model);

        let report = validator.validate(&employee(), &set([item("1"), item("2")]));
        assert!(report.assess(Level::Error));

        let pruned = report.prune(Level::Error).unwrap();
        assert_eq!(pruned.frames.len(), 1);

        let frame = &pruned.frames[&item("2")];
        let seniority = &frame.fields[&Edge::forward(term("seniority"))];
        assert!(seniority.frames.contains_key(&Value::integer(7)));

        assert!(!validator.validate(&employee(), &set([item("1")])).assess(Level::Error));
    }

    #[test]
    fn test_class_uses_type_closure() {
        let mut model = employees();
        model.insert(Statement::new(
            Value::iri(term("Employee")),
            vocab::RDFS_SUBCLASS_OF,
            Value::iri(term("Person")),
        ));

        let validator = Validator::new(&model);
        let report = validator.validate(&class(term("Person")), &set([item("1")]));
        assert!(!report.assess(Level::Error));
    }

    #[test]
    fn test_disjunction_reports_passing_branch() {
        let model = Model::new();
        let validator = Validator::new(&model);
        let focus = set([Value::string("abc")]);

        let report = validator.validate(&or([max_length(1), pattern("a.*")]), &focus);
        assert!(report.is_empty());

        let report = validator.validate(&or([max_length(1), pattern("x")]), &focus);
        assert_eq!(report.frames[&Value::string("abc")].issues.len(), 2);

        assert!(validator.validate(&Shape::fail(), &focus).assess(Level::Error));
        assert!(validator.validate(&Shape::pass(), &focus).is_empty());
    }

    #[test]
    fn test_conditional_discards_test_issues() {
        let model = Model::new();
        let validator = Validator::new(&model);
        let focus = set([Value::string("abc")]);

        let shape = when(max_length(1), min_count(5), max_count(5));
        let report = validator.validate(&shape, &focus);
        assert!(report.is_empty());

        let shape = when(max_length(5), min_count(5), max_count(5));
        assert!(validator.validate(&shape, &focus).assess(Level::Error));
    }

    #[test]
    fn test_outline_covers_traversed_statements() {
        let model = employees();
        let validator = Validator::new(&model);

        let shape = field(term("title").as_str(), [string()]);
        let outline = validator.validate(&shape, &set([item("2")])).outline();

        assert_eq!(
            outline,
            [Statement::new(item("2"), term("title"), Value::string("Sales Rep"))]
                .into_iter()
                .collect()
        );
    }

    #[test]
    fn test_validate_resource_flags_unexpected_statements() {
        let model: Model = [
            Statement::new(item("9"), term("title"), Value::string("Clerk")),
            Statement::new(item("9"), term("nickname"), Value::string("Bob")),
        ]
        .into_iter()
        .collect();

        let validator = Validator::new(&model);
        let report = validator.validate_resource(&field(term("title").as_str(), [string()]), &item("9"));

        let issues = &report.frames[&item("9")].issues;
        assert_eq!(issues.len(), 1);
        assert!(issues.iter().all(|issue| issue.message.contains("nickname")));
    }
}
