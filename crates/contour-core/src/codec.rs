//! Shape persistence over the `app:/shapes#` vocabulary
//!
//! Every shape node becomes a blank node typed with its variant name; sets and
//! sequences become RDF collections. Decoding reads the same layout back from
//! any [`Graph`] and rejects missing or ill-typed properties.

use crate::edge::{Direction, Edge, Path};
use crate::error::{Error, Result};
use crate::graph::{Graph, Model};
use crate::limits;
use crate::shape::{Axis, Derivation, Field, Shape};
use crate::value::{Iri, Statement, Value};
use crate::vocab;
use std::collections::BTreeSet;
use std::sync::Arc;

// ─────────────────────────────────────────────────────────────────────────────
// Vocabulary
// ─────────────────────────────────────────────────────────────────────────────

pub const KEY: &str = "app:/shapes#key";
pub const VALUE: &str = "app:/shapes#value";
pub const AXIS: &str = "app:/shapes#axis";
pub const VALUES: &str = "app:/shapes#values";
pub const IRI: &str = "app:/shapes#iri";
pub const LIMIT: &str = "app:/shapes#limit";
pub const TEXT: &str = "app:/shapes#text";
pub const FLAGS: &str = "app:/shapes#flags";
pub const SHAPE: &str = "app:/shapes#shape";
pub const SHAPES: &str = "app:/shapes#shapes";
pub const STEP: &str = "app:/shapes#step";
pub const INVERSE: &str = "app:/shapes#inverse";
pub const PATH: &str = "app:/shapes#path";
pub const COUNT: &str = "app:/shapes#count";
pub const TEST: &str = "app:/shapes#test";
pub const PASS: &str = "app:/shapes#pass";
pub const FAIL: &str = "app:/shapes#fail";

fn kind(shape: &Shape) -> &'static str {
    match shape {
        Shape::Meta { .. } => "Meta",
        Shape::Guard { .. } => "Guard",
        Shape::Datatype(_) => "Datatype",
        Shape::Class(_) => "Class",
        Shape::MinExclusive(_) => "MinExclusive",
        Shape::MaxExclusive(_) => "MaxExclusive",
        Shape::MinInclusive(_) => "MinInclusive",
        Shape::MaxInclusive(_) => "MaxInclusive",
        Shape::MinLength(_) => "MinLength",
        Shape::MaxLength(_) => "MaxLength",
        Shape::Pattern { .. } => "Pattern",
        Shape::Like(_) => "Like",
        Shape::MinCount(_) => "MinCount",
        Shape::MaxCount(_) => "MaxCount",
        Shape::In(_) => "In",
        Shape::All(_) => "All",
        Shape::Any(_) => "Any",
        Shape::Field(_) => "Field",
        Shape::Virtual { .. } => "Virtual",
        Shape::And(_) => "And",
        Shape::Or(_) => "Or",
        Shape::When { .. } => "When",
    }
}

fn type_iri(name: &str) -> Value {
    Value::iri(format!("{}{}", vocab::SHAPES, name))
}

// ─────────────────────────────────────────────────────────────────────────────
// Encoding
// ─────────────────────────────────────────────────────────────────────────────

/// Encode a shape, returning its root node and the describing statements
pub fn encode(shape: &Shape) -> (Value, Model) {
    let mut encoder = Encoder::default();
    let root = encoder.shape(shape);
    (root, encoder.model)
}

#[derive(Default)]
struct Encoder {
    model: Model,
    next: usize,
}

impl Encoder {
    fn node(&mut self) -> Value {
        let node = Value::bnode(format!("s{}", self.next));
        self.next += 1;
        node
    }

    fn add(&mut self, subject: &Value, predicate: &str, object: Value) {
        self.model.insert(Statement::new(subject.clone(), predicate, object));
    }

    fn shape(&mut self, shape: &Shape) -> Value {
        let node = self.node();
        self.add(&node, vocab::RDF_TYPE, type_iri(kind(shape)));

        match shape {
            Shape::Meta { key, value } => {
                self.add(&node, KEY, Value::string(key.as_str()));
                self.add(&node, VALUE, value.clone());
            }
            Shape::Guard { axis, values } => {
                self.add(&node, AXIS, Value::string(axis.as_str()));
                let list = self.list(values.iter().map(|value| Value::string(value.as_str())).collect());
                self.add(&node, VALUES, list);
            }
            Shape::Datatype(iri) | Shape::Class(iri) => {
                self.add(&node, IRI, Value::Iri(iri.clone()));
            }
            Shape::MinExclusive(value)
            | Shape::MaxExclusive(value)
            | Shape::MinInclusive(value)
            | Shape::MaxInclusive(value) => {
                self.add(&node, VALUE, value.clone());
            }
            Shape::MinLength(limit)
            | Shape::MaxLength(limit)
            | Shape::MinCount(limit)
            | Shape::MaxCount(limit) => {
                self.add(&node, LIMIT, Value::integer(*limit as i64));
            }
            Shape::Pattern { text, flags } => {
                self.add(&node, TEXT, Value::string(text.as_str()));
                self.add(&node, FLAGS, Value::string(flags.as_str()));
            }
            Shape::Like(text) => {
                self.add(&node, TEXT, Value::string(text.as_str()));
            }
            Shape::In(values) | Shape::All(values) | Shape::Any(values) => {
                let list = self.list(values.iter().cloned().collect());
                self.add(&node, VALUES, list);
            }
            Shape::Field(field) => {
                self.field(&node, field);
            }
            Shape::Virtual { field, derivation } => {
                self.field(&node, field);
                let steps: Vec<Value> = derivation.path().iter().map(|edge| self.step(edge)).collect();
                let list = self.list(steps);
                self.add(&node, PATH, list);
                self.add(&node, COUNT, Value::boolean(derivation.is_aggregate()));
            }
            Shape::And(shapes) | Shape::Or(shapes) => {
                let members: Vec<Value> = shapes.iter().map(|shape| self.shape(shape)).collect();
                let list = self.list(members);
                self.add(&node, SHAPES, list);
            }
            Shape::When { test, pass, fail } => {
                let test = self.shape(test);
                let pass = self.shape(pass);
                let fail = self.shape(fail);
                self.add(&node, TEST, test);
                self.add(&node, PASS, pass);
                self.add(&node, FAIL, fail);
            }
        }

        node
    }

    fn field(&mut self, node: &Value, field: &Field) {
        self.add(node, STEP, Value::Iri(field.edge.property.clone()));
        self.add(node, INVERSE, Value::boolean(field.edge.is_inverse()));
        let nested = self.shape(&field.shape);
        self.add(node, SHAPE, nested);
    }

    fn step(&mut self, edge: &Edge) -> Value {
        let node = self.node();
        self.add(&node, STEP, Value::Iri(edge.property.clone()));
        self.add(&node, INVERSE, Value::boolean(edge.is_inverse()));
        node
    }

    fn list(&mut self, items: Vec<Value>) -> Value {
        let mut head = Value::iri(vocab::RDF_NIL);
        for item in items.into_iter().rev() {
            let cell = self.node();
            self.add(&cell, vocab::RDF_FIRST, item);
            self.add(&cell, vocab::RDF_REST, head);
            head = cell;
        }
        head
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decoding
// ─────────────────────────────────────────────────────────────────────────────

/// Decode the shape rooted at `root`
pub fn decode<G: Graph + ?Sized>(root: &Value, graph: &G) -> Result<Shape> {
    Decoder { graph }.shape(root, 1)
}

struct Decoder<'g, G: Graph + ?Sized> {
    graph: &'g G,
}

impl<'g, G: Graph + ?Sized> Decoder<'g, G> {
    fn shape(&self, node: &Value, depth: usize) -> Result<Shape> {
        limits::validate_shape_depth(depth)?;

        let types: Vec<Value> = self
            .graph
            .traverse(node, &Edge::forward(vocab::RDF_TYPE))
            .into_iter()
            .collect();

        let name = match types.as_slice() {
            [Value::Iri(iri)] => iri
                .as_str()
                .strip_prefix(vocab::SHAPES)
                .ok_or_else(|| malformed(node, &format!("unknown shape type {}", iri)))?,
            [] => return Err(malformed(node, "missing shape type")),
            _ => return Err(malformed(node, "multiple shape types")),
        };

        let shape = match name {
            "Meta" => Shape::Meta {
                key: self.text(node, KEY)?,
                value: self.value(node, VALUE)?,
            },
            "Guard" => {
                let axis = self.text(node, AXIS)?;
                Shape::Guard {
                    axis: axis.parse::<Axis>().map_err(|e| malformed(node, &e))?,
                    values: self
                        .list(&self.value(node, VALUES)?)?
                        .into_iter()
                        .map(|value| value.lexical().to_string())
                        .collect(),
                }
            }
            "Datatype" => Shape::Datatype(self.iri(node, IRI)?),
            "Class" => Shape::Class(self.iri(node, IRI)?),
            "MinExclusive" => Shape::MinExclusive(self.value(node, VALUE)?),
            "MaxExclusive" => Shape::MaxExclusive(self.value(node, VALUE)?),
            "MinInclusive" => Shape::MinInclusive(self.value(node, VALUE)?),
            "MaxInclusive" => Shape::MaxInclusive(self.value(node, VALUE)?),
            "MinLength" => Shape::MinLength(self.limit(node)?),
            "MaxLength" => Shape::MaxLength(self.limit(node)?),
            "Pattern" => Shape::Pattern {
                text: self.text(node, TEXT)?,
                flags: self.optional_text(node, FLAGS)?.unwrap_or_default(),
            },
            "Like" => Shape::Like(self.text(node, TEXT)?),
            "MinCount" => Shape::MinCount(self.limit(node)?),
            "MaxCount" => Shape::MaxCount(self.limit(node)?),
            "In" => Shape::In(self.set(node)?),
            "All" => Shape::All(self.set(node)?),
            "Any" => Shape::Any(self.set(node)?),
            "Field" => Shape::Field(self.field(node, depth)?),
            "Virtual" => {
                let field = self.field(node, depth)?;
                let path = self
                    .list(&self.value(node, PATH)?)?
                    .iter()
                    .map(|step| self.edge(step))
                    .collect::<Result<Path>>()?;
                let derivation = if self.flag(node, COUNT)? {
                    Derivation::Count(path)
                } else {
                    Derivation::Path(path)
                };
                Shape::Virtual { field, derivation }
            }
            "And" | "Or" => {
                let members = self
                    .list(&self.value(node, SHAPES)?)?
                    .iter()
                    .map(|member| self.shape(member, depth + 1))
                    .collect::<Result<Vec<_>>>()?;
                if name == "And" {
                    Shape::And(Arc::from(members))
                } else {
                    Shape::Or(Arc::from(members))
                }
            }
            "When" => Shape::When {
                test: Arc::new(self.shape(&self.value(node, TEST)?, depth + 1)?),
                pass: Arc::new(self.shape(&self.value(node, PASS)?, depth + 1)?),
                fail: Arc::new(self.shape(&self.value(node, FAIL)?, depth + 1)?),
            },
            other => return Err(malformed(node, &format!("unknown shape type {}", other))),
        };

        Ok(shape)
    }

    fn field(&self, node: &Value, depth: usize) -> Result<Field> {
        let edge = self.edge(node)?;
        let nested = self.shape(&self.value(node, SHAPE)?, depth + 1)?;
        Ok(Field {
            edge,
            shape: Arc::new(nested),
        })
    }

    fn edge(&self, node: &Value) -> Result<Edge> {
        let property = self.iri(node, STEP)?;
        let direction = if self.optional(node, INVERSE)?.is_some() && self.flag(node, INVERSE)? {
            Direction::Inverse
        } else {
            Direction::Forward
        };
        Ok(Edge { property, direction })
    }

    fn optional(&self, node: &Value, property: &str) -> Result<Option<Value>> {
        let mut objects = self.graph.traverse(node, &Edge::forward(property)).into_iter();
        match (objects.next(), objects.next()) {
            (None, _) => Ok(None),
            (Some(value), None) => Ok(Some(value)),
            (Some(_), Some(_)) => Err(malformed(node, &format!("multiple <{}> values", property))),
        }
    }

    fn value(&self, node: &Value, property: &str) -> Result<Value> {
        self.optional(node, property)?
            .ok_or_else(|| malformed(node, &format!("missing <{}> value", property)))
    }

    fn iri(&self, node: &Value, property: &str) -> Result<Iri> {
        match self.value(node, property)? {
            Value::Iri(iri) => Ok(iri),
            other => Err(malformed(node, &format!("<{}> is not an IRI: {}", property, other))),
        }
    }

    fn optional_text(&self, node: &Value, property: &str) -> Result<Option<String>> {
        match self.optional(node, property)? {
            None => Ok(None),
            Some(Value::Literal(literal)) => Ok(Some(literal.lexical)),
            Some(other) => Err(malformed(node, &format!("<{}> is not a literal: {}", property, other))),
        }
    }

    fn text(&self, node: &Value, property: &str) -> Result<String> {
        self.optional_text(node, property)?
            .ok_or_else(|| malformed(node, &format!("missing <{}> value", property)))
    }

    fn limit(&self, node: &Value) -> Result<usize> {
        let text = self.text(node, LIMIT)?;
        text.trim()
            .parse::<usize>()
            .map_err(|_| malformed(node, &format!("<{}> is not a non-negative integer: {}", LIMIT, text)))
    }

    fn flag(&self, node: &Value, property: &str) -> Result<bool> {
        match self.text(node, property)?.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            other => Err(malformed(node, &format!("<{}> is not a boolean: {}", property, other))),
        }
    }

    fn set(&self, node: &Value) -> Result<BTreeSet<Value>> {
        Ok(self.list(&self.value(node, VALUES)?)?.into_iter().collect())
    }

    fn list(&self, head: &Value) -> Result<Vec<Value>> {
        let nil = Value::iri(vocab::RDF_NIL);
        let mut items = Vec::new();
        let mut visited = BTreeSet::new();
        let mut cell = head.clone();

        while cell != nil {
            if !visited.insert(cell.clone()) {
                return Err(malformed(head, "cyclic list"));
            }
            items.push(self.value(&cell, vocab::RDF_FIRST)?);
            cell = self.value(&cell, vocab::RDF_REST)?;
        }

        Ok(items)
    }
}

fn malformed(node: &Value, message: &str) -> Error {
    Error::SpecMalformed(format!("{}: {}", node, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::*;

    fn sample() -> Shape {
        and([
            label("Employee"),
            class("urn:Employee"),
            field(
                "urn:title",
                [required(), string(), pattern_with("sales.*", "i"), max_length(80)],
            ),
            field(Edge::inverse("urn:reports"), [optional(), in_set([Value::iri("urn:a"), Value::iri("urn:b")])]),
            then(role(["manager"]), [field("urn:salary", [integer(), min_inclusive(Value::integer(0))])]),
            counted("urn:count", [integer()], vec![Edge::forward("urn:sells"), Edge::inverse("urn:order")]),
            or([like("sal rep"), any([Value::string("x")])]),
        ])
    }

    #[test]
    fn test_encode_decode() {
        let shape = sample();
        let (root, model) = encode(&shape);

        assert!(matches!(root, Value::Bnode(_)));
        assert_eq!(decode(&root, &model).unwrap(), shape);
    }

    #[test]
    fn test_sentinels() {
        for shape in [Shape::pass(), Shape::fail()] {
            let (root, model) = encode(&shape);
            assert_eq!(decode(&root, &model).unwrap(), shape);
        }
    }

    #[test]
    fn test_missing_property_is_malformed() {
        let node = Value::bnode("x");
        let model = Model::new().with(Statement::new(node.clone(), vocab::RDF_TYPE, type_iri("MinCount")));

        assert!(matches!(decode(&node, &model), Err(Error::SpecMalformed(_))));
    }

    #[test]
    fn test_ill_typed_property_is_malformed() {
        let node = Value::bnode("x");
        let model = Model::new()
            .with(Statement::new(node.clone(), vocab::RDF_TYPE, type_iri("Class")))
            .with(Statement::new(node.clone(), IRI, Value::string("not an iri")));

        assert!(matches!(decode(&node, &model), Err(Error::SpecMalformed(_))));
    }

    #[test]
    fn test_unknown_type_is_malformed() {
        let node = Value::bnode("x");
        let model = Model::new().with(Statement::new(node.clone(), vocab::RDF_TYPE, Value::iri("urn:Other")));

        assert!(matches!(decode(&node, &model), Err(Error::SpecMalformed(_))));
        assert!(matches!(decode(&Value::bnode("y"), &model), Err(Error::SpecMalformed(_))));
    }

    #[test]
    fn test_cyclic_list_is_malformed() {
        let node = Value::bnode("x");
        let cell = Value::bnode("c");
        let model = Model::new()
            .with(Statement::new(node.clone(), vocab::RDF_TYPE, type_iri("In")))
            .with(Statement::new(node.clone(), VALUES, cell.clone()))
            .with(Statement::new(cell.clone(), vocab::RDF_FIRST, Value::integer(1)))
            .with(Statement::new(cell.clone(), vocab::RDF_REST, cell));

        assert!(matches!(decode(&node, &model), Err(Error::SpecMalformed(_))));
    }

    #[test]
    fn test_depth_is_bounded() {
        let deep = (0..limits::MAX_SHAPE_DEPTH + 1).fold(min_count(1), |shape, _| field("urn:p", [shape]));
        let (root, model) = encode(&deep);

        assert!(matches!(decode(&root, &model), Err(Error::Limit(_))));
    }
}
