//! Shape constraint model
//!
//! A [`Shape`] is an immutable constraint tree. Logical nodes share their
//! children through [`Arc`], so transforms rebuild only the spine they touch.
//! `And([])` is the universally-true shape and `Or([])` the universally-false
//! one.

use crate::edge::{Edge, Path};
use crate::value::{Iri, Value};
use crate::vocab;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Parametric guard axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Role,
    Task,
    View,
    Mode,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::Task => "task",
            Self::View => "view",
            Self::Mode => "mode",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "role" => Ok(Self::Role),
            "task" => Ok(Self::Task),
            "view" => Ok(Self::View),
            "mode" => Ok(Self::Mode),
            _ => Err(format!("Unknown axis: {}", s)),
        }
    }
}

// Task axis values
pub const CREATE: &str = "create";
pub const RELATE: &str = "relate";
pub const UPDATE: &str = "update";
pub const DELETE: &str = "delete";

// View axis values
pub const DIGEST: &str = "digest";
pub const DETAIL: &str = "detail";

// Mode axis values
pub const CONVEY: &str = "convey";
pub const FILTER: &str = "filter";

/// Annotation key for user-declared field aliases
pub const ALIAS: &str = "alias";

/// Annotation key for human-readable labels
pub const LABEL: &str = "label";

/// A field: values reached along `edge` must satisfy `shape`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Field {
    pub edge: Edge,
    pub shape: Arc<Shape>,
}

impl Field {
    pub fn new(edge: impl Into<Edge>, shape: Shape) -> Self {
        Self {
            edge: edge.into(),
            shape: Arc::new(shape),
        }
    }
}

/// How a virtual field computes its values
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Derivation {
    /// Values reached by following the path
    Path(Path),
    /// Distinct count of the values reached by following the path
    Count(Path),
}

impl Derivation {
    pub fn path(&self) -> &Path {
        match self {
            Self::Path(path) | Self::Count(path) => path,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Self::Count(_))
    }
}

/// Constraint tree node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Shape {
    // ─────────────────────────────────────────────────────────────────────────
    // Annotations
    // ─────────────────────────────────────────────────────────────────────────
    /// Free-form annotation, e.g. labels and aliases
    Meta { key: String, value: Value },

    /// Restricts the enclosing shape to contexts where `axis` takes one of `values`
    Guard { axis: Axis, values: BTreeSet<String> },

    // ─────────────────────────────────────────────────────────────────────────
    // Term constraints
    // ─────────────────────────────────────────────────────────────────────────
    /// Every value has the given kind or datatype
    Datatype(Iri),

    /// Every value is an instance of the given class
    Class(Iri),

    MinExclusive(Value),
    MaxExclusive(Value),
    MinInclusive(Value),
    MaxInclusive(Value),

    /// Lexical form length lower bound
    MinLength(usize),

    /// Lexical form length upper bound
    MaxLength(usize),

    /// Lexical form matches the whole regular expression
    Pattern { text: String, flags: String },

    /// Lexical form contains the keyword stems in order
    Like(String),

    // ─────────────────────────────────────────────────────────────────────────
    // Set constraints
    // ─────────────────────────────────────────────────────────────────────────
    MinCount(usize),
    MaxCount(usize),

    /// Every value is in the set
    In(BTreeSet<Value>),

    /// Every member of the set is a value
    All(BTreeSet<Value>),

    /// Some member of the set is a value
    Any(BTreeSet<Value>),

    // ─────────────────────────────────────────────────────────────────────────
    // Structural
    // ─────────────────────────────────────────────────────────────────────────
    Field(Field),

    /// A field computed from a derivation path rather than stored
    Virtual { field: Field, derivation: Derivation },

    // ─────────────────────────────────────────────────────────────────────────
    // Logical
    // ─────────────────────────────────────────────────────────────────────────
    And(Arc<[Shape]>),
    Or(Arc<[Shape]>),
    When {
        test: Arc<Shape>,
        pass: Arc<Shape>,
        fail: Arc<Shape>,
    },
}

impl Shape {
    /// The universally-true shape
    pub fn pass() -> Self {
        Self::And(Arc::from(Vec::new()))
    }

    /// The universally-false shape
    pub fn fail() -> Self {
        Self::Or(Arc::from(Vec::new()))
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::And(shapes) if shapes.is_empty())
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Or(shapes) if shapes.is_empty())
    }

    /// Direct children of logical and structural nodes
    pub fn children(&self) -> Vec<&Shape> {
        match self {
            Self::Field(field) | Self::Virtual { field, .. } => vec![field.shape.as_ref()],
            Self::And(shapes) | Self::Or(shapes) => shapes.iter().collect(),
            Self::When { test, pass, fail } => vec![test.as_ref(), pass.as_ref(), fail.as_ref()],
            _ => Vec::new(),
        }
    }

    /// Nesting depth, leaves counting as one
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(Shape::depth)
            .max()
            .unwrap_or(0)
    }

    /// Check whether the tree still holds guards
    pub fn is_guarded(&self) -> bool {
        matches!(self, Self::Guard { .. }) || self.children().into_iter().any(Shape::is_guarded)
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::pass()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Meta { key, value } => write!(f, "meta({}, {})", key, value),
            Self::Guard { axis, values } => write!(f, "{}({})", axis, join(values.iter())),
            Self::Datatype(iri) => write!(f, "datatype({})", iri),
            Self::Class(iri) => write!(f, "class({})", iri),
            Self::MinExclusive(value) => write!(f, "minExclusive({})", value),
            Self::MaxExclusive(value) => write!(f, "maxExclusive({})", value),
            Self::MinInclusive(value) => write!(f, "minInclusive({})", value),
            Self::MaxInclusive(value) => write!(f, "maxInclusive({})", value),
            Self::MinLength(limit) => write!(f, "minLength({})", limit),
            Self::MaxLength(limit) => write!(f, "maxLength({})", limit),
            Self::Pattern { text, flags } if flags.is_empty() => write!(f, "pattern({:?})", text),
            Self::Pattern { text, flags } => write!(f, "pattern({:?}, {:?})", text, flags),
            Self::Like(keywords) => write!(f, "like({:?})", keywords),
            Self::MinCount(limit) => write!(f, "minCount({})", limit),
            Self::MaxCount(limit) => write!(f, "maxCount({})", limit),
            Self::In(values) => write!(f, "in({})", join(values.iter())),
            Self::All(values) => write!(f, "all({})", join(values.iter())),
            Self::Any(values) => write!(f, "any({})", join(values.iter())),
            Self::Field(field) => write!(f, "field({}, {})", field.edge, field.shape),
            Self::Virtual { field, derivation } => {
                let path = crate::edge::format_path(derivation.path());
                match derivation {
                    Derivation::Path(_) => write!(f, "virtual({}, {}, {})", field.edge, field.shape, path),
                    Derivation::Count(_) => write!(f, "virtual({}, {}, count({}))", field.edge, field.shape, path),
                }
            }
            Self::And(shapes) => write!(f, "and({})", join(shapes.iter())),
            Self::Or(shapes) => write!(f, "or({})", join(shapes.iter())),
            Self::When { test, pass, fail } => write!(f, "when({}, {}, {})", test, pass, fail),
        }
    }
}

fn join<T: fmt::Display>(items: impl Iterator<Item = T>) -> String {
    items.map(|item| item.to_string()).collect::<Vec<_>>().join(", ")
}

// ─────────────────────────────────────────────────────────────────────────────
// Constructors
// ─────────────────────────────────────────────────────────────────────────────

/// Conjunction; a single member is returned unwrapped
pub fn and(shapes: impl IntoIterator<Item = Shape>) -> Shape {
    let mut shapes: Vec<Shape> = shapes.into_iter().collect();
    if shapes.len() == 1 {
        shapes.remove(0)
    } else {
        Shape::And(Arc::from(shapes))
    }
}

/// Disjunction; a single member is returned unwrapped
pub fn or(shapes: impl IntoIterator<Item = Shape>) -> Shape {
    let mut shapes: Vec<Shape> = shapes.into_iter().collect();
    if shapes.len() == 1 {
        shapes.remove(0)
    } else {
        Shape::Or(Arc::from(shapes))
    }
}

pub fn when(test: Shape, pass: Shape, fail: Shape) -> Shape {
    Shape::When {
        test: Arc::new(test),
        pass: Arc::new(pass),
        fail: Arc::new(fail),
    }
}

/// Conditional conjunction, passing when `test` doesn't hold
pub fn then(test: Shape, shapes: impl IntoIterator<Item = Shape>) -> Shape {
    when(test, and(shapes), Shape::pass())
}

pub fn meta(key: impl Into<String>, value: Value) -> Shape {
    Shape::Meta {
        key: key.into(),
        value,
    }
}

pub fn alias(name: impl Into<String>) -> Shape {
    meta(ALIAS, Value::string(name))
}

pub fn label(text: impl Into<String>) -> Shape {
    meta(LABEL, Value::string(text))
}

pub fn guard<S: Into<String>>(axis: Axis, values: impl IntoIterator<Item = S>) -> Shape {
    Shape::Guard {
        axis,
        values: values.into_iter().map(Into::into).collect(),
    }
}

pub fn datatype(iri: impl Into<Iri>) -> Shape {
    Shape::Datatype(iri.into())
}

pub fn class(iri: impl Into<Iri>) -> Shape {
    Shape::Class(iri.into())
}

pub fn min_exclusive(value: Value) -> Shape {
    Shape::MinExclusive(value)
}

pub fn max_exclusive(value: Value) -> Shape {
    Shape::MaxExclusive(value)
}

pub fn min_inclusive(value: Value) -> Shape {
    Shape::MinInclusive(value)
}

pub fn max_inclusive(value: Value) -> Shape {
    Shape::MaxInclusive(value)
}

pub fn min_length(limit: usize) -> Shape {
    Shape::MinLength(limit)
}

pub fn max_length(limit: usize) -> Shape {
    Shape::MaxLength(limit)
}

pub fn pattern(text: impl Into<String>) -> Shape {
    pattern_with(text, "")
}

pub fn pattern_with(text: impl Into<String>, flags: impl Into<String>) -> Shape {
    Shape::Pattern {
        text: text.into(),
        flags: flags.into(),
    }
}

pub fn like(keywords: impl Into<String>) -> Shape {
    Shape::Like(keywords.into())
}

pub fn min_count(limit: usize) -> Shape {
    Shape::MinCount(limit)
}

pub fn max_count(limit: usize) -> Shape {
    Shape::MaxCount(limit)
}

pub fn in_set(values: impl IntoIterator<Item = Value>) -> Shape {
    Shape::In(values.into_iter().collect())
}

pub fn all(values: impl IntoIterator<Item = Value>) -> Shape {
    Shape::All(values.into_iter().collect())
}

pub fn any(values: impl IntoIterator<Item = Value>) -> Shape {
    Shape::Any(values.into_iter().collect())
}

pub fn field(edge: impl Into<Edge>, shapes: impl IntoIterator<Item = Shape>) -> Shape {
    Shape::Field(Field::new(edge, and(shapes)))
}

/// Virtual field whose values are reached through `path`
pub fn derived(
    edge: impl Into<Edge>,
    shapes: impl IntoIterator<Item = Shape>,
    path: Path,
) -> Shape {
    Shape::Virtual {
        field: Field::new(edge, and(shapes)),
        derivation: Derivation::Path(path),
    }
}

/// Virtual field holding the distinct count of the values reached through `path`
pub fn counted(
    edge: impl Into<Edge>,
    shapes: impl IntoIterator<Item = Shape>,
    path: Path,
) -> Shape {
    Shape::Virtual {
        field: Field::new(edge, and(shapes)),
        derivation: Derivation::Count(path),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shorthands
// ─────────────────────────────────────────────────────────────────────────────

pub fn required() -> Shape {
    and([min_count(1), max_count(1)])
}

pub fn optional() -> Shape {
    max_count(1)
}

pub fn repeatable() -> Shape {
    min_count(1)
}

pub fn multiple() -> Shape {
    Shape::pass()
}

/// The value set is exactly `values`
pub fn exactly(values: impl IntoIterator<Item = Value>) -> Shape {
    let values: BTreeSet<Value> = values.into_iter().collect();
    and([Shape::All(values.clone()), Shape::In(values)])
}

pub fn string() -> Shape {
    datatype(vocab::XSD_STRING)
}

pub fn integer() -> Shape {
    datatype(vocab::XSD_INTEGER)
}

pub fn resource() -> Shape {
    datatype(vocab::RESOURCE_TYPE)
}

pub fn role<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Shape {
    guard(Axis::Role, values)
}

pub fn task<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Shape {
    guard(Axis::Task, values)
}

pub fn view<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Shape {
    guard(Axis::View, values)
}

pub fn mode<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Shape {
    guard(Axis::Mode, values)
}

pub fn create() -> Shape {
    task([CREATE])
}

pub fn relate() -> Shape {
    task([RELATE])
}

pub fn update() -> Shape {
    task([UPDATE])
}

pub fn delete() -> Shape {
    task([DELETE])
}

/// Visible only while deleting
pub fn hidden() -> Shape {
    task([DELETE])
}

/// Managed by the server: never submitted by clients
pub fn server() -> Shape {
    task([RELATE, DELETE])
}

/// Set by clients on creation, read-only afterwards
pub fn client() -> Shape {
    task([CREATE, RELATE, DELETE])
}

pub fn digest() -> Shape {
    view([DIGEST])
}

pub fn detail() -> Shape {
    view([DETAIL])
}

pub fn convey() -> Shape {
    mode([CONVEY])
}

pub fn filter() -> Shape {
    mode([FILTER])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        assert!(Shape::pass().is_pass());
        assert!(Shape::fail().is_fail());
        assert!(and([]).is_pass());
        assert!(or([]).is_fail());
        assert_eq!(Shape::default(), Shape::pass());
    }

    #[test]
    fn test_singleton_unwrap() {
        assert_eq!(and([min_count(1)]), min_count(1));
        assert_eq!(or([max_count(2)]), max_count(2));
        assert_eq!(field("urn:p", [string()]), Shape::Field(Field::new("urn:p", string())));
    }

    #[test]
    fn test_structural_equality() {
        let a = field("urn:p", [required(), string()]);
        let b = field("urn:p", [required(), string()]);
        assert_eq!(a, b);
        assert_ne!(a, field(Edge::inverse("urn:p"), [required(), string()]));
    }

    #[test]
    fn test_depth_and_guards() {
        let shape = and([field("urn:p", [field("urn:q", [string()])]), min_count(1)]);
        assert_eq!(shape.depth(), 4);
        assert!(!shape.is_guarded());
        assert!(then(create(), [shape]).is_guarded());
    }

    #[test]
    fn test_json_round_trip() {
        let shape = and([
            class("urn:Employee"),
            field("urn:title", [required(), string(), pattern_with("^[A-Z]", "i")]),
            then(role(["manager"]), [field("urn:salary", [integer()])]),
        ]);

        let json = serde_json::to_string(&shape).unwrap();
        let decoded: Shape = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, shape);
    }

    #[test]
    fn test_display() {
        let shape = field("urn:p", [min_count(1), in_set([Value::integer(1)])]);
        assert_eq!(
            shape.to_string(),
            format!("field(<urn:p>, and(minCount(1), in(\"1\"^^<{}>)))", vocab::XSD_INTEGER)
        );
    }
}
