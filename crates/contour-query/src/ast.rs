//! Query fragment AST
//!
//! The compiler assembles these nodes; [`crate::sparql`] renders them as text
//! and [`crate::eval`] runs them against an in-process graph.

use contour_core::{Edge, Value};
use std::fmt;

/// Query variable
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(pub String);

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// Triple pattern position: variable or constant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Var(Var),
    Value(Value),
}

impl From<Var> for Term {
    fn from(var: Var) -> Self {
        Self::Var(var)
    }
}

impl From<&Var> for Term {
    fn from(var: &Var) -> Self {
        Self::Var(var.clone())
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Property path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Path {
    /// Single edge, possibly inverse
    Step(Edge),
    /// Variable predicate, bound to the matched property
    Var(Var),
    Seq(Vec<Path>),
    /// Zero or more repetitions
    Star(Box<Path>),
}

impl Path {
    /// Sequence of steps; a single step is returned unwrapped
    pub fn steps(edges: &[Edge]) -> Self {
        match edges {
            [edge] => Self::Step(edge.clone()),
            _ => Self::Seq(edges.iter().cloned().map(Self::Step).collect()),
        }
    }

    pub fn star(path: Path) -> Self {
        Self::Star(Box::new(path))
    }

    /// The same path walked backwards
    pub fn reversed(&self) -> Self {
        match self {
            Self::Step(edge) => Self::Step(edge.reversed()),
            Self::Var(var) => Self::Var(var.clone()),
            Self::Seq(paths) => Self::Seq(paths.iter().rev().map(Path::reversed).collect()),
            Self::Star(path) => Self::star(path.reversed()),
        }
    }

    /// Check whether the path matches the empty sequence only
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Seq(paths) if paths.iter().all(Path::is_empty))
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// Set function over a solution group
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    /// Number of solutions, or of bound values of the expression
    Count { distinct: bool, expr: Option<Box<Expr>> },
    Min(Box<Expr>),
    Max(Box<Expr>),
    Sample(Box<Expr>),
}

/// Filter and projection expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Var(Var),
    Const(Value),
    Compare(Op, Box<Expr>, Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    IsIri(Box<Expr>),
    IsBlank(Box<Expr>),
    IsLiteral(Box<Expr>),
    Datatype(Box<Expr>),
    Lang(Box<Expr>),
    StrLen(Box<Expr>),
    Str(Box<Expr>),
    Regex { text: Box<Expr>, pattern: String, flags: String },
    In(Box<Expr>, Vec<Value>),
    Bound(Var),
    If(Box<Expr>, Box<Expr>, Box<Expr>),
    Aggregate(Aggregate),
}

impl Expr {
    pub fn var(var: &Var) -> Self {
        Self::Var(var.clone())
    }

    pub fn compare(op: Op, left: Expr, right: Expr) -> Self {
        Self::Compare(op, Box::new(left), Box::new(right))
    }

    pub fn count(distinct: bool, expr: Option<Expr>) -> Self {
        Self::Aggregate(Aggregate::Count {
            distinct,
            expr: expr.map(Box::new),
        })
    }

    pub fn min(expr: Expr) -> Self {
        Self::Aggregate(Aggregate::Min(Box::new(expr)))
    }

    pub fn max(expr: Expr) -> Self {
        Self::Aggregate(Aggregate::Max(Box::new(expr)))
    }

    pub fn sample(expr: Expr) -> Self {
        Self::Aggregate(Aggregate::Sample(Box::new(expr)))
    }

    pub fn is_aggregate(&self) -> bool {
        match self {
            Self::Aggregate(_) => true,
            Self::Var(_) | Self::Const(_) | Self::Bound(_) => false,
            Self::Compare(_, left, right) => left.is_aggregate() || right.is_aggregate(),
            Self::And(exprs) | Self::Or(exprs) => exprs.iter().any(Expr::is_aggregate),
            Self::Not(expr)
            | Self::IsIri(expr)
            | Self::IsBlank(expr)
            | Self::IsLiteral(expr)
            | Self::Datatype(expr)
            | Self::Lang(expr)
            | Self::StrLen(expr)
            | Self::Str(expr)
            | Self::In(expr, _) => expr.is_aggregate(),
            Self::Regex { text, .. } => text.is_aggregate(),
            Self::If(test, pass, fail) => test.is_aggregate() || pass.is_aggregate() || fail.is_aggregate(),
        }
    }
}

/// Graph pattern
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Triple { subject: Term, path: Path, object: Term },
    Group(Vec<Pattern>),
    Optional(Vec<Pattern>),
    Union(Vec<Pattern>),
    Filter(Expr),
    Values { var: Var, values: Vec<Value> },
    Bind { expr: Expr, var: Var },
    Select(Box<Select>),
}

impl Pattern {
    pub fn triple(subject: impl Into<Term>, path: Path, object: impl Into<Term>) -> Self {
        Self::Triple {
            subject: subject.into(),
            path,
            object: object.into(),
        }
    }

    pub fn step(subject: impl Into<Term>, edge: &Edge, object: impl Into<Term>) -> Self {
        Self::triple(subject, Path::Step(edge.clone()), object)
    }
}

/// Projected column, optionally computed
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub var: Var,
    pub expr: Option<Expr>,
}

impl Projection {
    pub fn var(var: &Var) -> Self {
        Self {
            var: var.clone(),
            expr: None,
        }
    }

    pub fn expr(expr: Expr, var: &Var) -> Self {
        Self {
            var: var.clone(),
            expr: Some(expr),
        }
    }
}

/// Solution ordering key
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    pub expr: Expr,
    pub descending: bool,
}

impl Key {
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            descending: false,
        }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            descending: true,
        }
    }
}

/// Select query; an empty projection selects every variable
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    pub distinct: bool,
    pub projection: Vec<Projection>,
    pub patterns: Vec<Pattern>,
    pub group_by: Vec<Var>,
    pub having: Vec<Expr>,
    pub order_by: Vec<Key>,
    pub offset: usize,
    /// 0 for no limit
    pub limit: usize,
}

impl Select {
    pub fn is_aggregate(&self) -> bool {
        !self.group_by.is_empty()
            || !self.having.is_empty()
            || self
                .projection
                .iter()
                .any(|projection| projection.expr.as_ref().is_some_and(Expr::is_aggregate))
    }
}

/// Statement template instantiated for every solution of an edges query
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

/// What the solutions of a compiled query stand for
#[derive(Debug, Clone, PartialEq)]
pub enum Kind {
    /// Bindings of `root` plus the statements produced by the templates
    Edges { root: Var, templates: Vec<Template> },
    /// One row per value type with `type`, `count`, `min` and `max` columns
    Stats,
    /// One row per distinct value with `value`, `count` and `label` columns
    Items,
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Edges { .. } => "edges",
            Self::Stats => "stats",
            Self::Items => "items",
        }
    }
}

/// Compiled query
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub kind: Kind,
    pub select: Select,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reversed_path() {
        let path = Path::Seq(vec![
            Path::Step(Edge::forward("urn:a")),
            Path::star(Path::Step(Edge::inverse("urn:b"))),
        ]);

        assert_eq!(
            path.reversed(),
            Path::Seq(vec![
                Path::star(Path::Step(Edge::forward("urn:b"))),
                Path::Step(Edge::inverse("urn:a")),
            ])
        );
    }

    #[test]
    fn test_aggregate_detection() {
        let var = Var::new("x");

        assert!(Expr::compare(Op::Gt, Expr::count(true, Some(Expr::var(&var))), Expr::Const(Value::integer(0))).is_aggregate());
        assert!(!Expr::compare(Op::Gt, Expr::var(&var), Expr::Const(Value::integer(0))).is_aggregate());

        let select = Select {
            projection: vec![Projection::expr(Expr::min(Expr::var(&var)), &Var::new("m"))],
            ..Select::default()
        };
        assert!(select.is_aggregate());
        assert!(!Select::default().is_aggregate());
    }

    #[test]
    fn test_single_step_path() {
        assert_eq!(Path::steps(&[Edge::forward("urn:a")]), Path::Step(Edge::forward("urn:a")));
        assert!(Path::steps(&[]).is_empty());
    }
}
