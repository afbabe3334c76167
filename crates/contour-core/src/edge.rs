//! Edges and paths

use crate::value::{Iri, Statement, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction an edge is followed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Subject to object
    #[default]
    Forward,
    /// Object to subject
    Inverse,
}

/// A (property, direction) pair used to traverse the graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub property: Iri,

    #[serde(default, skip_serializing_if = "is_forward")]
    pub direction: Direction,
}

fn is_forward(direction: &Direction) -> bool {
    *direction == Direction::Forward
}

impl Edge {
    pub fn forward(property: impl Into<Iri>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Forward,
        }
    }

    pub fn inverse(property: impl Into<Iri>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Inverse,
        }
    }

    pub fn is_inverse(&self) -> bool {
        self.direction == Direction::Inverse
    }

    /// The same property followed in the opposite direction
    pub fn reversed(&self) -> Self {
        Self {
            property: self.property.clone(),
            direction: match self.direction {
                Direction::Forward => Direction::Inverse,
                Direction::Inverse => Direction::Forward,
            },
        }
    }

    /// Statement asserting that `target` is reached from `source` along this edge
    pub fn statement(&self, source: &Value, target: &Value) -> Statement {
        match self.direction {
            Direction::Forward => Statement::new(source.clone(), self.property.clone(), target.clone()),
            Direction::Inverse => Statement::new(target.clone(), self.property.clone(), source.clone()),
        }
    }
}

impl From<&str> for Edge {
    fn from(property: &str) -> Self {
        Self::forward(property)
    }
}

impl From<Iri> for Edge {
    fn from(property: Iri) -> Self {
        Self::forward(property)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Forward => write!(f, "{}", self.property),
            Direction::Inverse => write!(f, "^{}", self.property),
        }
    }
}

/// A sequence of edges; empty paths denote the root value itself
pub type Path = Vec<Edge>;

/// Render a path as a SPARQL-like property path
pub fn format_path(path: &[Edge]) -> String {
    path.iter()
        .map(|edge| edge.to_string())
        .collect::<Vec<_>>()
        .join("/")
}
