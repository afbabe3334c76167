//! Graph access trait and in-memory model

use crate::edge::{Direction, Edge};
use crate::value::{Iri, Statement, Value};
use crate::vocab;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Read access to a consistent graph snapshot
///
/// Implementors only provide statement matching; traversal helpers are
/// derived from it.
pub trait Graph: Send + Sync {
    /// Statements matching the given subject, predicate and object; `None` matches anything
    fn matching(
        &self,
        subject: Option<&Value>,
        predicate: Option<&Iri>,
        object: Option<&Value>,
    ) -> Vec<Statement>;

    // ─────────────────────────────────────────────────────────────────────────
    // Provided
    // ─────────────────────────────────────────────────────────────────────────

    /// Values reached from `value` along `edge`
    fn traverse(&self, value: &Value, edge: &Edge) -> BTreeSet<Value> {
        match edge.direction {
            Direction::Forward => {
                if !value.is_resource() {
                    return BTreeSet::new();
                }
                self.matching(Some(value), Some(&edge.property), None)
                    .into_iter()
                    .map(|statement| statement.object)
                    .collect()
            }
            Direction::Inverse => self
                .matching(None, Some(&edge.property), Some(value))
                .into_iter()
                .map(|statement| statement.subject)
                .collect(),
        }
    }

    /// Values reached from every member of `values` along `path`
    fn follow(&self, values: &BTreeSet<Value>, path: &[Edge]) -> BTreeSet<Value> {
        path.iter().fold(values.clone(), |current, edge| {
            current
                .iter()
                .flat_map(|value| self.traverse(value, edge))
                .collect()
        })
    }

    /// Declared types of `value`, closed over `rdfs:subClassOf`
    fn types(&self, value: &Value) -> BTreeSet<Value> {
        let mut closure = BTreeSet::new();
        let mut pending: VecDeque<Value> = self
            .traverse(value, &Edge::forward(vocab::RDF_TYPE))
            .into_iter()
            .collect();

        let subclass = Edge::forward(vocab::RDFS_SUBCLASS_OF);

        while let Some(class) = pending.pop_front() {
            if closure.insert(class.clone()) {
                pending.extend(self.traverse(&class, &subclass));
            }
        }

        closure
    }

    fn statements(&self) -> Vec<Statement> {
        self.matching(None, None, None)
    }
}

/// In-memory statement set indexed by subject and object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Statement>", into = "Vec<Statement>")]
pub struct Model {
    statements: BTreeSet<Statement>,
    by_subject: BTreeMap<Value, BTreeSet<Statement>>,
    by_object: BTreeMap<Value, BTreeSet<Statement>>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, statement: Statement) -> Self {
        self.insert(statement);
        self
    }

    pub fn insert(&mut self, statement: Statement) -> bool {
        if !self.statements.insert(statement.clone()) {
            return false;
        }
        self.by_subject
            .entry(statement.subject.clone())
            .or_default()
            .insert(statement.clone());
        self.by_object
            .entry(statement.object.clone())
            .or_default()
            .insert(statement);
        true
    }

    pub fn remove(&mut self, statement: &Statement) -> bool {
        if !self.statements.remove(statement) {
            return false;
        }
        if let Some(set) = self.by_subject.get_mut(&statement.subject) {
            set.remove(statement);
            if set.is_empty() {
                self.by_subject.remove(&statement.subject);
            }
        }
        if let Some(set) = self.by_object.get_mut(&statement.object) {
            set.remove(statement);
            if set.is_empty() {
                self.by_object.remove(&statement.object);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn contains(&self, statement: &Statement) -> bool {
        self.statements.contains(statement)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Statement> {
        self.statements.iter()
    }

    /// Distinct subjects
    pub fn subjects(&self) -> impl Iterator<Item = &Value> {
        self.by_subject.keys()
    }
}

impl Graph for Model {
    fn matching(
        &self,
        subject: Option<&Value>,
        predicate: Option<&Iri>,
        object: Option<&Value>,
    ) -> Vec<Statement> {
        let candidates: Box<dyn Iterator<Item = &Statement>> = match (subject, object) {
            (Some(subject), _) => match self.by_subject.get(subject) {
                Some(set) => Box::new(set.iter()),
                None => return Vec::new(),
            },
            (None, Some(object)) => match self.by_object.get(object) {
                Some(set) => Box::new(set.iter()),
                None => return Vec::new(),
            },
            (None, None) => Box::new(self.statements.iter()),
        };

        candidates
            .filter(|statement| predicate.map_or(true, |p| statement.predicate == *p))
            .filter(|statement| object.map_or(true, |o| statement.object == *o))
            .cloned()
            .collect()
    }
}

impl FromIterator<Statement> for Model {
    fn from_iter<T: IntoIterator<Item = Statement>>(iter: T) -> Self {
        let mut model = Model::new();
        for statement in iter {
            model.insert(statement);
        }
        model
    }
}

impl Extend<Statement> for Model {
    fn extend<T: IntoIterator<Item = Statement>>(&mut self, iter: T) {
        for statement in iter {
            self.insert(statement);
        }
    }
}

impl From<Vec<Statement>> for Model {
    fn from(statements: Vec<Statement>) -> Self {
        statements.into_iter().collect()
    }
}

impl From<Model> for Vec<Statement> {
    fn from(model: Model) -> Self {
        model.statements.into_iter().collect()
    }
}
