//! Validation reports
//!
//! A [`Focus`] collects the issues raised against a value set and one [`Frame`]
//! per reached value; frames nest the reports of their fields by edge. Issues
//! and frames are kept in ordered sets, so two reports with the same content
//! compare equal regardless of how they were assembled.

use crate::edge::Edge;
use crate::shape::Shape;
use crate::value::{Statement, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A constraint violation or note
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Issue {
    pub level: Level,
    pub message: String,
    pub shape: Shape,
}

impl Issue {
    pub fn new(level: Level, message: impl Into<String>, shape: &Shape) -> Self {
        Self {
            level,
            message: message.into(),
            shape: shape.clone(),
        }
    }

    pub fn error(message: impl Into<String>, shape: &Shape) -> Self {
        Self::new(Level::Error, message, shape)
    }

    pub fn warning(message: impl Into<String>, shape: &Shape) -> Self {
        Self::new(Level::Warning, message, shape)
    }
}

/// Everything checked about one reached value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub value: Value,
    pub issues: BTreeSet<Issue>,
    pub fields: BTreeMap<Edge, Focus>,
}

impl Frame {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            issues: BTreeSet::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.issues.insert(issue);
        self
    }

    pub fn with_field(mut self, edge: Edge, focus: Focus) -> Self {
        let merged = match self.fields.remove(&edge) {
            Some(existing) => existing.merge(focus),
            None => focus,
        };
        self.fields.insert(edge, merged);
        self
    }

    /// Merge a frame for the same value
    fn absorb(&mut self, other: Frame) {
        self.issues.extend(other.issues);
        for (edge, focus) in other.fields {
            let merged = match self.fields.remove(&edge) {
                Some(existing) => existing.merge(focus),
                None => focus,
            };
            self.fields.insert(edge, merged);
        }
    }

    pub fn assess(&self, level: Level) -> bool {
        self.issues.iter().any(|issue| issue.level >= level)
            || self.fields.values().any(|focus| focus.assess(level))
    }

    pub fn prune(&self, level: Level) -> Option<Frame> {
        let issues: BTreeSet<Issue> = self
            .issues
            .iter()
            .filter(|issue| issue.level >= level)
            .cloned()
            .collect();

        let fields: BTreeMap<Edge, Focus> = self
            .fields
            .iter()
            .filter_map(|(edge, focus)| focus.prune(level).map(|pruned| (edge.clone(), pruned)))
            .collect();

        if issues.is_empty() && fields.is_empty() {
            None
        } else {
            Some(Frame {
                value: self.value.clone(),
                issues,
                fields,
            })
        }
    }
}

/// Validation report for a value set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Focus {
    pub issues: BTreeSet<Issue>,
    pub frames: BTreeMap<Value, Frame>,
}

impl Focus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(issue: Issue) -> Self {
        Self::new().with_issue(issue)
    }

    pub fn frame(frame: Frame) -> Self {
        Self::new().with_frame(frame)
    }

    pub fn frames(frames: impl IntoIterator<Item = Frame>) -> Self {
        frames.into_iter().fold(Self::new(), Self::with_frame)
    }

    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.issues.insert(issue);
        self
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        match self.frames.get_mut(&frame.value) {
            Some(existing) => existing.absorb(frame),
            None => {
                self.frames.insert(frame.value.clone(), frame);
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty() && self.frames.is_empty()
    }

    /// Union issues; merge frames for equal values, and their fields by edge
    pub fn merge(mut self, other: Focus) -> Focus {
        self.issues.extend(other.issues);
        other.frames.into_values().fold(self, Self::with_frame)
    }

    /// Merge a sequence of reports
    pub fn merged(reports: impl IntoIterator<Item = Focus>) -> Focus {
        reports.into_iter().fold(Self::new(), Self::merge)
    }

    /// Whether any issue, here or in nested frames, reaches `level`
    pub fn assess(&self, level: Level) -> bool {
        self.issues.iter().any(|issue| issue.level >= level)
            || self.frames.values().any(|frame| frame.assess(level))
    }

    /// Keep only issues at or above `level` and the frames leading to them
    pub fn prune(&self, level: Level) -> Option<Focus> {
        let issues: BTreeSet<Issue> = self
            .issues
            .iter()
            .filter(|issue| issue.level >= level)
            .cloned()
            .collect();

        let frames: BTreeMap<Value, Frame> = self
            .frames
            .iter()
            .filter_map(|(value, frame)| frame.prune(level).map(|pruned| (value.clone(), pruned)))
            .collect();

        if issues.is_empty() && frames.is_empty() {
            None
        } else {
            Some(Focus { issues, frames })
        }
    }

    /// Statements traversed while building this report
    ///
    /// Forward edges assert `(frame, property, target)`, inverse edges
    /// `(target, property, frame)`; statements whose subject would be a literal
    /// are skipped.
    pub fn outline(&self) -> BTreeSet<Statement> {
        let mut statements = BTreeSet::new();
        self.collect_outline(&mut statements);
        statements
    }

    fn collect_outline(&self, statements: &mut BTreeSet<Statement>) {
        for frame in self.frames.values() {
            for (edge, focus) in &frame.fields {
                for target in focus.frames.keys() {
                    let statement = edge.statement(&frame.value, target);
                    if statement.subject.is_resource() {
                        statements.insert(statement);
                    }
                }
                focus.collect_outline(statements);
            }
        }
    }

    /// JSON rendering for reports
    pub fn to_json(&self) -> serde_json::Value {
        let mut report = serde_json::Map::new();

        if !self.issues.is_empty() {
            report.insert("issues".to_string(), issues_json(&self.issues));
        }

        if !self.frames.is_empty() {
            let frames: Vec<serde_json::Value> = self
                .frames
                .values()
                .map(|frame| {
                    let mut entry = serde_json::Map::new();
                    entry.insert("value".to_string(), json!(frame.value.to_string()));
                    if !frame.issues.is_empty() {
                        entry.insert("issues".to_string(), issues_json(&frame.issues));
                    }
                    if !frame.fields.is_empty() {
                        let fields: serde_json::Map<String, serde_json::Value> = frame
                            .fields
                            .iter()
                            .map(|(edge, focus)| (edge.to_string(), focus.to_json()))
                            .collect();
                        entry.insert("fields".to_string(), serde_json::Value::Object(fields));
                    }
                    serde_json::Value::Object(entry)
                })
                .collect();
            report.insert("frames".to_string(), json!(frames));
        }

        serde_json::Value::Object(report)
    }
}

fn issues_json(issues: &BTreeSet<Issue>) -> serde_json::Value {
    json!(issues
        .iter()
        .map(|issue| json!({
            "level": issue.level,
            "message": issue.message,
            "shape": issue.shape.to_string(),
        }))
        .collect::<Vec<_>>())
}
