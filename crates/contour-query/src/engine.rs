//! Graph query engine - compiles queries and reassembles evaluation results

use crate::ast::{Compiled, Kind, Template, Term, Var};
use crate::compiler::{Compiler, CompilerOptions, COUNT, LABEL, MAX, MIN, TYPE, VALUE};
use crate::eval::{Binding, Evaluator};
use crate::sparql;
use crate::traits::{QueryEngine, Result};
use contour_core::{vocab, Graph, Query, Statement, Value};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

/// One resource of an edges query with its projected description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub value: Value,
    pub statements: BTreeSet<Statement>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EdgesReport {
    /// Resources in query order
    pub resources: Vec<Resource>,
}

/// Aggregates for the values of one type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeStats {
    pub datatype: Value,
    pub count: usize,
    pub min: Option<Value>,
    pub max: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    pub count: usize,
    pub min: Option<Value>,
    pub max: Option<Value>,
    /// Per-type aggregates, most frequent first
    pub types: Vec<TypeStats>,
}

/// A distinct value with the number of roots it was reached from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub value: Value,
    pub count: usize,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemsReport {
    /// Items, most frequent first
    pub items: Vec<Item>,
}

/// Query results
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Response {
    Edges(EdgesReport),
    Stats(StatsReport),
    Items(ItemsReport),
}

impl Response {
    /// Results as statements grouped by subject
    ///
    /// Aggregate results are nested under the reserved [`vocab::TERMS_ROOT`]
    /// pseudo-resource.
    pub fn describe(&self) -> Vec<(Value, BTreeSet<Statement>)> {
        match self {
            Self::Edges(report) => report
                .resources
                .iter()
                .map(|resource| (resource.value.clone(), resource.statements.clone()))
                .collect(),

            Self::Stats(report) => {
                let root = Value::iri(vocab::TERMS_ROOT);
                let mut statements = BTreeSet::new();

                aggregates(&mut statements, &root, report.count, &report.min, &report.max);

                for stats in &report.types {
                    statements.insert(Statement::new(root.clone(), vocab::TERMS_STATS, stats.datatype.clone()));
                    aggregates(&mut statements, &stats.datatype, stats.count, &stats.min, &stats.max);
                }

                vec![(root, statements)]
            }

            Self::Items(report) => {
                let root = Value::iri(vocab::TERMS_ROOT);
                let mut statements = BTreeSet::new();

                for (index, item) in report.items.iter().enumerate() {
                    let node = Value::bnode(format!("item{}", index));

                    statements.insert(Statement::new(root.clone(), vocab::TERMS_ITEMS, node.clone()));
                    statements.insert(Statement::new(node.clone(), vocab::TERMS_VALUE, item.value.clone()));
                    statements.insert(Statement::new(
                        node.clone(),
                        vocab::TERMS_COUNT,
                        Value::integer(item.count as i64),
                    ));

                    if let Some(label) = &item.label {
                        statements.insert(Statement::new(node, vocab::RDFS_LABEL, Value::string(label.as_str())));
                    }
                }

                vec![(root, statements)]
            }
        }
    }
}

fn aggregates(
    statements: &mut BTreeSet<Statement>,
    subject: &Value,
    count: usize,
    min: &Option<Value>,
    max: &Option<Value>,
) {
    statements.insert(Statement::new(subject.clone(), vocab::TERMS_COUNT, Value::integer(count as i64)));
    if let Some(min) = min {
        statements.insert(Statement::new(subject.clone(), vocab::TERMS_MIN, min.clone()));
    }
    if let Some(max) = max {
        statements.insert(Statement::new(subject.clone(), vocab::TERMS_MAX, max.clone()));
    }
}

/// Query engine evaluating compiled queries in process
#[derive(Debug, Clone, Default)]
pub struct GraphEngine {
    options: CompilerOptions,
}

impl GraphEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    fn edges(root: &Var, templates: &[Template], solutions: &[Binding]) -> EdgesReport {
        let mut order: Vec<Value> = Vec::new();
        let mut described: BTreeMap<Value, BTreeSet<Statement>> = BTreeMap::new();

        for solution in solutions {
            let Some(value) = solution.get(root) else {
                continue;
            };

            let statements = described.entry(value.clone()).or_insert_with(|| {
                order.push(value.clone());
                BTreeSet::new()
            });

            statements.extend(templates.iter().filter_map(|template| instantiate(template, solution)));
        }

        EdgesReport {
            resources: order
                .into_iter()
                .map(|value| {
                    let statements = described.remove(&value).unwrap_or_default();
                    Resource { value, statements }
                })
                .collect(),
        }
    }

    fn stats(solutions: &[Binding]) -> StatsReport {
        let types: Vec<TypeStats> = solutions
            .iter()
            .filter_map(|solution| {
                Some(TypeStats {
                    datatype: solution.get(&Var::new(TYPE))?.clone(),
                    count: count(solution),
                    min: solution.get(&Var::new(MIN)).cloned(),
                    max: solution.get(&Var::new(MAX)).cloned(),
                })
            })
            .collect();

        StatsReport {
            count: types.iter().map(|stats| stats.count).sum(),
            min: types.iter().filter_map(|stats| stats.min.clone()).min(),
            max: types.iter().filter_map(|stats| stats.max.clone()).max(),
            types,
        }
    }

    fn items(solutions: &[Binding]) -> ItemsReport {
        ItemsReport {
            items: solutions
                .iter()
                .filter_map(|solution| {
                    let value = solution.get(&Var::new(VALUE))?.clone();
                    let label = match solution.get(&Var::new(LABEL)) {
                        Some(label) => Some(label.lexical().to_string()),
                        None => value.as_literal().map(|literal| literal.lexical.clone()),
                    };
                    Some(Item {
                        count: count(solution),
                        value,
                        label,
                    })
                })
                .collect(),
        }
    }
}

fn count(solution: &Binding) -> usize {
    solution
        .get(&Var::new(COUNT))
        .and_then(Value::number)
        .map(|count| count as usize)
        .unwrap_or(0)
}

fn instantiate(template: &Template, solution: &Binding) -> Option<Statement> {
    let term = |term: &Term| -> Option<Value> {
        match term {
            Term::Var(var) => solution.get(var).cloned(),
            Term::Value(value) => Some(value.clone()),
        }
    };

    let subject = term(&template.subject)?;
    let predicate = term(&template.predicate)?.as_iri()?.clone();
    let object = term(&template.object)?;

    subject.is_resource().then(|| Statement::new(subject, predicate, object))
}

impl QueryEngine for GraphEngine {
    fn compile(&self, query: &Query) -> Result<Compiled> {
        Compiler::new(self.options.clone()).compile(query)
    }

    fn execute(&self, query: &Query, graph: &dyn Graph) -> Result<Response> {
        let compiled = self.compile(query)?;
        let start = Instant::now();

        let solutions = Evaluator::new(graph).select(&compiled.select);

        let response = match &compiled.kind {
            Kind::Edges { root, templates } => Response::Edges(Self::edges(root, templates, &solutions)),
            Kind::Stats => Response::Stats(Self::stats(&solutions)),
            Kind::Items => Response::Items(Self::items(&solutions)),
        };

        tracing::debug!(
            kind = compiled.kind.name(),
            solutions = solutions.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Executed query"
        );

        Ok(response)
    }

    fn explain(&self, query: &Query) -> Result<String> {
        Ok(sparql::render(&self.compile(query)?))
    }
}
