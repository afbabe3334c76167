//! In-process evaluation of compiled queries over a [`Graph`]
//!
//! Groups are evaluated by extending each incoming solution in turn; filters
//! apply at the end of the group they appear in. Sub-selects are evaluated on
//! their own and joined with the enclosing solutions.

use crate::ast::{Aggregate, Expr, Key, Op, Path, Pattern, Select, Term, Var};
use contour_core::{pattern, Graph, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Variable bindings of a single solution
pub type Binding = BTreeMap<Var, Value>;

/// Query evaluator bound to a graph snapshot
pub struct Evaluator<'g, G: Graph + ?Sized> {
    graph: &'g G,
}

enum Scope<'a> {
    Row(&'a Binding),
    Group { key: &'a Binding, rows: &'a [Binding] },
}

impl<'a> Scope<'a> {
    fn get(&self, var: &Var) -> Option<&'a Value> {
        match *self {
            Self::Row(binding) => binding.get(var),
            Self::Group { key, .. } => key.get(var),
        }
    }
}

impl<'g, G: Graph + ?Sized> Evaluator<'g, G> {
    pub fn new(graph: &'g G) -> Self {
        Self { graph }
    }

    /// Solutions of a select query, in result order
    pub fn select(&self, select: &Select) -> Vec<Binding> {
        let solutions = self.group(&select.patterns, vec![Binding::new()]);

        let mut rows: Vec<(Binding, Vec<Option<Value>>)> = if select.is_aggregate() {
            self.aggregate(select, solutions)
        } else {
            solutions
                .iter()
                .map(|solution| {
                    let output = self.project(select, Scope::Row(solution), solution);
                    let mut context = solution.clone();
                    context.extend(output.clone());
                    let keys = self.keys(&select.order_by, Scope::Row(&context));
                    (output, keys)
                })
                .collect()
        };

        if !select.order_by.is_empty() {
            rows.sort_by(|(_, x), (_, y)| compare_keys(&select.order_by, x, y));
        }

        let mut outputs: Vec<Binding> = rows.into_iter().map(|(output, _)| output).collect();

        if select.distinct {
            let mut seen = BTreeSet::new();
            outputs.retain(|output| seen.insert(output.clone()));
        }

        let limit = if select.limit == 0 { usize::MAX } else { select.limit };

        outputs.into_iter().skip(select.offset).take(limit).collect()
    }

    fn aggregate(&self, select: &Select, solutions: Vec<Binding>) -> Vec<(Binding, Vec<Option<Value>>)> {
        let mut groups: BTreeMap<Vec<Option<Value>>, Vec<Binding>> = BTreeMap::new();

        if select.group_by.is_empty() {
            groups.insert(Vec::new(), solutions);
        } else {
            for solution in solutions {
                let key = select
                    .group_by
                    .iter()
                    .map(|var| solution.get(var).cloned())
                    .collect();
                groups.entry(key).or_default().push(solution);
            }
        }

        groups
            .into_iter()
            .filter_map(|(values, rows)| {
                let key: Binding = select
                    .group_by
                    .iter()
                    .zip(values)
                    .filter_map(|(var, value)| value.map(|value| (var.clone(), value)))
                    .collect();

                let scope = Scope::Group { key: &key, rows: &rows };

                if !select.having.iter().all(|test| self.test(test, &scope)) {
                    return None;
                }

                let output = self.project(select, scope, &key);

                let mut context = key.clone();
                context.extend(output.clone());
                let keys = self.keys(&select.order_by, Scope::Group { key: &context, rows: &rows });

                Some((output, keys))
            })
            .collect()
    }

    fn project(&self, select: &Select, scope: Scope<'_>, all: &Binding) -> Binding {
        if select.projection.is_empty() {
            return all.clone();
        }

        select
            .projection
            .iter()
            .filter_map(|projection| {
                let value = match &projection.expr {
                    None => scope.get(&projection.var).cloned(),
                    Some(expr) => self.expr(expr, &scope),
                };
                value.map(|value| (projection.var.clone(), value))
            })
            .collect()
    }

    fn keys(&self, keys: &[Key], scope: Scope<'_>) -> Vec<Option<Value>> {
        keys.iter().map(|key| self.expr(&key.expr, &scope)).collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Patterns
    // ─────────────────────────────────────────────────────────────────────────

    fn group(&self, patterns: &[Pattern], input: Vec<Binding>) -> Vec<Binding> {
        let mut solutions = input;
        let mut filters = Vec::new();

        for pattern in patterns {
            match pattern {
                Pattern::Filter(expr) => filters.push(expr),
                _ => solutions = self.pattern(pattern, solutions),
            }
        }

        solutions.retain(|solution| filters.iter().all(|expr| self.test(expr, &Scope::Row(solution))));
        solutions
    }

    fn pattern(&self, pattern: &Pattern, input: Vec<Binding>) -> Vec<Binding> {
        match pattern {
            Pattern::Triple { subject, path, object } => input
                .into_iter()
                .flat_map(|binding| self.triple(subject, path, object, binding))
                .collect(),

            Pattern::Group(patterns) => self.group(patterns, input),

            Pattern::Optional(patterns) => input
                .into_iter()
                .flat_map(|binding| {
                    let extended = self.group(patterns, vec![binding.clone()]);
                    if extended.is_empty() {
                        vec![binding]
                    } else {
                        extended
                    }
                })
                .collect(),

            Pattern::Union(branches) => input
                .into_iter()
                .flat_map(|binding| {
                    branches
                        .iter()
                        .flat_map(|branch| self.pattern(branch, vec![binding.clone()]))
                        .collect::<Vec<_>>()
                })
                .collect(),

            Pattern::Filter(expr) => input
                .into_iter()
                .filter(|binding| self.test(expr, &Scope::Row(binding)))
                .collect(),

            Pattern::Values { var, values } => input
                .into_iter()
                .flat_map(|binding| match binding.get(var).cloned() {
                    Some(bound) => {
                        if values.contains(&bound) {
                            vec![binding]
                        } else {
                            Vec::new()
                        }
                    }
                    None => values
                        .iter()
                        .map(|value| {
                            let mut extended = binding.clone();
                            extended.insert(var.clone(), value.clone());
                            extended
                        })
                        .collect(),
                })
                .collect(),

            Pattern::Bind { expr, var } => input
                .into_iter()
                .map(|mut binding| {
                    if let Some(value) = self.expr(expr, &Scope::Row(&binding)) {
                        binding.insert(var.clone(), value);
                    }
                    binding
                })
                .collect(),

            Pattern::Select(select) => {
                let results = self.select(select);
                input
                    .into_iter()
                    .flat_map(|binding| {
                        results
                            .iter()
                            .filter_map(|result| join(&binding, result))
                            .collect::<Vec<_>>()
                    })
                    .collect()
            }
        }
    }

    fn triple(&self, subject: &Term, path: &Path, object: &Term, binding: Binding) -> Vec<Binding> {
        let source = resolve(subject, &binding);
        let target = resolve(object, &binding);

        let pairs: Vec<(Option<Value>, Value, Value)> = match path {
            Path::Var(var) => match binding.get(var) {
                Some(Value::Iri(property)) => self
                    .graph
                    .matching(source.as_ref(), Some(property), target.as_ref())
                    .into_iter()
                    .map(|statement| (None, statement.subject, statement.object))
                    .collect(),
                Some(_) => Vec::new(),
                None => self
                    .graph
                    .matching(source.as_ref(), None, target.as_ref())
                    .into_iter()
                    .map(|statement| (Some(Value::Iri(statement.predicate)), statement.subject, statement.object))
                    .collect(),
            },
            _ => self
                .pairs(path, source.as_ref(), target.as_ref())
                .into_iter()
                .map(|(s, o)| (None, s, o))
                .collect(),
        };

        pairs
            .into_iter()
            .filter_map(|(property, s, o)| {
                let mut extended = binding.clone();
                if let (Path::Var(var), Some(property)) = (path, property) {
                    extended.insert(var.clone(), property);
                }
                bind(&mut extended, subject, s)?;
                bind(&mut extended, object, o)?;
                Some(extended)
            })
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Paths
    // ─────────────────────────────────────────────────────────────────────────

    fn pairs(&self, path: &Path, source: Option<&Value>, target: Option<&Value>) -> Vec<(Value, Value)> {
        match (source, target) {
            (Some(source), _) => self
                .reach(path, source)
                .into_iter()
                .filter(|reached| target.map_or(true, |target| reached == target))
                .map(|reached| (source.clone(), reached))
                .collect(),

            (None, Some(target)) => self
                .reach(&path.reversed(), target)
                .into_iter()
                .map(|reached| (reached, target.clone()))
                .collect(),

            (None, None) => match path {
                Path::Step(edge) => self
                    .graph
                    .matching(None, Some(&edge.property), None)
                    .into_iter()
                    .map(|statement| {
                        if edge.is_inverse() {
                            (statement.object, statement.subject)
                        } else {
                            (statement.subject, statement.object)
                        }
                    })
                    .collect(),
                _ => self
                    .nodes()
                    .into_iter()
                    .flat_map(|node| {
                        self.reach(path, &node)
                            .into_iter()
                            .map(move |reached| (node.clone(), reached))
                            .collect::<Vec<_>>()
                    })
                    .collect(),
            },
        }
    }

    /// Values reached from `source` along `path`
    fn reach(&self, path: &Path, source: &Value) -> BTreeSet<Value> {
        match path {
            Path::Step(edge) => self.graph.traverse(source, edge),

            Path::Var(_) => self
                .graph
                .matching(Some(source), None, None)
                .into_iter()
                .map(|statement| statement.object)
                .collect(),

            Path::Seq(paths) => paths.iter().fold([source.clone()].into_iter().collect(), |current, path| {
                current.iter().flat_map(|value| self.reach(path, value)).collect()
            }),

            Path::Star(path) => {
                let mut closure = BTreeSet::new();
                let mut pending = VecDeque::from([source.clone()]);

                while let Some(value) = pending.pop_front() {
                    if closure.insert(value.clone()) {
                        pending.extend(self.reach(path, &value));
                    }
                }

                closure
            }
        }
    }

    fn nodes(&self) -> BTreeSet<Value> {
        self.graph
            .statements()
            .into_iter()
            .flat_map(|statement| [statement.subject, statement.object])
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    fn test(&self, expr: &Expr, scope: &Scope<'_>) -> bool {
        self.expr(expr, scope).as_ref().is_some_and(truth)
    }

    fn expr(&self, expr: &Expr, scope: &Scope<'_>) -> Option<Value> {
        match expr {
            Expr::Var(var) => scope.get(var).cloned(),
            Expr::Const(value) => Some(value.clone()),

            Expr::Compare(op, left, right) => {
                let left = self.expr(left, scope)?;
                let right = self.expr(right, scope)?;
                compare(*op, &left, &right).map(Value::boolean)
            }

            Expr::And(exprs) => Some(Value::boolean(exprs.iter().all(|expr| self.test(expr, scope)))),
            Expr::Or(exprs) => Some(Value::boolean(exprs.iter().any(|expr| self.test(expr, scope)))),
            Expr::Not(expr) => self.expr(expr, scope).map(|value| Value::boolean(!truth(&value))),

            Expr::IsIri(expr) => self
                .expr(expr, scope)
                .map(|value| Value::boolean(matches!(value, Value::Iri(_)))),
            Expr::IsBlank(expr) => self
                .expr(expr, scope)
                .map(|value| Value::boolean(matches!(value, Value::Bnode(_)))),
            Expr::IsLiteral(expr) => self
                .expr(expr, scope)
                .map(|value| Value::boolean(matches!(value, Value::Literal(_)))),

            Expr::Datatype(expr) => match self.expr(expr, scope)? {
                Value::Literal(literal) => Some(Value::Iri(literal.datatype)),
                _ => None,
            },

            Expr::Lang(expr) => match self.expr(expr, scope)? {
                Value::Literal(literal) => Some(Value::string(literal.lang.unwrap_or_default())),
                _ => None,
            },

            Expr::StrLen(expr) => match self.expr(expr, scope)? {
                Value::Literal(literal) => Some(Value::integer(literal.lexical.chars().count() as i64)),
                _ => None,
            },

            Expr::Str(expr) => match self.expr(expr, scope)? {
                Value::Bnode(_) => None,
                value => Some(Value::string(value.lexical())),
            },

            Expr::Regex { text, pattern, flags } => {
                let text = self.expr(text, scope)?;
                let regex = match pattern::compile(pattern, flags) {
                    Ok(regex) => regex,
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping invalid regular expression");
                        return None;
                    }
                };
                Some(Value::boolean(regex.is_match(text.lexical())))
            }

            Expr::In(expr, values) => {
                let value = self.expr(expr, scope)?;
                Some(Value::boolean(
                    values
                        .iter()
                        .any(|member| compare(Op::Eq, &value, member) == Some(true)),
                ))
            }

            Expr::Bound(var) => Some(Value::boolean(scope.get(var).is_some())),

            Expr::If(test, pass, fail) => {
                if truth(&self.expr(test, scope)?) {
                    self.expr(pass, scope)
                } else {
                    self.expr(fail, scope)
                }
            }

            Expr::Aggregate(aggregate) => match scope {
                Scope::Group { rows, .. } => self.aggregate_value(aggregate, rows),
                Scope::Row(_) => None,
            },
        }
    }

    fn aggregate_value(&self, aggregate: &Aggregate, rows: &[Binding]) -> Option<Value> {
        let values = |expr: &Expr| -> Vec<Value> {
            rows.iter()
                .filter_map(|row| self.expr(expr, &Scope::Row(row)))
                .collect()
        };

        match aggregate {
            Aggregate::Count { distinct, expr } => {
                let count = match expr {
                    None if *distinct => rows.iter().collect::<BTreeSet<_>>().len(),
                    None => rows.len(),
                    Some(expr) if *distinct => values(expr).into_iter().collect::<BTreeSet<_>>().len(),
                    Some(expr) => values(expr).len(),
                };
                Some(Value::integer(count as i64))
            }
            Aggregate::Min(expr) => values(expr).into_iter().min(),
            Aggregate::Max(expr) => values(expr).into_iter().max(),
            Aggregate::Sample(expr) => values(expr).into_iter().next(),
        }
    }
}

fn resolve(term: &Term, binding: &Binding) -> Option<Value> {
    match term {
        Term::Value(value) => Some(value.clone()),
        Term::Var(var) => binding.get(var).cloned(),
    }
}

/// Bind `term` to `value`, failing on a conflicting constant or binding
fn bind(binding: &mut Binding, term: &Term, value: Value) -> Option<()> {
    match term {
        Term::Value(constant) => (*constant == value).then_some(()),
        Term::Var(var) => match binding.get(var) {
            Some(bound) => (*bound == value).then_some(()),
            None => {
                binding.insert(var.clone(), value);
                Some(())
            }
        },
    }
}

fn join(left: &Binding, right: &Binding) -> Option<Binding> {
    let mut joined = left.clone();
    for (var, value) in right {
        match joined.get(var) {
            Some(bound) if bound != value => return None,
            Some(_) => {}
            None => {
                joined.insert(var.clone(), value.clone());
            }
        }
    }
    Some(joined)
}

/// Effective boolean value
fn truth(value: &Value) -> bool {
    match value {
        Value::Literal(literal) => match literal.number() {
            Some(number) => number != 0.0 && !number.is_nan(),
            None if literal.datatype.as_str() == contour_core::vocab::XSD_BOOLEAN => {
                literal.lexical.trim() == "true" || literal.lexical.trim() == "1"
            }
            None => !literal.lexical.is_empty(),
        },
        _ => true,
    }
}

fn compare(op: Op, left: &Value, right: &Value) -> Option<bool> {
    let ordering = match left.compare(right) {
        Some(ordering) => ordering,
        None if left == right => Ordering::Equal,
        None => {
            return match op {
                Op::Eq => Some(false),
                Op::Ne => Some(true),
                _ => None,
            };
        }
    };

    Some(match op {
        Op::Eq => ordering == Ordering::Equal,
        Op::Ne => ordering != Ordering::Equal,
        Op::Lt => ordering == Ordering::Less,
        Op::Le => ordering != Ordering::Greater,
        Op::Gt => ordering == Ordering::Greater,
        Op::Ge => ordering != Ordering::Less,
    })
}

/// Unbound keys sort first; descending keys reverse the value order
fn compare_keys(keys: &[Key], x: &[Option<Value>], y: &[Option<Value>]) -> Ordering {
    keys.iter()
        .zip(x.iter().zip(y.iter()))
        .map(|(key, (x, y))| {
            let ordering = x.cmp(y);
            if key.descending {
                ordering.reverse()
            } else {
                ordering
            }
        })
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Projection;
    use contour_core::{Edge, Model, Statement};

    fn iri(name: &str) -> Value {
        Value::iri(format!("urn:{}", name))
    }

    fn model() -> Model {
        [
            Statement::new(iri("a"), "urn:knows", iri("b")),
            Statement::new(iri("b"), "urn:knows", iri("c")),
            Statement::new(iri("a"), "urn:age", Value::integer(30)),
            Statement::new(iri("b"), "urn:age", Value::integer(40)),
            Statement::new(iri("c"), "urn:age", Value::integer(40)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_star_path_includes_source() {
        let model = model();
        let evaluator = Evaluator::new(&model);
        let knows = Path::star(Path::Step(Edge::forward("urn:knows")));

        let reached = evaluator.reach(&knows, &iri("a"));
        assert_eq!(reached, [iri("a"), iri("b"), iri("c")].into_iter().collect());

        let backwards = evaluator.pairs(&knows, None, Some(&iri("c")));
        assert_eq!(backwards.len(), 3);
    }

    #[test]
    fn test_optional_and_filter() {
        let model = model();
        let (x, y, age) = (Var::new("x"), Var::new("y"), Var::new("age"));

        let select = Select {
            projection: vec![Projection::var(&x), Projection::var(&y)],
            patterns: vec![
                Pattern::step(&x, &Edge::forward("urn:age"), &age),
                Pattern::Filter(Expr::compare(Op::Ge, Expr::var(&age), Expr::Const(Value::integer(35)))),
                Pattern::Optional(vec![Pattern::step(&x, &Edge::forward("urn:knows"), &y)]),
            ],
            order_by: vec![Key::asc(Expr::var(&x))],
            ..Select::default()
        };

        let solutions = Evaluator::new(&model).select(&select);

        assert_eq!(solutions.len(), 2);
        assert_eq!(solutions[0].get(&x), Some(&iri("b")));
        assert_eq!(solutions[0].get(&y), Some(&iri("c")));
        assert_eq!(solutions[1].get(&x), Some(&iri("c")));
        assert_eq!(solutions[1].get(&y), None);
    }

    #[test]
    fn test_grouping_and_ordering() {
        let model = model();
        let (x, age, count) = (Var::new("x"), Var::new("age"), Var::new("count"));

        let select = Select {
            projection: vec![
                Projection::var(&age),
                Projection::expr(Expr::count(true, Some(Expr::var(&x))), &count),
            ],
            patterns: vec![Pattern::step(&x, &Edge::forward("urn:age"), &age)],
            group_by: vec![age.clone()],
            order_by: vec![Key::desc(Expr::var(&count)), Key::asc(Expr::var(&age))],
            ..Select::default()
        };

        let solutions = Evaluator::new(&model).select(&select);

        assert_eq!(solutions.len(), 2);
        assert_eq!(solutions[0].get(&age), Some(&Value::integer(40)));
        assert_eq!(solutions[0].get(&count), Some(&Value::integer(2)));
        assert_eq!(solutions[1].get(&count), Some(&Value::integer(1)));
    }

    #[test]
    fn test_empty_group_counts_zero() {
        let model = Model::new();
        let (x, count) = (Var::new("x"), Var::new("count"));

        let select = Select {
            projection: vec![Projection::expr(Expr::count(false, None), &count)],
            patterns: vec![Pattern::step(&x, &Edge::forward("urn:age"), Var::new("age"))],
            ..Select::default()
        };

        let expected: Binding = [(count, Value::integer(0))].into_iter().collect();
        assert_eq!(Evaluator::new(&model).select(&select), vec![expected]);
    }

    #[test]
    fn test_subselect_paging() {
        let model = model();
        let x = Var::new("x");

        let inner = Select {
            projection: vec![Projection::var(&x)],
            patterns: vec![Pattern::step(&x, &Edge::forward("urn:age"), Var::new("age"))],
            order_by: vec![Key::desc(Expr::var(&x))],
            offset: 1,
            limit: 1,
            ..Select::default()
        };

        let outer = Select {
            patterns: vec![Pattern::Select(Box::new(inner))],
            ..Select::default()
        };

        let solutions = Evaluator::new(&model).select(&outer);
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].get(&x), Some(&iri("b")));
    }

    #[test]
    fn test_variable_predicate() {
        let model = model();
        let (p, o) = (Var::new("p"), Var::new("o"));

        let solutions = Evaluator::new(&model).select(&Select {
            patterns: vec![Pattern::triple(iri("a"), Path::Var(p.clone()), &o)],
            ..Select::default()
        });

        assert_eq!(solutions.len(), 2);
        assert!(solutions
            .iter()
            .all(|solution| matches!(solution.get(&p), Some(Value::Iri(_)))));
    }
}
