//! Shape-driven query compiler
//!
//! A query shape is split in two by the `mode` axis: the filter side selects
//! root resources, the convey side describes what is returned for each of
//! them. The two sides are compiled into independent patterns joined only on
//! the root variable, so projected fields are never narrowed by filters on the
//! same edge.

use crate::ast::{Compiled, Expr, Key, Kind, Op, Path, Pattern, Projection, Select, Template, Var};
use crate::error::{unsupported, QueryResult};
use contour_core::inspect::{self, Declared};
use contour_core::shape::{CONVEY, FILTER};
use contour_core::{limits, optimize, pattern, vocab, Context, Derivation, Edge, Field, Order, Query, Shape, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Root resource variable
pub const ROOT: &str = "root";

// Aggregate result columns
pub const TYPE: &str = "type";
pub const VALUE: &str = "value";
pub const COUNT: &str = "count";
pub const MIN: &str = "min";
pub const MAX: &str = "max";
pub const LABEL: &str = "label";

/// Compiler tunables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerOptions {
    /// Maximum number of rows returned by items queries; 0 for no cap
    #[serde(default)]
    pub items: usize,

    /// Maximum number of value types reported by stats queries; 0 for no cap
    #[serde(default)]
    pub stats: usize,

    /// Caller context resolving role, task and view guards
    #[serde(default)]
    pub context: Context,
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(mut self, limit: usize) -> Self {
        self.items = limit;
        self
    }

    pub fn with_stats(mut self, limit: usize) -> Self {
        self.stats = limit;
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }
}

/// Compile a query with default options
pub fn compile(query: &Query) -> QueryResult<Compiled> {
    Compiler::new(CompilerOptions::default()).compile(query)
}

/// Query compiler
///
/// Compilers hold a variable counter and are meant for a single query.
pub struct Compiler {
    options: CompilerOptions,
    next: usize,
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self { options, next: 0 }
    }

    pub fn compile(mut self, query: &Query) -> QueryResult<Compiled> {
        let compiled = match query {
            Query::Edges {
                shape,
                orders,
                offset,
                limit,
            } => self.edges(shape, orders, *offset, *limit)?,
            Query::Stats { shape, path } => self.stats(shape, path)?,
            Query::Items { shape, path } => self.items(shape, path)?,
        };

        tracing::debug!(kind = compiled.kind.name(), vars = self.next, "Compiled query");

        Ok(compiled)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    fn edges(&mut self, shape: &Shape, orders: &[Order], offset: usize, limit: usize) -> QueryResult<Compiled> {
        limits::validate_page_limit(limit).map_err(contour_core::Error::from)?;

        let root = Var::new(ROOT);
        let paged = offset > 0 || limit > 0;

        let filter = self.filter_shape(shape)?;
        let convey = self.convey_shape(shape)?;

        let mut inner = Select {
            projection: vec![Projection::var(&root)],
            patterns: self.roots(&filter, &root, paged)?,
            group_by: vec![root.clone()],
            offset,
            limit,
            ..Select::default()
        };

        let mut keys = Vec::new();

        for order in orders {
            if order.path.is_empty() {
                keys.push(Key {
                    expr: Expr::var(&root),
                    descending: order.is_decreasing(),
                });
                continue;
            }

            let path = self.resolve(&convey, &order.path)?;
            let value = self.fresh();
            let key = self.fresh();

            inner.patterns.push(Pattern::Optional(vec![Pattern::triple(&root, path, &value)]));

            let aggregate = if order.is_decreasing() {
                Expr::max(Expr::var(&value))
            } else {
                Expr::min(Expr::var(&value))
            };

            inner.projection.push(Projection::expr(aggregate, &key));
            keys.push(Key {
                expr: Expr::var(&key),
                descending: order.is_decreasing(),
            });
        }

        keys.push(Key::asc(Expr::var(&root)));
        inner.order_by = keys.clone();

        let mut patterns = vec![Pattern::Select(Box::new(inner))];
        let mut templates = Vec::new();

        self.project(&convey, &root, &mut patterns, &mut templates)?;

        if templates.is_empty() {
            let property = self.fresh();
            let object = self.fresh();

            patterns.push(Pattern::Optional(vec![Pattern::triple(
                &root,
                Path::Var(property.clone()),
                &object,
            )]));

            templates.push(Template {
                subject: (&root).into(),
                predicate: property.into(),
                object: object.into(),
            });
        }

        Ok(Compiled {
            kind: Kind::Edges { root, templates },
            select: Select {
                patterns,
                order_by: keys,
                ..Select::default()
            },
        })
    }

    fn stats(&mut self, shape: &Shape, path: &[Edge]) -> QueryResult<Compiled> {
        let root = Var::new(ROOT);
        let value = Var::new(VALUE);
        let kind = Var::new(TYPE);

        let filter = self.filter_shape(shape)?;
        let convey = self.convey_shape(shape)?;

        let mut patterns = self.selection(&filter, &convey, path, &root, &value)?;

        patterns.push(Pattern::Bind {
            expr: Expr::If(
                Box::new(Expr::IsBlank(Box::new(Expr::var(&value)))),
                Box::new(Expr::Const(Value::iri(vocab::BNODE_TYPE))),
                Box::new(Expr::If(
                    Box::new(Expr::IsIri(Box::new(Expr::var(&value)))),
                    Box::new(Expr::Const(Value::iri(vocab::IRI_TYPE))),
                    Box::new(Expr::Datatype(Box::new(Expr::var(&value)))),
                )),
            ),
            var: kind.clone(),
        });

        let count = Expr::count(true, Some(Expr::var(&value)));

        Ok(Compiled {
            kind: Kind::Stats,
            select: Select {
                projection: vec![
                    Projection::var(&kind),
                    Projection::expr(count.clone(), &Var::new(COUNT)),
                    Projection::expr(Expr::min(Expr::var(&value)), &Var::new(MIN)),
                    Projection::expr(Expr::max(Expr::var(&value)), &Var::new(MAX)),
                ],
                patterns,
                group_by: vec![kind.clone()],
                having: vec![Expr::compare(Op::Gt, count, Expr::Const(Value::integer(0)))],
                order_by: vec![
                    Key::desc(Expr::var(&Var::new(COUNT))),
                    Key::asc(Expr::var(&kind)),
                ],
                limit: self.options.stats,
                ..Select::default()
            },
        })
    }

    fn items(&mut self, shape: &Shape, path: &[Edge]) -> QueryResult<Compiled> {
        let root = Var::new(ROOT);
        let value = Var::new(VALUE);
        let label = self.fresh();

        let filter = self.filter_shape(shape)?;
        let convey = self.convey_shape(shape)?;

        let mut patterns = self.selection(&filter, &convey, path, &root, &value)?;

        patterns.push(Pattern::Optional(vec![Pattern::step(
            &value,
            &Edge::forward(vocab::RDFS_LABEL),
            &label,
        )]));

        Ok(Compiled {
            kind: Kind::Items,
            select: Select {
                projection: vec![
                    Projection::var(&value),
                    Projection::expr(Expr::count(true, Some(Expr::var(&root))), &Var::new(COUNT)),
                    Projection::expr(Expr::sample(Expr::var(&label)), &Var::new(LABEL)),
                ],
                patterns,
                group_by: vec![value.clone()],
                order_by: vec![
                    Key::desc(Expr::var(&Var::new(COUNT))),
                    Key::asc(Expr::var(&value)),
                ],
                limit: self.options.items,
                ..Select::default()
            },
        })
    }

    /// Distinct roots joined with the values reached along `path`
    fn selection(
        &mut self,
        filter: &Shape,
        convey: &Shape,
        path: &[Edge],
        root: &Var,
        value: &Var,
    ) -> QueryResult<Vec<Pattern>> {
        let roots = Select {
            distinct: true,
            projection: vec![Projection::var(root)],
            patterns: self.roots(filter, root, false)?,
            ..Select::default()
        };

        let mut patterns = vec![Pattern::Select(Box::new(roots))];

        if path.is_empty() {
            patterns.push(Pattern::Bind {
                expr: Expr::var(root),
                var: value.clone(),
            });
        } else {
            let path = self.resolve(convey, path)?;
            patterns.push(Pattern::triple(root, path, value));
        }

        Ok(patterns)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Shapes
    // ─────────────────────────────────────────────────────────────────────────

    fn filter_shape(&self, shape: &Shape) -> QueryResult<Shape> {
        let context = self.options.context.clone().with_mode([FILTER]);
        let redacted = optimize(&context.redact(shape))?;
        Ok(optimize(&prune(&redacted))?)
    }

    fn convey_shape(&self, shape: &Shape) -> QueryResult<Shape> {
        let context = self.options.context.clone().with_mode([CONVEY]);
        Ok(optimize(&context.redact(shape))?)
    }

    /// Property path reaching the field at the end of `steps`, with virtual fields expanded
    fn resolve(&self, shape: &Shape, steps: &[Edge]) -> QueryResult<Path> {
        limits::validate_path_len(steps.len()).map_err(contour_core::Error::from)?;

        let mut current = shape.clone();
        let mut edges = Vec::new();

        for step in steps {
            let declared: Vec<Declared> = inspect::fields(&current)
                .into_iter()
                .filter(|declared| declared.field.edge == *step)
                .collect();

            if declared.is_empty() {
                return Err(contour_core::Error::UnknownStep(step.to_string()).into());
            }

            match declared.iter().find_map(|declared| declared.derivation.as_ref()) {
                None => edges.push(step.clone()),
                Some(Derivation::Path(path)) => edges.extend(path.iter().cloned()),
                Some(Derivation::Count(_)) => {
                    return Err(unsupported(format!("path through aggregate virtual field {}", step)));
                }
            }

            current = contour_core::shape::and(
                declared
                    .into_iter()
                    .map(|declared| declared.field.shape.as_ref().clone()),
            );
        }

        Ok(Path::steps(&edges))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Filters
    // ─────────────────────────────────────────────────────────────────────────

    /// Patterns binding `root` to every resource matching the filter shape
    fn roots(&mut self, filter: &Shape, root: &Var, paged: bool) -> QueryResult<Vec<Pattern>> {
        let property = self.fresh();
        let object = self.fresh();
        let mut patterns = Vec::new();

        // enumerated roots seed the scan
        if let Some(values) = inspect::any(filter).or_else(|| inspect::all(filter)) {
            patterns.push(Pattern::Values {
                var: root.clone(),
                values: values.into_iter().collect(),
            });
        }

        patterns.push(Pattern::triple(root, Path::Var(property), &object));
        self.filter(filter, root, None, paged, &mut patterns)?;
        Ok(patterns)
    }

    fn filter(
        &mut self,
        shape: &Shape,
        target: &Var,
        source: Option<(&Var, &Path)>,
        paged: bool,
        patterns: &mut Vec<Pattern>,
    ) -> QueryResult<()> {
        let value = || Expr::var(target);
        let text = || Expr::Str(Box::new(Expr::var(target)));

        match shape {
            Shape::Meta { .. } | Shape::MinCount(_) | Shape::MaxCount(_) => {}

            Shape::Datatype(datatype) => {
                if let Some(test) = datatype_test(datatype.as_str(), value()) {
                    patterns.push(Pattern::Filter(test));
                }
            }

            Shape::Guard { axis, .. } => {
                return Err(unsupported(format!("unresolved {} guard in filter", axis)));
            }

            Shape::Class(class) => patterns.push(Pattern::triple(
                target,
                Path::Seq(vec![
                    Path::Step(Edge::forward(vocab::RDF_TYPE)),
                    Path::star(Path::Step(Edge::forward(vocab::RDFS_SUBCLASS_OF))),
                ]),
                Value::Iri(class.clone()),
            )),

            Shape::MinExclusive(limit) => patterns.push(compare(Op::Gt, value(), limit)),
            Shape::MaxExclusive(limit) => patterns.push(compare(Op::Lt, value(), limit)),
            Shape::MinInclusive(limit) => patterns.push(compare(Op::Ge, value(), limit)),
            Shape::MaxInclusive(limit) => patterns.push(compare(Op::Le, value(), limit)),

            Shape::MinLength(limit) => patterns.push(compare(
                Op::Ge,
                Expr::StrLen(Box::new(text())),
                &Value::integer(limits::validate_length(*limit).map_err(contour_core::Error::from)?),
            )),
            Shape::MaxLength(limit) => patterns.push(compare(
                Op::Le,
                Expr::StrLen(Box::new(text())),
                &Value::integer(limits::validate_length(*limit).map_err(contour_core::Error::from)?),
            )),

            Shape::Pattern { text: expression, flags } => {
                let (expression, flags) = pattern::whole(expression, flags);
                patterns.push(Pattern::Filter(Expr::Regex {
                    text: Box::new(text()),
                    pattern: expression,
                    flags,
                }));
            }

            Shape::Like(keywords) => patterns.push(Pattern::Filter(Expr::Regex {
                text: Box::new(text()),
                pattern: pattern::like_expression(keywords),
                flags: pattern::LIKE_FLAGS.to_string(),
            })),

            Shape::In(values) => patterns.push(Pattern::Filter(Expr::In(
                Box::new(value()),
                values.iter().cloned().collect(),
            ))),

            Shape::Any(values) => patterns.push(Pattern::Values {
                var: target.clone(),
                values: values.iter().cloned().collect(),
            }),

            Shape::All(values) => match source {
                Some((source, path)) => {
                    for member in values {
                        patterns.push(Pattern::triple(source, path.clone(), member.clone()));
                    }
                }
                None => patterns.push(Pattern::Values {
                    var: target.clone(),
                    values: values.iter().cloned().collect(),
                }),
            },

            Shape::Field(field) => {
                self.nested(field, Path::Step(field.edge.clone()), target, paged, patterns)?;
            }

            Shape::Virtual {
                field,
                derivation: Derivation::Path(path),
            } => {
                self.nested(field, Path::steps(path), target, paged, patterns)?;
            }

            Shape::Virtual {
                field,
                derivation: Derivation::Count(path),
            } => {
                if paged {
                    return Err(unsupported(format!(
                        "paged filtering on aggregate virtual field {}",
                        field.edge
                    )));
                }

                // rebind the target inside the group so values reaching nothing count 0
                let binding = match source {
                    Some((_, reach)) => {
                        let origin = self.fresh();
                        Pattern::triple(&origin, reach.clone(), target)
                    }
                    None => {
                        let property = self.fresh();
                        let object = self.fresh();
                        Pattern::triple(target, Path::Var(property), &object)
                    }
                };

                let reached = self.fresh();
                let count = self.fresh();

                patterns.push(Pattern::Select(Box::new(Select {
                    projection: vec![
                        Projection::var(target),
                        Projection::expr(Expr::count(true, Some(Expr::var(&reached))), &count),
                    ],
                    patterns: vec![
                        binding,
                        Pattern::Optional(vec![Pattern::triple(target, Path::steps(path), &reached)]),
                    ],
                    group_by: vec![target.clone()],
                    ..Select::default()
                })));

                self.filter(&field.shape, &count, None, paged, patterns)?;
            }

            Shape::And(shapes) => {
                for shape in shapes.iter() {
                    self.filter(shape, target, source, paged, patterns)?;
                }
            }

            Shape::Or(shapes) if shapes.is_empty() => {
                patterns.push(Pattern::Filter(Expr::Const(Value::boolean(false))));
            }

            Shape::Or(shapes) => {
                let mut branches = Vec::with_capacity(shapes.len());
                for shape in shapes.iter() {
                    let mut branch = Vec::new();
                    self.filter(shape, target, source, paged, &mut branch)?;
                    branches.push(Pattern::Group(branch));
                }
                patterns.push(Pattern::Union(branches));
            }

            Shape::When { .. } => {
                return Err(unsupported("conditional shape in filter"));
            }
        }

        Ok(())
    }

    fn nested(
        &mut self,
        field: &Field,
        path: Path,
        source: &Var,
        paged: bool,
        patterns: &mut Vec<Pattern>,
    ) -> QueryResult<()> {
        let target = self.fresh();

        patterns.push(Pattern::triple(source, path.clone(), &target));
        self.filter(&field.shape, &target, Some((source, &path)), paged, patterns)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Projection
    // ─────────────────────────────────────────────────────────────────────────

    fn project(
        &mut self,
        shape: &Shape,
        anchor: &Var,
        patterns: &mut Vec<Pattern>,
        templates: &mut Vec<Template>,
    ) -> QueryResult<()> {
        for (field, derivation) in merged(inspect::fields(shape)) {
            let value = self.fresh();

            let mut block = match &derivation {
                None => vec![Pattern::step(anchor, &field.edge, &value)],
                Some(Derivation::Path(path)) => vec![Pattern::triple(anchor, Path::steps(path), &value)],
                Some(Derivation::Count(path)) => {
                    let reached = self.fresh();
                    vec![Pattern::Select(Box::new(Select {
                        projection: vec![
                            Projection::var(anchor),
                            Projection::expr(Expr::count(true, Some(Expr::var(&reached))), &value),
                        ],
                        patterns: vec![Pattern::triple(anchor, Path::steps(path), &reached)],
                        group_by: vec![anchor.clone()],
                        ..Select::default()
                    }))]
                }
            };

            templates.push(if field.edge.is_inverse() {
                Template {
                    subject: (&value).into(),
                    predicate: Value::Iri(field.edge.property.clone()).into(),
                    object: anchor.into(),
                }
            } else {
                Template {
                    subject: anchor.into(),
                    predicate: Value::Iri(field.edge.property.clone()).into(),
                    object: (&value).into(),
                }
            });

            if !matches!(derivation, Some(Derivation::Count(_))) {
                self.project(&field.shape, &value, &mut block, templates)?;
            }

            patterns.push(Pattern::Optional(block));
        }

        Ok(())
    }

    fn fresh(&mut self) -> Var {
        let var = Var::new(format!("v{}", self.next));
        self.next += 1;
        var
    }
}

/// Test on the term kind or datatype of `value`; `None` when every value qualifies
fn datatype_test(datatype: &str, value: Expr) -> Option<Expr> {
    let boxed = || Box::new(value.clone());

    match datatype {
        vocab::VALUE_TYPE => None,
        vocab::RESOURCE_TYPE => Some(Expr::Or(vec![Expr::IsBlank(boxed()), Expr::IsIri(boxed())])),
        vocab::BNODE_TYPE => Some(Expr::IsBlank(boxed())),
        vocab::IRI_TYPE => Some(Expr::IsIri(boxed())),
        vocab::LITERAL_TYPE => Some(Expr::IsLiteral(boxed())),
        vocab::RDF_LANG_STRING => Some(Expr::compare(
            Op::Ne,
            Expr::Lang(boxed()),
            Expr::Const(Value::string("")),
        )),
        _ => Some(Expr::compare(
            Op::Eq,
            Expr::Datatype(boxed()),
            Expr::Const(Value::iri(datatype)),
        )),
    }
}

fn compare(op: Op, value: Expr, limit: &Value) -> Pattern {
    Pattern::Filter(Expr::compare(op, value, Expr::Const(limit.clone())))
}

/// Fields grouped by edge in first-declaration order, nested shapes combined in conjunction
fn merged(declared: Vec<Declared>) -> Vec<(Field, Option<Derivation>)> {
    let mut fields: Vec<(Field, Option<Derivation>)> = Vec::new();

    for Declared { field, derivation } in declared {
        match fields.iter_mut().find(|(existing, _)| existing.edge == field.edge) {
            Some((existing, existing_derivation)) => {
                existing.shape = Arc::new(contour_core::shape::and([
                    existing.shape.as_ref().clone(),
                    field.shape.as_ref().clone(),
                ]));
                if existing_derivation.is_none() {
                    *existing_derivation = derivation;
                }
            }
            None => fields.push((field, derivation)),
        }
    }

    fields
}

/// Drop constraints that don't select resources: annotations and cardinalities
///
/// Fields left with nothing to check are dropped as well.
pub fn prune(shape: &Shape) -> Shape {
    match shape {
        Shape::Meta { .. } | Shape::MinCount(_) | Shape::MaxCount(_) => Shape::pass(),

        Shape::Field(field) => match prune_field(field) {
            Some(field) => Shape::Field(field),
            None => Shape::pass(),
        },

        Shape::Virtual { field, derivation } => match prune_field(field) {
            Some(field) => Shape::Virtual {
                field,
                derivation: derivation.clone(),
            },
            None => Shape::pass(),
        },

        Shape::And(shapes) => Shape::And(shapes.iter().map(prune).collect::<Vec<_>>().into()),
        Shape::Or(shapes) => Shape::Or(shapes.iter().map(prune).collect::<Vec<_>>().into()),

        Shape::When { test, pass, fail } => Shape::When {
            test: Arc::new(prune(test)),
            pass: Arc::new(prune(pass)),
            fail: Arc::new(prune(fail)),
        },

        _ => shape.clone(),
    }
}

fn prune_field(field: &Field) -> Option<Field> {
    let nested = prune(&field.shape);
    let nested = optimize(&nested).unwrap_or(nested);

    if nested.is_pass() {
        None
    } else {
        Some(Field {
            edge: field.edge.clone(),
            shape: Arc::new(nested),
        })
    }
}
