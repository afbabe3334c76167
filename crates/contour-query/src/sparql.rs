//! SPARQL rendering of compiled queries

use crate::ast::{Aggregate, Compiled, Expr, Key, Kind, Path, Pattern, Select, Template, Term};
use contour_core::{Direction, Value};
use std::fmt::Write;

const INDENT: &str = "    ";

/// Render a compiled query as SPARQL text
pub fn render(compiled: &Compiled) -> String {
    let mut writer = Writer::default();

    match &compiled.kind {
        Kind::Edges { templates, .. } => writer.construct(templates, &compiled.select),
        Kind::Stats | Kind::Items => writer.select(&compiled.select),
    }

    writer.text
}

#[derive(Default)]
struct Writer {
    text: String,
    depth: usize,
}

impl Writer {
    fn line(&mut self, line: &str) {
        for _ in 0..self.depth {
            self.text.push_str(INDENT);
        }
        self.text.push_str(line);
        self.text.push('\n');
    }

    fn construct(&mut self, templates: &[Template], select: &Select) {
        self.line("construct {");
        self.depth += 1;
        for template in templates {
            let line = format!(
                "{} {} {} .",
                term(&template.subject),
                term(&template.predicate),
                term(&template.object)
            );
            self.line(&line);
        }
        self.depth -= 1;
        self.line("} where {");
        self.block(&select.patterns);
        self.line("}");
        self.modifiers(select);
    }

    fn select(&mut self, select: &Select) {
        let mut head = String::from("select");
        if select.distinct {
            head.push_str(" distinct");
        }
        if select.projection.is_empty() {
            head.push_str(" *");
        }
        for projection in &select.projection {
            match &projection.expr {
                None => {
                    let _ = write!(head, " {}", projection.var);
                }
                Some(expr) => {
                    let _ = write!(head, " ({} as {})", expr_text(expr), projection.var);
                }
            }
        }
        head.push_str(" where {");

        self.line(&head);
        self.block(&select.patterns);
        self.line("}");
        self.modifiers(select);
    }

    fn modifiers(&mut self, select: &Select) {
        if !select.group_by.is_empty() {
            let vars: Vec<String> = select.group_by.iter().map(ToString::to_string).collect();
            self.line(&format!("group by {}", vars.join(" ")));
        }
        if !select.having.is_empty() {
            let tests: Vec<String> = select.having.iter().map(expr_text).collect();
            self.line(&format!("having ({})", tests.join(" && ")));
        }
        if !select.order_by.is_empty() {
            let keys: Vec<String> = select.order_by.iter().map(key_text).collect();
            self.line(&format!("order by {}", keys.join(" ")));
        }
        if select.offset > 0 {
            self.line(&format!("offset {}", select.offset));
        }
        if select.limit > 0 {
            self.line(&format!("limit {}", select.limit));
        }
    }

    fn block(&mut self, patterns: &[Pattern]) {
        self.depth += 1;
        for pattern in patterns {
            self.pattern(pattern);
        }
        self.depth -= 1;
    }

    fn pattern(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Triple { subject, path, object } => {
                let line = format!("{} {} {} .", term(subject), path_text(path), term(object));
                self.line(&line);
            }
            Pattern::Group(patterns) => {
                self.line("{");
                self.block(patterns);
                self.line("}");
            }
            Pattern::Optional(patterns) => {
                self.line("optional {");
                self.block(patterns);
                self.line("}");
            }
            Pattern::Union(branches) => {
                for (index, branch) in branches.iter().enumerate() {
                    if index > 0 {
                        self.line("union");
                    }
                    match branch {
                        Pattern::Group(_) => self.pattern(branch),
                        _ => {
                            self.line("{");
                            self.block(std::slice::from_ref(branch));
                            self.line("}");
                        }
                    }
                }
            }
            Pattern::Filter(expr) => {
                let line = format!("filter ({})", expr_text(expr));
                self.line(&line);
            }
            Pattern::Values { var, values } => {
                let values: Vec<String> = values.iter().map(ToString::to_string).collect();
                let line = format!("values {} {{ {} }}", var, values.join(" "));
                self.line(&line);
            }
            Pattern::Bind { expr, var } => {
                let line = format!("bind ({} as {})", expr_text(expr), var);
                self.line(&line);
            }
            Pattern::Select(select) => {
                self.line("{");
                self.depth += 1;
                self.select(select);
                self.depth -= 1;
                self.line("}");
            }
        }
    }
}

fn term(term: &Term) -> String {
    match term {
        Term::Var(var) => var.to_string(),
        Term::Value(value) => value.to_string(),
    }
}

fn path_text(path: &Path) -> String {
    match path {
        Path::Step(edge) => match edge.direction {
            Direction::Forward => edge.property.to_string(),
            Direction::Inverse => format!("^{}", edge.property),
        },
        Path::Var(var) => var.to_string(),
        // zero-length path
        Path::Seq(paths) if paths.is_empty() => "(!<>)?".to_string(),
        Path::Seq(paths) => paths.iter().map(path_text).collect::<Vec<_>>().join("/"),
        Path::Star(path) => format!("({})*", path_text(path)),
    }
}

fn key_text(key: &Key) -> String {
    if key.descending {
        format!("desc({})", expr_text(&key.expr))
    } else {
        expr_text(&key.expr)
    }
}

fn unary(name: &str, expr: &Expr) -> String {
    format!("{}({})", name, expr_text(expr))
}

fn expr_text(expr: &Expr) -> String {
    match expr {
        Expr::Var(var) => var.to_string(),
        Expr::Const(value) => value.to_string(),
        Expr::Compare(op, left, right) => {
            format!("{} {} {}", expr_text(left), op.symbol(), expr_text(right))
        }
        Expr::And(exprs) if exprs.is_empty() => "true".to_string(),
        Expr::Or(exprs) if exprs.is_empty() => "false".to_string(),
        Expr::And(exprs) => junction(exprs, " && "),
        Expr::Or(exprs) => junction(exprs, " || "),
        Expr::Not(expr) => format!("!({})", expr_text(expr)),
        Expr::IsIri(expr) => unary("isIRI", expr),
        Expr::IsBlank(expr) => unary("isBlank", expr),
        Expr::IsLiteral(expr) => unary("isLiteral", expr),
        Expr::Datatype(expr) => unary("datatype", expr),
        Expr::Lang(expr) => unary("lang", expr),
        Expr::StrLen(expr) => unary("strlen", expr),
        Expr::Str(expr) => unary("str", expr),
        Expr::Regex { text, pattern, flags } if flags.is_empty() => {
            format!("regex({}, {})", expr_text(text), Value::string(pattern.as_str()))
        }
        Expr::Regex { text, pattern, flags } => format!(
            "regex({}, {}, {})",
            expr_text(text),
            Value::string(pattern.as_str()),
            Value::string(flags.as_str())
        ),
        Expr::In(expr, values) => {
            let values: Vec<String> = values.iter().map(ToString::to_string).collect();
            format!("{} in ({})", expr_text(expr), values.join(", "))
        }
        Expr::Bound(var) => format!("bound({})", var),
        Expr::If(test, pass, fail) => format!(
            "if({}, {}, {})",
            expr_text(test),
            expr_text(pass),
            expr_text(fail)
        ),
        Expr::Aggregate(aggregate) => match aggregate {
            Aggregate::Count { distinct, expr } => {
                let distinct = if *distinct { "distinct " } else { "" };
                match expr {
                    Some(expr) => format!("count({}{})", distinct, expr_text(expr)),
                    None => format!("count({}*)", distinct),
                }
            }
            Aggregate::Min(expr) => unary("min", expr),
            Aggregate::Max(expr) => unary("max", expr),
            Aggregate::Sample(expr) => unary("sample", expr),
        },
    }
}

fn junction(exprs: &[Expr], separator: &str) -> String {
    let parts: Vec<String> = exprs.iter().map(|expr| format!("({})", expr_text(expr))).collect();
    parts.join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Op, Projection, Var};
    use contour_core::Edge;

    #[test]
    fn test_render_select() {
        let (x, n) = (Var::new("x"), Var::new("n"));

        let select = Select {
            distinct: true,
            projection: vec![Projection::var(&x), Projection::expr(Expr::count(true, None), &n)],
            patterns: vec![
                Pattern::triple(
                    &x,
                    Path::Seq(vec![
                        Path::Step(Edge::forward("urn:type")),
                        Path::star(Path::Step(Edge::inverse("urn:sub"))),
                    ]),
                    Value::iri("urn:C"),
                ),
                Pattern::Filter(Expr::Regex {
                    text: Box::new(Expr::Str(Box::new(Expr::var(&x)))),
                    pattern: "^(a\"b)$".to_string(),
                    flags: "i".to_string(),
                }),
            ],
            group_by: vec![x.clone()],
            order_by: vec![Key::desc(Expr::var(&n))],
            limit: 10,
            ..Select::default()
        };

        let text = render(&Compiled {
            kind: Kind::Items,
            select,
        });

        assert!(text.starts_with("select distinct ?x (count(distinct *) as ?n) where {\n"));
        assert!(text.contains("    ?x <urn:type>/(^<urn:sub>)* <urn:C> .\n"));
        assert!(text.contains("filter (regex(str(?x), \"^(a\\\"b)$\", \"i\"))"));
        assert!(text.contains("group by ?x\norder by desc(?n)\nlimit 10\n"));
    }

    #[test]
    fn test_render_escapes_iri_breakout() {
        let x = Var::new("x");

        let text = render(&Compiled {
            kind: Kind::Items,
            select: Select {
                projection: vec![Projection::var(&x)],
                patterns: vec![
                    Pattern::step(&x, &Edge::forward("urn:p> ?y } ; drop all ; {"), Value::iri("urn:o>")),
                    Pattern::Filter(Expr::compare(
                        Op::Eq,
                        Expr::var(&x),
                        Expr::Const(Value::iri("urn:a\"|^`\\{}")),
                    )),
                ],
                ..Select::default()
            },
        });

        assert_eq!(text.matches('{').count(), 1);
        assert_eq!(text.matches('}').count(), 1);
        assert!(text.contains("<urn:p\\u003E\\u0020?y\\u0020\\u007D\\u0020;"));
        assert!(text.contains("<urn:o\\u003E> .\n"));
        assert!(text.contains("?x = <urn:a\\u0022\\u007C\\u005E\\u0060\\u005C\\u007B\\u007D>"));
    }

    #[test]
    fn test_render_construct() {
        let (root, value) = (Var::new("root"), Var::new("v0"));

        let text = render(&Compiled {
            kind: Kind::Edges {
                root: root.clone(),
                templates: vec![Template {
                    subject: (&root).into(),
                    predicate: Value::iri("urn:p").into(),
                    object: (&value).into(),
                }],
            },
            select: Select {
                patterns: vec![
                    Pattern::Optional(vec![Pattern::step(&root, &Edge::forward("urn:p"), &value)]),
                    Pattern::Filter(Expr::compare(Op::Ge, Expr::var(&value), Expr::Const(Value::integer(1)))),
                ],
                order_by: vec![Key::asc(Expr::var(&root))],
                ..Select::default()
            },
        });

        assert!(text.starts_with("construct {\n    ?root <urn:p> ?v0 .\n} where {\n"));
        assert!(text.contains("    optional {\n        ?root <urn:p> ?v0 .\n    }\n"));
        assert!(text.ends_with("}\norder by ?root\n"));
    }
}
