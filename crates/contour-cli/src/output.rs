//! Output formatting utilities

use std::fmt::Write;
use std::str::FromStr;

use contour_core::{Focus, Value};
use contour_query::Response;
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            _ => anyhow::bail!("Unknown output format '{}': expected json or table", s),
        }
    }
}

/// Pretty JSON rendering
pub fn to_json<T: Serialize>(data: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// Compact value rendering for tables: IRIs and blank nodes as is, literals by label
pub fn cell(value: &Value) -> String {
    match value {
        Value::Literal(literal) => literal.lexical.clone(),
        other => other.to_string(),
    }
}

/// Indented issue tree of a validation report
pub fn focus_table(focus: &Focus) -> String {
    let mut text = String::new();
    write_focus(&mut text, focus, 0);
    text
}

fn write_focus(text: &mut String, focus: &Focus, depth: usize) {
    let indent = "  ".repeat(depth);

    for issue in &focus.issues {
        let _ = writeln!(text, "{}[{}] {} ({})", indent, issue.level, issue.message, issue.shape);
    }

    for frame in focus.frames.values() {
        let _ = writeln!(text, "{}{}", indent, frame.value);

        for issue in &frame.issues {
            let _ = writeln!(text, "{}  [{}] {} ({})", indent, issue.level, issue.message, issue.shape);
        }

        for (edge, nested) in &frame.fields {
            let _ = writeln!(text, "{}  {}:", indent, edge);
            write_focus(text, nested, depth + 2);
        }
    }
}

/// Tabular rendering of query results
pub fn response_table(response: &Response) -> String {
    let mut text = String::new();

    match response {
        Response::Edges(report) => {
            for resource in &report.resources {
                let _ = writeln!(text, "{}", resource.value);
                for statement in &resource.statements {
                    let _ = writeln!(
                        text,
                        "  {} {} {}",
                        statement.subject, statement.predicate, statement.object
                    );
                }
            }
            let _ = writeln!(text, "({} resources)", report.resources.len());
        }

        Response::Stats(report) => {
            let _ = writeln!(text, "{:<48} {:>8}  {:<24} {:<24}", "TYPE", "COUNT", "MIN", "MAX");
            for stats in &report.types {
                let _ = writeln!(
                    text,
                    "{:<48} {:>8}  {:<24} {:<24}",
                    stats.datatype.to_string(),
                    stats.count,
                    stats.min.as_ref().map(cell).unwrap_or_default(),
                    stats.max.as_ref().map(cell).unwrap_or_default(),
                );
            }
            let _ = writeln!(
                text,
                "{:<48} {:>8}  {:<24} {:<24}",
                "(total)",
                report.count,
                report.min.as_ref().map(cell).unwrap_or_default(),
                report.max.as_ref().map(cell).unwrap_or_default(),
            );
        }

        Response::Items(report) => {
            let _ = writeln!(text, "{:>8}  {:<40} {}", "COUNT", "VALUE", "LABEL");
            for item in &report.items {
                let _ = writeln!(
                    text,
                    "{:>8}  {:<40} {}",
                    item.count,
                    cell(&item.value),
                    item.label.as_deref().unwrap_or("")
                );
            }
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use contour_core::Statement;
    use contour_query::{EdgesReport, Item, ItemsReport, Resource};

    #[test]
    fn test_parse_format() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert!("csv".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_items_table() {
        let response = Response::Items(ItemsReport {
            items: vec![Item {
                value: Value::string("Sales Rep"),
                count: 3,
                label: Some("Sales Rep".to_string()),
            }],
        });

        let text = response_table(&response);
        assert!(text.lines().nth(1).unwrap().trim_start().starts_with("3  Sales Rep"));
    }

    #[test]
    fn test_edges_table() {
        let e1 = Value::iri("urn:e1");
        let response = Response::Edges(EdgesReport {
            resources: vec![Resource {
                value: e1.clone(),
                statements: [Statement::new(e1, "urn:title", Value::string("President"))]
                    .into_iter()
                    .collect(),
            }],
        });

        let text = response_table(&response);
        assert!(text.contains("  <urn:e1> <urn:title> \"President\"\n"));
        assert!(text.ends_with("(1 resources)\n"));
    }
}
