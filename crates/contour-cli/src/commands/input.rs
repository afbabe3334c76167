//! Shared command inputs: shape files, data documents, paths and guard context

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context as _;
use clap::Args;

use crate::AppContext;
use contour_core::{limits, Context, Edge, Model, Order, Shape, Value};
use contour_storage::{Diagnostics, Ingest, StorageBackend};

/// Caller context resolving guards
#[derive(Args, Debug, Clone, Default)]
pub struct ContextArgs {
    /// Roles of the caller (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub role: Vec<String>,

    /// Task being performed: create, relate, update, delete
    #[arg(long, value_delimiter = ',')]
    pub task: Vec<String>,

    /// View requested: digest, detail
    #[arg(long, value_delimiter = ',')]
    pub view: Vec<String>,
}

impl ContextArgs {
    /// Context with the axes given on the command line; others stay unresolved
    pub fn context(&self) -> Context {
        let mut context = Context::new();
        if !self.role.is_empty() {
            context = context.with_role(self.role.iter().cloned());
        }
        if !self.task.is_empty() {
            context = context.with_task(self.task.iter().cloned());
        }
        if !self.view.is_empty() {
            context = context.with_view(self.view.iter().cloned());
        }
        context
    }
}

/// Read a JSON shape file
pub fn read_shape(path: &Path) -> anyhow::Result<Shape> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let shape: Shape = serde_json::from_str(&text).with_context(|| format!("parsing shape {}", path.display()))?;

    limits::validate_shape_depth(shape.depth())?;
    Ok(shape)
}

/// Parse a whitespace separated path; `^` marks inverse steps
pub fn parse_path(text: &str) -> anyhow::Result<Vec<Edge>> {
    text.split_whitespace()
        .map(|step| match step.strip_prefix('^') {
            Some("") => anyhow::bail!("Empty inverse step in path '{}'", text),
            Some(property) => Ok(Edge::inverse(property)),
            None => Ok(Edge::forward(step)),
        })
        .collect()
}

/// Parse a sort criterion: a path, prefixed with `-` for decreasing order
pub fn parse_order(text: &str) -> anyhow::Result<Order> {
    match text.strip_prefix('-') {
        Some(path) => Ok(Order::decreasing(parse_path(path)?)),
        None => Ok(Order::increasing(parse_path(text.strip_prefix('+').unwrap_or(text))?)),
    }
}

/// Parse resource references: IRIs, or `_:label` blank nodes
pub fn parse_resources(texts: &[String]) -> BTreeSet<Value> {
    texts
        .iter()
        .map(|text| match text.strip_prefix("_:") {
            Some(label) => Value::bnode(label),
            None => Value::iri(text.as_str()),
        })
        .collect()
}

/// Parse a data document, reporting diagnostics
pub fn read_document(path: &Path) -> anyhow::Result<(Model, Diagnostics)> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let Ingest { model, diagnostics, .. } = Ingest::parse(&text);

    for warning in &diagnostics.warnings {
        tracing::warn!(file = %path.display(), "{}", warning);
    }
    for error in &diagnostics.errors {
        tracing::error!(file = %path.display(), "{}", error);
    }

    Ok((model, diagnostics))
}

/// The graph to work on: a data document if given, else a snapshot of the store
pub async fn load_graph(data: Option<&Path>, ctx: &AppContext) -> anyhow::Result<Model> {
    match data {
        Some(path) => {
            let (model, diagnostics) = read_document(path)?;
            if let Some(first) = diagnostics.fatals.first() {
                anyhow::bail!("Malformed document {}: {}", path.display(), first);
            }
            Ok(model)
        }
        None => Ok(ctx.storage.snapshot().await?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contour_core::Sort;

    #[test]
    fn test_parse_path() {
        assert_eq!(
            parse_path("urn:sells ^urn:reportsTo").unwrap(),
            vec![Edge::forward("urn:sells"), Edge::inverse("urn:reportsTo")]
        );
        assert!(parse_path("").unwrap().is_empty());
        assert!(parse_path("urn:a ^").is_err());
    }

    #[test]
    fn test_parse_order() {
        let order = parse_order("-urn:salary").unwrap();
        assert_eq!(order.sort, Sort::Decreasing);
        assert_eq!(order.path, vec![Edge::forward("urn:salary")]);

        assert_eq!(parse_order("+urn:salary").unwrap(), parse_order("urn:salary").unwrap());
    }

    #[test]
    fn test_context() {
        let args = ContextArgs {
            role: vec!["admin".to_string()],
            ..ContextArgs::default()
        };

        let context = args.context();
        assert!(context.role.is_some());
        assert!(context.task.is_none());
    }
}
