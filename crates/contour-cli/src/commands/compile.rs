//! Compile command: print the SPARQL text of a query

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Args;

use super::input::ContextArgs;
use crate::AppContext;
use contour_core::{limits, Query};
use contour_query::{GraphEngine, QueryEngine};

#[derive(Args)]
pub struct CompileArgs {
    /// Query file (JSON)
    pub query: PathBuf,

    #[command(flatten)]
    pub context: ContextArgs,
}

/// Read a JSON query descriptor
pub fn read_query(path: &std::path::Path) -> anyhow::Result<Query> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let query: Query = serde_json::from_str(&text).with_context(|| format!("parsing query {}", path.display()))?;

    limits::validate_shape_depth(query.shape().depth())?;
    Ok(query)
}

pub fn run(args: &CompileArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let query = read_query(&args.query)?;
    let engine = GraphEngine::new().with_options(ctx.options(args.context.context()));

    print!("{}", engine.explain(&query)?);
    Ok(())
}
