//! Query commands

use std::path::PathBuf;

use clap::{Args, Subcommand};

use super::compile::read_query;
use super::input::{load_graph, parse_order, parse_path, read_shape, ContextArgs};
use crate::output::{response_table, to_json, OutputFormat};
use crate::AppContext;
use contour_core::Query;
use contour_query::{GraphEngine, QueryEngine};

#[derive(Args)]
pub struct QueryArgs {
    /// Data document to query instead of the store
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    #[command(flatten)]
    pub context: ContextArgs,

    #[command(subcommand)]
    pub command: QueryCommands,
}

#[derive(Subcommand)]
pub enum QueryCommands {
    /// List matching resources with their projected descriptions
    Edges {
        /// Shape file (JSON)
        #[arg(short, long)]
        shape: PathBuf,

        /// Sort criteria, most significant first (`-` prefix for decreasing)
        #[arg(long, allow_hyphen_values = true)]
        order: Vec<String>,

        /// Number of resources to skip
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Maximum number of resources (0 for all)
        #[arg(short, long, default_value = "0")]
        limit: usize,
    },

    /// Count, min and max of the values reached by a path
    Stats {
        /// Shape file (JSON)
        #[arg(short, long)]
        shape: PathBuf,

        /// Path from the matching resources (space separated, `^` for inverse)
        #[arg(long, default_value = "")]
        path: String,
    },

    /// Distinct values reached by a path with their counts
    Items {
        /// Shape file (JSON)
        #[arg(short, long)]
        shape: PathBuf,

        /// Path from the matching resources (space separated, `^` for inverse)
        #[arg(long, default_value = "")]
        path: String,
    },

    /// Run a query descriptor file
    Run {
        /// Query file (JSON)
        query: PathBuf,
    },
}

impl QueryCommands {
    fn query(&self) -> anyhow::Result<Query> {
        match self {
            Self::Edges {
                shape,
                order,
                offset,
                limit,
            } => {
                let mut query = Query::edges(read_shape(shape)?)
                    .with_offset(*offset)
                    .with_limit(*limit);
                for criterion in order {
                    query = query.with_order(parse_order(criterion)?);
                }
                Ok(query)
            }
            Self::Stats { shape, path } => Ok(Query::stats(read_shape(shape)?, parse_path(path)?)),
            Self::Items { shape, path } => Ok(Query::items(read_shape(shape)?, parse_path(path)?)),
            Self::Run { query } => read_query(query),
        }
    }
}

pub async fn run(args: &QueryArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let query = args.command.query()?;
    let model = load_graph(args.data.as_deref(), ctx).await?;
    let engine = GraphEngine::new().with_options(ctx.options(args.context.context()));

    let response = engine.execute(&query, &model)?;

    match ctx.format {
        OutputFormat::Json => println!("{}", to_json(&response)?),
        OutputFormat::Table => print!("{}", response_table(&response)),
    }

    Ok(())
}
