//! Optimize command

use std::path::PathBuf;

use clap::Args;

use super::input::{read_shape, ContextArgs};
use crate::output::{to_json, OutputFormat};
use crate::AppContext;
use contour_core::{optimize, Axis};

#[derive(Args)]
pub struct OptimizeArgs {
    /// Shape file (JSON)
    #[arg(short, long)]
    pub shape: PathBuf,

    /// Mode to redact for: convey, filter
    #[arg(long, value_delimiter = ',')]
    pub mode: Vec<String>,

    #[command(flatten)]
    pub context: ContextArgs,
}

pub fn run(args: &OptimizeArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let mut context = args.context.context();
    if !args.mode.is_empty() {
        context = context.with(Axis::Mode, args.mode.iter().cloned());
    }

    let shape = read_shape(&args.shape)?;
    let optimized = optimize(&context.redact(&shape))?;

    tracing::debug!(before = shape.depth(), after = optimized.depth(), "Optimized shape");

    match ctx.format {
        OutputFormat::Json => println!("{}", to_json(&optimized)?),
        OutputFormat::Table => println!("{}", optimized),
    }

    Ok(())
}
