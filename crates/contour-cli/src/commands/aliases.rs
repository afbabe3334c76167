//! Aliases command

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;

use super::input::{parse_path, read_shape, ContextArgs};
use crate::output::{to_json, OutputFormat};
use crate::AppContext;
use contour_core::{alias, inspect, optimize, Context};

#[derive(Args)]
pub struct AliasesArgs {
    /// Shape file (JSON)
    #[arg(short, long)]
    pub shape: PathBuf,

    /// Nested field to list aliases for (space separated steps, `^` for inverse)
    #[arg(long, default_value = "")]
    pub path: String,

    #[command(flatten)]
    pub context: ContextArgs,
}

pub fn run(args: &AliasesArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let context: Context = args.context.context().with_mode([contour_core::shape::CONVEY]);
    let shape = optimize(&context.redact(&read_shape(&args.shape)?))?;
    let nested = inspect::field(&shape, &parse_path(&args.path)?)?;

    let aliases: BTreeMap<String, String> = alias::aliases(&nested)?
        .into_iter()
        .map(|(edge, alias)| (edge.to_string(), alias))
        .collect();

    match ctx.format {
        OutputFormat::Json => println!("{}", to_json(&aliases)?),
        OutputFormat::Table => {
            if let Some(label) = inspect::label(&nested) {
                println!("{}", label);
            }
            for (edge, alias) in &aliases {
                println!("{:<24} {}", alias, edge);
            }
        }
    }

    Ok(())
}
