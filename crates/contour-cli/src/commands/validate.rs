//! Validate command

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{Args, ValueEnum};

use super::input::{load_graph, parse_resources, read_shape, ContextArgs};
use crate::output::{focus_table, OutputFormat};
use crate::AppContext;
use contour_core::{optimize, Level, Validator, Value};

/// Minimum reported severity
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum LevelArg {
    Info,
    #[default]
    Warning,
    Error,
}

impl From<LevelArg> for Level {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Info => Level::Info,
            LevelArg::Warning => Level::Warning,
            LevelArg::Error => Level::Error,
        }
    }
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Shape file (JSON)
    #[arg(short, long)]
    pub shape: PathBuf,

    /// Data document to validate instead of the store
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Resources to validate (default: every subject)
    #[arg(long)]
    pub focus: Vec<String>,

    /// Validate the submitted description of one resource, flagging unexpected statements
    #[arg(long, conflicts_with = "focus")]
    pub resource: Option<String>,

    /// Minimum severity reported
    #[arg(long, value_enum, default_value = "warning")]
    pub level: LevelArg,

    #[command(flatten)]
    pub context: ContextArgs,
}

pub async fn run(args: &ValidateArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let shape = optimize(&args.context.context().redact(&read_shape(&args.shape)?))?;
    let model = load_graph(args.data.as_deref(), ctx).await?;
    let validator = Validator::new(&model);

    let report = match &args.resource {
        Some(resource) => match parse_resources(std::slice::from_ref(resource)).into_iter().next() {
            Some(resource) => validator.validate_resource(&shape, &resource),
            None => anyhow::bail!("Missing resource"),
        },
        None => {
            let focus: BTreeSet<Value> = if args.focus.is_empty() {
                model.subjects().filter(|value| value.is_resource()).cloned().collect()
            } else {
                parse_resources(&args.focus)
            };
            tracing::info!(resources = focus.len(), "Validating");
            validator.validate(&shape, &focus)
        }
    };

    let failed = report.assess(Level::Error);
    let pruned = report.prune(args.level.into()).unwrap_or_default();

    match ctx.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&pruned.to_json())?),
        OutputFormat::Table if pruned.is_empty() => println!("No issues found"),
        OutputFormat::Table => print!("{}", focus_table(&pruned)),
    }

    if failed {
        anyhow::bail!("Validation failed");
    }

    Ok(())
}
