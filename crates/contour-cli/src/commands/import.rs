//! Import command

use std::path::PathBuf;

use clap::Args;

use super::input::{parse_resources, read_document, read_shape, ContextArgs};
use crate::output::{focus_table, OutputFormat};
use crate::AppContext;
use contour_core::{optimize, Level};
use contour_storage::{gated_write, Mutation, StorageBackend, StorageError};

#[derive(Args)]
pub struct ImportArgs {
    /// Data document to import
    pub file: PathBuf,

    /// Shape the store must satisfy after the import
    #[arg(short, long)]
    pub shape: Option<PathBuf>,

    /// Resources to validate (default: subjects of the imported statements)
    #[arg(long, requires = "shape")]
    pub focus: Vec<String>,

    #[command(flatten)]
    pub context: ContextArgs,
}

pub async fn run(args: &ImportArgs, ctx: &AppContext) -> anyhow::Result<()> {
    let (model, diagnostics) = read_document(&args.file)?;
    let mutation = Mutation::inserting(&model);

    match &args.shape {
        Some(path) => {
            let shape = optimize(&args.context.context().redact(&read_shape(path)?))?;
            let focus = parse_resources(&args.focus);

            match gated_write(ctx.storage.as_ref(), &shape, &focus, &mutation, &diagnostics).await {
                Ok(report) => {
                    if let Some(warnings) = report.prune(Level::Warning) {
                        if ctx.format == OutputFormat::Table {
                            eprint!("{}", focus_table(&warnings));
                        }
                    }
                }
                Err(StorageError::Rejected { errors, report }) => {
                    let report = report.prune(Level::Error).unwrap_or_default();
                    match ctx.format {
                        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report.to_json())?),
                        OutputFormat::Table => eprint!("{}", focus_table(&report)),
                    }
                    anyhow::bail!("Import rejected: {} validation errors", errors);
                }
                Err(err) => return Err(err.into()),
            }
        }
        None => {
            if let Some(first) = diagnostics.fatals.first() {
                anyhow::bail!("Malformed document {}: {}", args.file.display(), first);
            }
            ctx.storage.write(&mutation).await?;
        }
    }

    tracing::info!(statements = mutation.len(), file = %args.file.display(), "Imported");
    println!("Imported {} statements", mutation.len());
    Ok(())
}
