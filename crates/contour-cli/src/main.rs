//! Contour CLI - Command line interface for shape validation and queries

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::{aliases, compile, completions, import, optimize, query, validate};
use config::Config;
use contour_core::Context;
use contour_query::CompilerOptions;
use contour_storage::{FileStorage, StorageBackend};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "contour")]
#[command(author, version, about = "Shape validation and query compilation for RDF graphs")]
pub struct Cli {
    /// Data directory (overrides the configured one)
    #[arg(short, long, global = true, env = "CONTOUR_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output format: table, json (overrides the configured one)
    #[arg(short, long, global = true)]
    pub format: Option<String>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the data directory path
    pub fn data_dir(&self, config: &Config) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| config.data_dir.clone())
    }

    /// Output format from the command line, else the configured default
    pub fn output_format(&self, config: &Config) -> anyhow::Result<OutputFormat> {
        self.format.as_deref().unwrap_or(&config.default_format).parse()
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate resources against a shape
    Validate(validate::ValidateArgs),
    /// Redact and optimize a shape
    Optimize(optimize::OptimizeArgs),
    /// List the field aliases of a shape
    Aliases(aliases::AliasesArgs),
    /// Query a graph through a shape
    Query(query::QueryArgs),
    /// Print the SPARQL text of a query
    Compile(compile::CompileArgs),
    /// Import a data document into the store
    Import(import::ImportArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Application context with storage backend
pub struct AppContext {
    pub config: Config,
    pub format: OutputFormat,
    pub storage: Arc<FileStorage>,
}

impl AppContext {
    pub async fn new(cli: &Cli, config: Config) -> anyhow::Result<Self> {
        let format = cli.output_format(&config)?;

        let data_dir = cli.data_dir(&config);
        tracing::debug!("Using data directory: {:?}", data_dir);

        let storage = FileStorage::in_dir(&data_dir);
        storage.initialize().await?;

        Ok(Self {
            config,
            format,
            storage: Arc::new(storage),
        })
    }

    /// Compiler options from the configured caps and the caller context
    pub fn options(&self, context: Context) -> CompilerOptions {
        CompilerOptions::new()
            .with_items(self.config.items_limit)
            .with_stats(self.config.stats_limit)
            .with_context(context)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => config.log_level.as_deref().unwrap_or("warn"),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    tracing::debug!("Starting contour CLI");

    match &cli.command {
        Commands::Config(args) => return commands::config::run(args, cli.output_format(&config)?),
        Commands::Completions(args) => return completions::run(args),
        _ => {}
    }

    let ctx = AppContext::new(&cli, config).await?;

    match &cli.command {
        Commands::Validate(args) => validate::run(args, &ctx).await?,
        Commands::Optimize(args) => optimize::run(args, &ctx)?,
        Commands::Aliases(args) => aliases::run(args, &ctx)?,
        Commands::Query(args) => query::run(args, &ctx).await?,
        Commands::Compile(args) => compile::run(args, &ctx)?,
        Commands::Import(args) => import::run(args, &ctx).await?,
        Commands::Config(_) | Commands::Completions(_) => {}
    }

    Ok(())
}
