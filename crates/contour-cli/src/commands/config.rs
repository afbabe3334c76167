//! Config command

use std::collections::BTreeMap;

use clap::{Args, Subcommand};

use crate::config::{config_file_path, Config};
use crate::output::{to_json, OutputFormat};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print one setting
    Get { key: String },

    /// Change one setting
    Set { key: String, value: String },

    /// Restore the default of one setting
    Unset { key: String },

    /// Print every setting
    List,

    /// Print the location of the config file
    Path,

    /// Write the defaults to the config file
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: &ConfigArgs, format: OutputFormat) -> anyhow::Result<()> {
    let path = config_file_path();
    let mut config = Config::load();

    match &args.command {
        ConfigCommands::Get { key } => {
            if !Config::keys().contains(&key.as_str()) {
                anyhow::bail!("Unknown config key: {} (available: {})", key, Config::keys().join(", "));
            }
            println!("{}", config.get(key).unwrap_or_else(|| "(not set)".to_string()));
        }

        ConfigCommands::Set { key, value } => {
            config.set(key, value)?;
            config.save()?;
            tracing::info!(key = %key, value = %value, path = %path.display(), "Updated config");
        }

        ConfigCommands::Unset { key } => {
            config.unset(key)?;
            config.save()?;
            tracing::info!(key = %key, path = %path.display(), "Restored config default");
        }

        ConfigCommands::List => {
            let settings: BTreeMap<&str, Option<String>> =
                Config::keys().iter().map(|key| (*key, config.get(key))).collect();

            match format {
                OutputFormat::Json => println!("{}", to_json(&settings)?),
                OutputFormat::Table => {
                    println!("# {}", path.display());
                    for (key, value) in &settings {
                        println!("{:<16} {}", key, value.as_deref().unwrap_or("(not set)"));
                    }
                }
            }
        }

        ConfigCommands::Path => println!("{}", path.display()),

        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!("{} exists; pass --force to replace it", path.display());
            }
            Config::default().save()?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}
