//! CLI configuration

use std::path::PathBuf;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// Get default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("contour")
}

/// Path of the configuration file
///
/// `CONTOUR_CONFIG` overrides the location under the user's config directory.
pub fn config_file_path() -> PathBuf {
    if let Some(path) = std::env::var_os("CONTOUR_CONFIG") {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("contour")
        .join("config.toml")
}

/// Configuration for the CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub default_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// Items query cap; 0 for none
    pub items_limit: usize,
    /// Stats query cap; 0 for none
    pub stats_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            default_format: "table".to_string(),
            log_level: None,
            items_limit: 0,
            stats_limit: 0,
        }
    }
}

impl Config {
    /// Load the configuration file, falling back to defaults
    pub fn load() -> Self {
        let path = config_file_path();

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => return Self::default(),
        };

        match toml::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed config file");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = config_file_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        std::fs::write(&path, toml::to_string_pretty(self)?)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn keys() -> &'static [&'static str] {
        &["data_dir", "default_format", "log_level", "items_limit", "stats_limit"]
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "data_dir" => Some(self.data_dir.display().to_string()),
            "default_format" => Some(self.default_format.clone()),
            "log_level" => self.log_level.clone(),
            "items_limit" => Some(self.items_limit.to_string()),
            "stats_limit" => Some(self.stats_limit.to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "default_format" => match value {
                "json" | "table" => self.default_format = value.to_string(),
                _ => anyhow::bail!("Invalid format '{}': expected json or table", value),
            },
            "log_level" => self.log_level = Some(value.to_string()),
            "items_limit" => self.items_limit = value.parse().context("items_limit must be a number")?,
            "stats_limit" => self.stats_limit = value.parse().context("stats_limit must be a number")?,
            _ => anyhow::bail!("Unknown config key: {} (available: {})", key, Self::keys().join(", ")),
        }
        Ok(())
    }

    /// Restore the default value of `key`
    pub fn unset(&mut self, key: &str) -> anyhow::Result<()> {
        let defaults = Self::default();
        match key {
            "data_dir" => self.data_dir = defaults.data_dir,
            "default_format" => self.default_format = defaults.default_format,
            "log_level" => self.log_level = defaults.log_level,
            "items_limit" => self.items_limit = defaults.items_limit,
            "stats_limit" => self.stats_limit = defaults.stats_limit,
            _ => anyhow::bail!("Unknown config key: {} (available: {})", key, Self::keys().join(", ")),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut config = Config::default();

        config.set("items_limit", "25").unwrap();
        config.set("default_format", "json").unwrap();

        assert_eq!(config.get("items_limit").as_deref(), Some("25"));
        assert_eq!(config.get("default_format").as_deref(), Some("json"));
        assert!(config.set("default_format", "csv").is_err());
        assert!(config.set("stats_limit", "many").is_err());
        assert!(config.set("unknown", "1").is_err());
    }

    #[test]
    fn test_unset_restores_default() {
        let mut config = Config::default();

        config.set("log_level", "debug").unwrap();
        config.unset("log_level").unwrap();

        assert_eq!(config, Config::default());
        assert!(config.unset("unknown").is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config {
            items_limit: 10,
            log_level: Some("debug".to_string()),
            ..Config::default()
        };

        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(toml::from_str::<Config>(&text).unwrap(), config);
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str("stats_limit = 5").unwrap();

        assert_eq!(config.stats_limit, 5);
        assert_eq!(config.default_format, "table");
    }
}
