use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::OutputFormat;

const APP_NAME: &str = "persist-cli";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Output format used by `read` when none is given
    pub default_output_format: OutputFormat,

    /// Log filter used when neither `--verbose` nor `--quiet` is set and
    /// `RUST_LOG` is empty
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_output_format: OutputFormat::Pretty,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file, or from the platform default location
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) => {
                if path.exists() {
                    let content = std::fs::read_to_string(path)
                        .context("Failed to read configuration file")?;
                    toml::from_str(&content).context("Failed to parse configuration file")
                } else {
                    Ok(Self::default())
                }
            }
            None => confy::load(APP_NAME, None).context("Failed to load configuration"),
        }
    }

    /// Get default configuration file path
    pub fn default_config_path() -> Option<PathBuf> {
        confy::get_configuration_file_path(APP_NAME, None).ok()
    }

    /// Show current configuration as a formatted string
    pub fn show(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration for display")
    }
}
