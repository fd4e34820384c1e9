//! Layered configuration for `courtctl`.
//!
//! Sources, later ones winning: built-in defaults, the config file
//! (`--config`, else `courtctl.toml` when present), then `COURTCTL_*`
//! environment variables with `__` between nested keys, e.g.
//! `COURTCTL_ENGINE__MAX_WEEKS=8`.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use court_engine::SchedulerLimits;
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_FILE: &str = "courtctl.toml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot read on start and rewritten by mutating commands.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("courtctl-store.json"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub engine: SchedulerLimits,
    pub logging: LoggingConfig,
    pub store: StoreConfig,
}

impl CliConfig {
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(Config::try_from(&CliConfig::default())?)
            .add_source(file_source)
            .add_source(
                Environment::with_prefix("COURTCTL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
