use std::path::PathBuf;

use anyhow::{Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

/// Optional settings file looked up in the working directory (any format
/// the `config` crate understands, e.g. `alpha_scrapers.toml`).
pub const CONFIG_FILE: &str = "alpha_scrapers";
pub const ENV_PREFIX: &str = "ALPHA";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root for databases and snapshots; each source gets a subdirectory.
    pub data_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub save_raw: bool,
    pub http: HttpSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Retries after the first attempt on a transient status.
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_dir: PathBuf::from("data"),
            raw_dir: PathBuf::from("raw_responses"),
            save_raw: false,
            http: HttpSettings::default(),
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            max_retries: 3,
            backoff_ms: 500,
            timeout_secs: 30,
            user_agent: concat!("alpha_scrapers/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Settings file (if any), then `ALPHA_*` environment variables.
/// Nested keys use `__`, e.g. `ALPHA_HTTP__MAX_RETRIES=5`.
pub fn load() -> Result<Settings> {
    let builder = Config::builder()
        .add_source(File::with_name(CONFIG_FILE).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );
    deserialize(builder)
}

fn deserialize(builder: ConfigBuilder<DefaultState>) -> Result<Settings> {
    builder
        .build()
        .context("Failed to read configuration")?
        .try_deserialize()
        .context("Invalid configuration")
}
