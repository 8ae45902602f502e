use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Environment prefix for every setting, e.g. `ORGTREE__LOG__LEVEL`.
pub const ENV_PREFIX: &str = "ORGTREE";

/// Base name of the optional configuration file in the working directory.
pub const CONFIG_FILE: &str = "orgtree";

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Loads any deserializable settings struct from the layered sources:
/// `.env`, then `orgtree.{toml,yaml,json}`, then `ORGTREE__*` variables.
pub fn load<T: DeserializeOwned>() -> Result<T, AppError> {
    dotenvy::dotenv().ok();

    let config = Cfg::builder()
        .add_source(File::with_name(CONFIG_FILE).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(config.try_deserialize()?)
}
