use core_types::DEFAULT_ORIGIN;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Attributes whose string values coerce into boolean properties.
pub const DEFAULT_BOOLEAN_ATTRIBUTES: &[&str] = &[
    "checked", "defer", "disabled", "hidden", "ismap", "multiple", "nohref", "noresize",
    "noshade", "nowrap", "open", "readonly", "required", "reversed", "selected",
];

const ENV_LOG_UPDATES: &str = "DELTADOM_LOG_UPDATES";
const ENV_DEFAULT_ORIGIN: &str = "DELTADOM_DEFAULT_ORIGIN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("{var}={value:?} is not a boolean")]
    InvalidEnv { var: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Log a summary line per batch with running totals.
    pub log_delta_updates: bool,
    /// Origin used for batches that do not name one.
    pub default_origin: String,
    pub boolean_attributes: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            log_delta_updates: false,
            default_origin: DEFAULT_ORIGIN.to_string(),
            boolean_attributes: DEFAULT_BOOLEAN_ATTRIBUTES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Applies `DELTADOM_LOG_UPDATES` and `DELTADOM_DEFAULT_ORIGIN`.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|var| std::env::var(var).ok())
    }

    fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(ENV_LOG_UPDATES) {
            self.log_delta_updates = parse_flag(ENV_LOG_UPDATES, &value)?;
        }
        if let Some(value) = lookup(ENV_DEFAULT_ORIGIN) {
            if !value.is_empty() {
                self.default_origin = value;
            }
        }
        Ok(self)
    }
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var,
            value: value.to_string(),
        }),
    }
}
