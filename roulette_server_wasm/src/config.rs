//! Server configuration
//!
//! Values come from an optional TOML file named by `ROULETTE_CONFIG`, then
//! from `ROULETTE_*` environment variables.

use crate::dispatcher::HubLimits;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_VAR: &str = "ROULETTE_CONFIG";
const TIMEOUT_VAR: &str = "ROULETTE_CLIENT_TIMEOUT_SECS";
const NAME_CHARS_VAR: &str = "ROULETTE_MAX_NAME_CHARS";
const STATE_FILE_VAR: &str = "ROULETTE_STATE_FILE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Seconds without a poll or event before a client is disconnected
    #[serde(default = "default_client_timeout_secs")]
    pub client_timeout_secs: u64,

    /// Display names are truncated to this many characters
    #[serde(default = "default_max_name_chars")]
    pub max_name_chars: usize,

    /// Hand state between component instances through this file
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

fn default_client_timeout_secs() -> u64 {
    30
}

fn default_max_name_chars() -> usize {
    32
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_timeout_secs: default_client_timeout_secs(),
            max_name_chars: default_max_name_chars(),
            state_file: None,
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve environment variables
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(value) = lookup(TIMEOUT_VAR) {
            config.client_timeout_secs = parse_env(TIMEOUT_VAR, value)?;
        }
        if let Some(value) = lookup(NAME_CHARS_VAR) {
            config.max_name_chars = parse_env(NAME_CHARS_VAR, value)?;
        }
        if let Some(value) = lookup(STATE_FILE_VAR) {
            config.state_file = (!value.is_empty()).then(|| PathBuf::from(value));
        }
        Ok(config)
    }

    pub fn client_timeout_ms(&self) -> u64 {
        self.client_timeout_secs.saturating_mul(1000)
    }

    pub fn hub_limits(&self) -> HubLimits {
        HubLimits {
            max_name_chars: self.max_name_chars,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { key, value })
}
