//! Context-wide configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use crate::reactive::DEFAULT_FLUSH_LIMIT;

pub const FLUSH_LIMIT_VAR: &str = "STORAGE_SIGNAL_FLUSH_LIMIT";
pub const STORAGE_SYNC_VAR: &str = "STORAGE_SIGNAL_SYNC";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextConfig {
    /// Maximum reaction runs per flush.
    pub flush_limit: usize,
    /// Whether handles listen for other windows' changes unless they opt out.
    pub storage_sync: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self { flush_limit: DEFAULT_FLUSH_LIMIT, storage_sync: true }
    }
}

impl ContextConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `STORAGE_SIGNAL_FLUSH_LIMIT`: positive integer, default 10000
    /// - `STORAGE_SIGNAL_SYNC`: `true` (default) or `false`
    ///
    /// Only meaningful for native hosts. On `wasm32-unknown-unknown` the
    /// environment is always empty, so this returns the defaults; pages
    /// build a config in code and pass it to `StorageContext::browser`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unparseable values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| match std::env::var(var) {
            Ok(value) => Some(value),
            Err(_) => None,
        })
    }

    /// Build config from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unparseable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            flush_limit: parse_flush_limit(lookup(FLUSH_LIMIT_VAR).as_deref())?,
            storage_sync: parse_storage_sync(lookup(STORAGE_SYNC_VAR).as_deref())?,
        })
    }
}

fn parse_flush_limit(raw: Option<&str>) -> Result<usize, ConfigError> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_FLUSH_LIMIT);
    };
    match raw.trim().parse::<usize>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(ConfigError::Invalid { var: FLUSH_LIMIT_VAR, value: raw.to_owned() }),
    }
}

fn parse_storage_sync(raw: Option<&str>) -> Result<bool, ConfigError> {
    match raw.map(str::trim).unwrap_or("true") {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(ConfigError::Invalid { var: STORAGE_SYNC_VAR, value: other.to_owned() }),
    }
}
