//! Engine configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;
use stockbook_db::DbConfig;

/// Stockbook configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockbookConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// Attempts per unit of work before reporting a conflict
    pub cas_max_attempts: u32,

    /// Linear backoff unit between attempts, in milliseconds
    pub cas_backoff_ms: u64,

    /// Default tracing filter directive when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for StockbookConfig {
    fn default() -> Self {
        StockbookConfig {
            database_path: PathBuf::from("./stockbook.db"),
            max_connections: 5,
            cas_max_attempts: 5,
            cas_backoff_ms: 10,
            log_filter: "info".to_string(),
        }
    }
}

impl StockbookConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn load_from<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = StockbookConfig::default();

        let config = StockbookConfig {
            database_path: lookup("STOCKBOOK_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            max_connections: parse_or(&lookup, "STOCKBOOK_MAX_CONNECTIONS", defaults.max_connections)?,

            cas_max_attempts: parse_or(
                &lookup,
                "STOCKBOOK_CAS_MAX_ATTEMPTS",
                defaults.cas_max_attempts,
            )?,

            cas_backoff_ms: parse_or(&lookup, "STOCKBOOK_CAS_BACKOFF_MS", defaults.cas_backoff_ms)?,

            log_filter: lookup("STOCKBOOK_LOG").unwrap_or(defaults.log_filter),
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "STOCKBOOK_MAX_CONNECTIONS".to_string(),
            ));
        }

        if config.cas_max_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "STOCKBOOK_CAS_MAX_ATTEMPTS".to_string(),
            ));
        }

        Ok(config)
    }

    /// Pool settings for this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }

    /// Retry settings for this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.cas_max_attempts,
            Duration::from_millis(self.cas_backoff_ms),
        )
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}
