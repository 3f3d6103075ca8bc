//! Host configuration: database pool, query behaviour, and bridge limits.
//!
//! Loaded from an optional TOML file (`GOURMET_CONFIG`) with the connection
//! string taken from the environment, which may itself come from `.env`.

use gourmet_query::QueryConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HostError, Result};

/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_VAR: &str = "GOURMET_CONFIG";

/// Environment variables consulted for the connection string, in order.
pub const DATABASE_URL_VARS: [&str; 2] = ["SUPABASE_DB_URL", "DATABASE_URL"];

/// Top-level host configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub database: DatabaseConfig,
    pub query: QueryConfig,
    pub bridge: BridgeConfig,
}

/// Connection pool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres connection string. Usually supplied through the environment.
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
    /// Prepared statements cached per connection. 0 keeps the pool usable
    /// behind a transaction-mode pooler.
    pub statement_cache_capacity: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_seconds: 5,
            statement_cache_capacity: 0,
        }
    }
}

/// Stdio bridge settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Requests handled concurrently; further requests wait for a slot.
    pub max_in_flight: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { max_in_flight: 32 }
    }
}

impl HostConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| HostError::Config(e.to_string()))
    }

    /// Load `.env`, the optional `GOURMET_CONFIG` file, and the connection
    /// string from the environment, then validate.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Config`] if no connection string is available or
    /// any section fails validation.
    pub fn load() -> Result<Self> {
        if let Err(e) = dotenv::dotenv() {
            tracing::warn!(error = %e, "no .env file loaded");
        }

        let mut config = match std::env::var_os(CONFIG_PATH_VAR) {
            Some(path) => {
                let path = PathBuf::from(path);
                tracing::info!(path = %path.display(), "loading config file");
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Override file values with the environment. The first non-empty
    /// variable of [`DATABASE_URL_VARS`] wins.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let url = DATABASE_URL_VARS
            .iter()
            .filter_map(|key| lookup(key))
            .find(|value| !value.trim().is_empty());
        if let Some(url) = url {
            self.database.url = Some(url);
        }
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Config`] on the first failing check.
    pub fn validate(&self) -> Result<()> {
        self.database_url()?;
        if self.database.max_connections == 0 {
            return Err(HostError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(HostError::Config(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }
        if self.bridge.max_in_flight == 0 {
            return Err(HostError::Config(
                "bridge.max_in_flight must be greater than 0".into(),
            ));
        }
        self.query.validate()?;
        Ok(())
    }

    /// The configured connection string.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Config`] when absent or blank.
    pub fn database_url(&self) -> Result<&str> {
        match self.database.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(HostError::Config(format!(
                "no database connection string; set {} or {}",
                DATABASE_URL_VARS[0], DATABASE_URL_VARS[1]
            ))),
        }
    }
}
