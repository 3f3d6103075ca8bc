//! Postgres connection pool construction.

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::error::{HostError, Result};

/// Connection options for `url`, with the prepared-statement cache sized
/// from `config`.
///
/// # Errors
///
/// Returns [`HostError::Config`] if the connection string does not parse.
pub fn connect_options(url: &str, config: &DatabaseConfig) -> Result<PgConnectOptions> {
    let options = PgConnectOptions::from_str(url)
        .map_err(|e| HostError::Config(format!("invalid database url: {e}")))?;
    Ok(options.statement_cache_capacity(config.statement_cache_capacity))
}

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
}

/// Open a pool and check one connection out, so a bad connection string or
/// unreachable server fails at startup rather than on the first request.
///
/// # Errors
///
/// Returns [`HostError::Database`] if no connection can be established.
pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<PgPool> {
    let options = connect_options(url, config)?;
    let pool = pool_options(config)
        .connect_with(options)
        .await
        .map_err(|e| HostError::Database(format!("failed to connect: {e}")))?;
    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "database pool ready"
    );
    Ok(pool)
}
