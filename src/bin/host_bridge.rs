//! Headless catalog host: stdin/stdout JSON bridge over a Postgres pool.
//!
//! Reads `CommandEnvelope` messages as newline-delimited JSON from stdin and
//! writes `ResponseEnvelope` messages to stdout.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.

use gourmet::HostConfig;
use gourmet::host::handler::CatalogHandler;
use gourmet::host::stdio::run_stdio_bridge;
use gourmet_query::{Catalog, PgExecutor, QueryCache};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Tracing to stderr only (stdout is reserved for the JSON protocol).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("gourmet=info,gourmet_query=info,sqlx=warn")
            }),
        )
        .init();

    tracing::info!("gourmet-host starting");

    let config = HostConfig::load().map_err(|e| {
        tracing::error!(error = %e, "invalid configuration");
        anyhow::anyhow!("gourmet-host failed: {e}")
    })?;
    let url = config.database_url()?;
    let pool = gourmet::db::connect(url, &config.database).await?;

    let cache = Arc::new(QueryCache::new(&config.query));
    let catalog = Catalog::new(PgExecutor::new(pool.clone()), cache, config.query.clone())?;
    let handler = CatalogHandler::new(Arc::new(catalog));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received");
            signal_token.cancel();
        }
    });

    run_stdio_bridge(handler, config.bridge.max_in_flight, shutdown)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "gourmet-host exited with error");
            anyhow::anyhow!("gourmet-host failed: {e}")
        })?;

    pool.close().await;
    tracing::info!("gourmet-host shut down cleanly");
    Ok(())
}
