//! Fetcher implementations.
//!
//! Each module provides a unit struct implementing
//! [`crate::fetcher::SourceFetcher`] for one source's table.

pub mod michelin;
pub mod tabelog;

pub use michelin::MichelinFetcher;
pub use tabelog::TabelogFetcher;

use tokio_util::sync::CancellationToken;

use crate::error::QueryError;
use crate::executor::{QueryExecutor, RowQuery};
use crate::types::{MetaPage, Source};

/// Statements one source needs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Statements {
    pub page: &'static str,
    pub meta: &'static str,
    pub count: &'static str,
}

/// Shared metadata path: all rows of the region, then the region's count.
pub(crate) async fn fetch_meta_page<E: QueryExecutor>(
    executor: &E,
    source: Source,
    statements: &Statements,
    region: &str,
    cancel: &CancellationToken,
) -> Result<MetaPage, QueryError> {
    tracing::debug!(%source, region, "fetching metadata");

    let rows_query = RowQuery {
        source,
        sql: statements.meta,
        region,
        window: None,
    };
    let records = executor.fetch_meta(&rows_query, cancel).await?;

    let count_query = RowQuery {
        sql: statements.count,
        ..rows_query
    };
    let count = executor.fetch_count(&count_query, cancel).await?;

    let data: Vec<_> = records
        .into_iter()
        .map(|record| record.into_meta_item(source))
        .collect();

    if data.len() as i64 != count {
        tracing::debug!(
            %source,
            rows = data.len(),
            count,
            "metadata rows and count observed different snapshots"
        );
    }
    Ok(MetaPage { data, count })
}
