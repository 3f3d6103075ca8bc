//! Michelin-shaped listings: award text, price category, site-relative URLs.

use tokio_util::sync::CancellationToken;

use super::{fetch_meta_page, Statements};
use crate::error::QueryError;
use crate::executor::{QueryExecutor, RowQuery};
use crate::fetcher::SourceFetcher;
use crate::record::SourceRecord;
use crate::types::{Item, MetaPage, PageWindow, Source};

const STATEMENTS: Statements = Statements {
    page: "SELECT id, name, cuisine, lat, lng, area, region, rank, price_category, image, url \
           FROM michelin WHERE region = $1 ORDER BY id OFFSET $2 LIMIT $3",
    meta: "SELECT id, name, cuisine, lat, lng, image, url \
           FROM michelin WHERE region = $1 ORDER BY id",
    count: "SELECT COUNT(*) FROM michelin WHERE region = $1",
};

/// Fetcher for the `michelin` table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MichelinFetcher;

impl SourceFetcher for MichelinFetcher {
    async fn fetch<E: QueryExecutor>(
        &self,
        executor: &E,
        region: &str,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<Item>, QueryError> {
        tracing::debug!(region, page, "michelin page fetch");

        let query = RowQuery {
            source: Source::Michelin,
            sql: STATEMENTS.page,
            region,
            window: Some(PageWindow::for_page(page)),
        };
        executor
            .fetch_records(&query, cancel)
            .await?
            .into_iter()
            .map(|record| match record {
                SourceRecord::Michelin(row) => Ok(row.into_item()),
                other => Err(QueryError::Decode(format!(
                    "michelin fetch received a {} row (id {})",
                    other.source(),
                    other.id()
                ))),
            })
            .collect()
    }

    async fn fetch_meta<E: QueryExecutor>(
        &self,
        executor: &E,
        region: &str,
        cancel: &CancellationToken,
    ) -> Result<MetaPage, QueryError> {
        fetch_meta_page(executor, Source::Michelin, &STATEMENTS, region, cancel).await
    }

    fn source(&self) -> Source {
        Source::Michelin
    }
}
