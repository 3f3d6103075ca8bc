//! Tabelog-shaped listings: numeric rank, numeric price interval, absolute URLs.

use tokio_util::sync::CancellationToken;

use super::{fetch_meta_page, Statements};
use crate::error::QueryError;
use crate::executor::{QueryExecutor, RowQuery};
use crate::fetcher::SourceFetcher;
use crate::record::SourceRecord;
use crate::types::{Item, MetaPage, PageWindow, Source};

const STATEMENTS: Statements = Statements {
    page: "SELECT id, name, cuisine, lat, lng, city_area, region, rank, price_range, image, url \
           FROM tabelog WHERE region = $1 ORDER BY id OFFSET $2 LIMIT $3",
    meta: "SELECT id, name, cuisine, lat, lng, image, url \
           FROM tabelog WHERE region = $1 ORDER BY id",
    count: "SELECT COUNT(*) FROM tabelog WHERE region = $1",
};

/// Fetcher for the `tabelog` table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabelogFetcher;

impl SourceFetcher for TabelogFetcher {
    async fn fetch<E: QueryExecutor>(
        &self,
        executor: &E,
        region: &str,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<Item>, QueryError> {
        tracing::debug!(region, page, "tabelog page fetch");

        let query = RowQuery {
            source: Source::Tabelog,
            sql: STATEMENTS.page,
            region,
            window: Some(PageWindow::for_page(page)),
        };
        let records = executor.fetch_records(&query, cancel).await?;

        let mut items = Vec::with_capacity(records.len());
        for record in records {
            match record {
                SourceRecord::Tabelog(row) => items.push(row.into_item()),
                other => {
                    return Err(QueryError::Decode(format!(
                        "tabelog fetch received a {} row (id {})",
                        other.source(),
                        other.id()
                    )))
                }
            }
        }
        Ok(items)
    }

    async fn fetch_meta<E: QueryExecutor>(
        &self,
        executor: &E,
        region: &str,
        cancel: &CancellationToken,
    ) -> Result<MetaPage, QueryError> {
        fetch_meta_page(executor, Source::Tabelog, &STATEMENTS, region, cancel).await
    }

    fn source(&self) -> Source {
        Source::Tabelog
    }
}
