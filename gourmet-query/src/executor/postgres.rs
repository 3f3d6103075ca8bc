//! Postgres executor backed by a shared [`sqlx::PgPool`].
//!
//! The pool is built and owned by the host; this executor only checks a
//! connection out for the duration of one statement. A cancelled or failed
//! statement drops its future, which returns the connection to the pool.

use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};
use tokio_util::sync::CancellationToken;

use super::{cancellable, QueryExecutor, RowQuery};
use crate::error::QueryError;
use crate::record::{MetaRecord, MichelinRecord, SourceRecord, TabelogRecord};
use crate::types::Source;

/// [`QueryExecutor`] over a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get database pool reference
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Bind `region` (and the window, if any) and decode every row as `R`.
    async fn fetch_rows<R>(&self, query: &RowQuery<'_>) -> Result<Vec<R>, QueryError>
    where
        R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut statement = sqlx::query_as::<_, R>(query.sql).bind(query.region);
        if let Some(window) = query.window {
            statement = statement.bind(window.offset).bind(window.limit);
        }
        statement.fetch_all(&self.pool).await.map_err(|e| {
            tracing::warn!(source = %query.source, error = %e, "row fetch failed");
            QueryError::from(e)
        })
    }
}

impl QueryExecutor for PgExecutor {
    async fn fetch_records(
        &self,
        query: &RowQuery<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<SourceRecord>, QueryError> {
        let records = match query.source {
            Source::Tabelog => cancellable(cancel, self.fetch_rows::<TabelogRecord>(query))
                .await?
                .into_iter()
                .map(SourceRecord::Tabelog)
                .collect::<Vec<_>>(),
            Source::Michelin => cancellable(cancel, self.fetch_rows::<MichelinRecord>(query))
                .await?
                .into_iter()
                .map(SourceRecord::Michelin)
                .collect::<Vec<_>>(),
        };
        tracing::debug!(source = %query.source, rows = records.len(), "records fetched");
        Ok(records)
    }

    async fn fetch_meta(
        &self,
        query: &RowQuery<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<MetaRecord>, QueryError> {
        let records = cancellable(cancel, self.fetch_rows::<MetaRecord>(query)).await?;
        tracing::debug!(source = %query.source, rows = records.len(), "meta rows fetched");
        Ok(records)
    }

    async fn fetch_count(
        &self,
        query: &RowQuery<'_>,
        cancel: &CancellationToken,
    ) -> Result<i64, QueryError> {
        let count = cancellable(cancel, async {
            sqlx::query_scalar::<_, i64>(query.sql)
                .bind(query.region)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    tracing::warn!(source = %query.source, error = %e, "count fetch failed");
                    QueryError::from(e)
                })
        })
        .await?;
        tracing::debug!(source = %query.source, count, "count fetched");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::SourceFetcher;
    use crate::fetchers::{MichelinFetcher, TabelogFetcher};
    use sqlx::postgres::PgPoolOptions;

    fn executor_is_send_sync<T: QueryExecutor + Send + Sync>() {}

    #[test]
    fn pg_executor_is_send_sync() {
        executor_is_send_sync::<PgExecutor>();
    }

    #[tokio::test]
    async fn unreachable_database_is_connection_error() {
        let pool = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(200))
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .expect("lazy pool");
        let executor = PgExecutor::new(pool);
        let cancel = CancellationToken::new();

        let err = TabelogFetcher
            .fetch(&executor, "Tokyo", 0, &cancel)
            .await
            .unwrap_err();
        assert!(
            matches!(err, QueryError::Connection(_)),
            "unexpected error: {err:?}"
        );
    }

    /// Requires a database with the `tabelog` and `michelin` tables.
    #[tokio::test]
    #[ignore]
    async fn live_meta_count_covers_rows() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .expect("connect");
        let executor = PgExecutor::new(pool);
        let cancel = CancellationToken::new();

        let meta = MichelinFetcher
            .fetch_meta(&executor, "Tokyo", &cancel)
            .await
            .expect("meta");
        assert!(meta.data.len() as i64 <= meta.count);

        let page = MichelinFetcher
            .fetch(&executor, "Tokyo", 0, &cancel)
            .await
            .expect("page");
        assert!(page.len() <= 10);
        assert!(page.windows(2).all(|w| w[0].id < w[1].id));
    }
}
