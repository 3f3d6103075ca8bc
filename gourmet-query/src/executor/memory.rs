//! Fixture-backed executor with the same row semantics as Postgres.
//!
//! Rows are filtered by exact region, ordered by ascending identifier, and
//! windowed by offset/limit. Backs the test suites of this crate and the host.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{cancellable, QueryExecutor, RowQuery};
use crate::error::QueryError;
use crate::record::{MetaRecord, SourceRecord};
use crate::types::Source;

/// In-memory [`QueryExecutor`].
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    rows: RwLock<HashMap<Source, Vec<SourceRecord>>>,
    failure: RwLock<Option<QueryError>>,
    latency: Option<Duration>,
    round_trips: AtomicUsize,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an executor preloaded with `records`.
    pub fn with_records(records: impl IntoIterator<Item = SourceRecord>) -> Self {
        let executor = Self::new();
        for record in records {
            executor.insert(record);
        }
        executor
    }

    /// Delay every round-trip by `latency`, so overlapping calls actually overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add or replace a row (matched by source and id).
    pub fn insert(&self, record: SourceRecord) {
        let Ok(mut rows) = self.rows.write() else {
            tracing::error!("memory executor lock poisoned; dropping insert");
            return;
        };
        let table = rows.entry(record.source()).or_default();
        table.retain(|existing| existing.id() != record.id());
        table.push(record);
    }

    /// Remove a row, returning whether it existed.
    pub fn remove(&self, source: Source, id: i64) -> bool {
        let Ok(mut rows) = self.rows.write() else {
            return false;
        };
        let Some(table) = rows.get_mut(&source) else {
            return false;
        };
        let before = table.len();
        table.retain(|existing| existing.id() != id);
        table.len() != before
    }

    /// Make every subsequent round-trip fail with `error` (or succeed again with `None`).
    pub fn set_failure(&self, error: Option<QueryError>) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = error;
        }
    }

    /// Number of round-trips served so far, failed ones included.
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    /// Rows of `source` in `region`, ascending by id.
    fn select(&self, source: Source, region: &str) -> Result<Vec<SourceRecord>, QueryError> {
        let rows = self
            .rows
            .read()
            .map_err(|e| QueryError::Query(format!("memory executor lock poisoned: {e}")))?;
        let mut selected: Vec<SourceRecord> = rows
            .get(&source)
            .map(|table| {
                table
                    .iter()
                    .filter(|record| record.region() == region)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        selected.sort_by_key(SourceRecord::id);
        Ok(selected)
    }

    async fn round_trip(&self) -> Result<(), QueryError> {
        self.round_trips.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let failure = self
            .failure
            .read()
            .map_err(|e| QueryError::Query(format!("memory executor lock poisoned: {e}")))?
            .clone();
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl QueryExecutor for MemoryExecutor {
    async fn fetch_records(
        &self,
        query: &RowQuery<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<SourceRecord>, QueryError> {
        cancellable(cancel, self.round_trip()).await?;
        let rows = self.select(query.source, query.region)?;
        let Some(window) = query.window else {
            return Ok(rows);
        };
        let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(window.limit).unwrap_or(0);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn fetch_meta(
        &self,
        query: &RowQuery<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<MetaRecord>, QueryError> {
        cancellable(cancel, self.round_trip()).await?;
        let rows = self.select(query.source, query.region)?;
        Ok(rows.iter().map(SourceRecord::to_meta).collect())
    }

    async fn fetch_count(
        &self,
        query: &RowQuery<'_>,
        cancel: &CancellationToken,
    ) -> Result<i64, QueryError> {
        cancellable(cancel, self.round_trip()).await?;
        let rows = self.select(query.source, query.region)?;
        i64::try_from(rows.len()).map_err(|e| QueryError::Query(format!("count overflow: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MichelinRecord;
    use crate::types::PageWindow;

    fn michelin(id: i64, region: &str) -> SourceRecord {
        SourceRecord::Michelin(MichelinRecord {
            id,
            name: format!("m{id}"),
            cuisines: "French".into(),
            lat: 0.0,
            lng: 0.0,
            area: "Area".into(),
            region: region.into(),
            rank: "1 Star".into(),
            price_category: "¥¥".into(),
            image: String::new(),
            url: format!("/r/{id}"),
        })
    }

    fn query(region: &str, window: Option<PageWindow>) -> RowQuery<'_> {
        RowQuery {
            source: Source::Michelin,
            sql: "",
            region,
            window,
        }
    }

    #[tokio::test]
    async fn records_are_filtered_sorted_and_windowed() {
        let executor = MemoryExecutor::with_records(
            [5, 1, 3, 2, 4].into_iter().map(|id| michelin(id, "Kyoto")),
        );
        executor.insert(michelin(99, "Osaka"));
        let cancel = CancellationToken::new();

        let window = PageWindow { offset: 1, limit: 3 };
        let rows = executor
            .fetch_records(&query("Kyoto", Some(window)), &cancel)
            .await
            .expect("fetch");
        let ids: Vec<i64> = rows.iter().map(SourceRecord::id).collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn count_matches_region_rows() {
        let executor = MemoryExecutor::with_records((1..=4).map(|id| michelin(id, "Kyoto")));
        let cancel = CancellationToken::new();
        let count = executor
            .fetch_count(&query("Kyoto", None), &cancel)
            .await
            .expect("count");
        assert_eq!(count, 4);
        assert_eq!(executor.round_trips(), 1);
    }

    #[tokio::test]
    async fn insert_replaces_same_id() {
        let executor = MemoryExecutor::with_records([michelin(1, "Kyoto")]);
        executor.insert(michelin(1, "Osaka"));
        let cancel = CancellationToken::new();
        let kyoto = executor
            .fetch_count(&query("Kyoto", None), &cancel)
            .await
            .expect("count");
        assert_eq!(kyoto, 0);
        assert!(executor.remove(Source::Michelin, 1));
        assert!(!executor.remove(Source::Michelin, 1));
    }

    #[tokio::test]
    async fn configured_failure_is_returned() {
        let executor = MemoryExecutor::with_records([michelin(1, "Kyoto")]);
        executor.set_failure(Some(QueryError::Connection("refused".into())));
        let cancel = CancellationToken::new();
        let err = executor
            .fetch_meta(&query("Kyoto", None), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, QueryError::Connection("refused".into()));

        executor.set_failure(None);
        let recovered = executor.fetch_meta(&query("Kyoto", None), &cancel).await;
        assert!(recovered.is_ok());
    }

    #[tokio::test]
    async fn cancelled_token_aborts_round_trip() {
        let executor = MemoryExecutor::new().with_latency(Duration::from_secs(30));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = executor
            .fetch_count(&query("Kyoto", None), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, QueryError::Cancelled);
    }
}
