//! Query executor boundary.
//!
//! The relational engine is opaque to this crate. A [`QueryExecutor`] runs the
//! statements a fetcher builds and hands back decoded rows; it owns connection
//! checkout, parameter binding, and row decoding, nothing else.

pub mod memory;
pub mod postgres;

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::QueryError;
use crate::record::{MetaRecord, SourceRecord};
use crate::types::{PageWindow, Source};

pub use memory::MemoryExecutor;
pub use postgres::PgExecutor;

/// One parameterised, region-filtered statement.
///
/// `sql` binds `$1` to `region`; windowed statements additionally bind `$2`
/// to the offset and `$3` to the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowQuery<'a> {
    pub source: Source,
    pub sql: &'static str,
    pub region: &'a str,
    pub window: Option<PageWindow>,
}

/// Executes fetcher statements against a store.
///
/// Every operation either returns all decoded rows or an error; rows decoded
/// before a failure are discarded. When `cancel` fires, the in-flight query
/// is abandoned, its connection released, and [`QueryError::Cancelled`]
/// returned.
pub trait QueryExecutor: Send + Sync {
    /// Fetch full rows in the shape of `query.source`.
    fn fetch_records(
        &self,
        query: &RowQuery<'_>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<SourceRecord>, QueryError>> + Send;

    /// Fetch identity and location columns only.
    fn fetch_meta(
        &self,
        query: &RowQuery<'_>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<MetaRecord>, QueryError>> + Send;

    /// Run a single-row `COUNT(*)` statement.
    fn fetch_count(
        &self,
        query: &RowQuery<'_>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<i64, QueryError>> + Send;
}

/// Race `fut` against `cancel`.
pub(crate) async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, QueryError>>,
) -> Result<T, QueryError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(QueryError::Cancelled),
        result = fut => result,
    }
}
