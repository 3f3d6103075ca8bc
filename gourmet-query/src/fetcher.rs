//! Trait definition for per-source fetchers, and the closed set resolving them.
//!
//! Each source (tabelog, michelin) implements [`SourceFetcher`] to turn a
//! `(region, page)` request into normalized [`Item`]s. Fetchers are stateless:
//! every row buffer lives inside a single call, so one instance can serve any
//! number of concurrent requests.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::QueryError;
use crate::executor::QueryExecutor;
use crate::fetchers::{MichelinFetcher, TabelogFetcher};
use crate::types::{Item, MetaPage, Source};

/// A source-specific fetch strategy.
///
/// Implementors own their statements and normalization. All implementations
/// must be `Send + Sync` so they can be shared across request tasks.
pub trait SourceFetcher: Send + Sync {
    /// Fetch page `page` (zero-based) of `region`: at most ten items,
    /// ascending by id. A page past the end yields an empty vector.
    ///
    /// # Errors
    ///
    /// Any row-read or row-decode failure aborts the whole fetch.
    fn fetch<E: QueryExecutor>(
        &self,
        executor: &E,
        region: &str,
        page: u32,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<Item>, QueryError>> + Send;

    /// Fetch every listing of `region` plus the region's row count.
    ///
    /// Rows and count are two round-trips without a shared snapshot.
    fn fetch_meta<E: QueryExecutor>(
        &self,
        executor: &E,
        region: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<MetaPage, QueryError>> + Send;

    /// Returns which [`Source`] this implementation serves.
    fn source(&self) -> Source;
}

/// The closed set of fetchers, resolved from a source name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetcher {
    Tabelog(TabelogFetcher),
    Michelin(MichelinFetcher),
}

impl Fetcher {
    pub fn for_source(source: Source) -> Self {
        match source {
            Source::Tabelog => Self::Tabelog(TabelogFetcher),
            Source::Michelin => Self::Michelin(MichelinFetcher),
        }
    }

    /// Resolve a fetcher by exact source name; `None` for unknown names.
    pub fn resolve(name: &str) -> Option<Self> {
        name.parse::<Source>().ok().map(Self::for_source)
    }
}

impl SourceFetcher for Fetcher {
    async fn fetch<E: QueryExecutor>(
        &self,
        executor: &E,
        region: &str,
        page: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<Item>, QueryError> {
        match self {
            Self::Tabelog(f) => f.fetch(executor, region, page, cancel).await,
            Self::Michelin(f) => f.fetch(executor, region, page, cancel).await,
        }
    }

    async fn fetch_meta<E: QueryExecutor>(
        &self,
        executor: &E,
        region: &str,
        cancel: &CancellationToken,
    ) -> Result<MetaPage, QueryError> {
        match self {
            Self::Tabelog(f) => f.fetch_meta(executor, region, cancel).await,
            Self::Michelin(f) => f.fetch_meta(executor, region, cancel).await,
        }
    }

    fn source(&self) -> Source {
        match self {
            Self::Tabelog(f) => f.source(),
            Self::Michelin(f) => f.source(),
        }
    }
}
