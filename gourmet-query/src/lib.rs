//! # gourmet-query
//!
//! Paginated, region-filtered restaurant catalog queries over two
//! independently-shaped listing sources, returned in one normalized shape.
//!
//! ## Design
//!
//! - One stateless fetcher per source ([`TabelogFetcher`], [`MichelinFetcher`])
//!   behind the [`SourceFetcher`] trait; [`Fetcher::resolve`] maps a source
//!   name onto the closed set
//! - Pure normalization of cuisines, coordinates, rank, price, and URLs
//!   ([`normalize`])
//! - The relational engine is opaque: fetchers hand statements to a
//!   [`QueryExecutor`] ([`PgExecutor`] over a shared pool, or the fixture-backed
//!   [`MemoryExecutor`])
//! - A per-source cache ([`QueryCache`]) passed explicitly into the
//!   [`Catalog`] façade; concurrent misses for one page share a single fetch
//!
//! Read-only: nothing here writes to either source.

pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod facade;
pub mod fetcher;
pub mod fetchers;
pub mod normalize;
pub mod record;
pub mod types;

pub use cache::QueryCache;
pub use config::QueryConfig;
pub use error::{ErrorKind, QueryError, Result};
pub use executor::{MemoryExecutor, PgExecutor, QueryExecutor};
pub use facade::Catalog;
pub use fetcher::{Fetcher, SourceFetcher};
pub use fetchers::{MichelinFetcher, TabelogFetcher};
pub use types::{CuisineCount, Item, MetaItem, MetaPage, Source};

use tokio_util::sync::CancellationToken;

/// Fetch one page of `region` from `source` without caching.
///
/// # Errors
///
/// Returns [`QueryError::Config`] if `source` names no known source, or the
/// fetch failure otherwise.
///
/// # Examples
///
/// ```no_run
/// # async fn example(pool: sqlx::PgPool) -> gourmet_query::Result<()> {
/// let executor = gourmet_query::PgExecutor::new(pool);
/// let cancel = tokio_util::sync::CancellationToken::new();
/// let items = gourmet_query::page_query(&executor, "Tokyo", 0, "tabelog", &cancel).await?;
/// for item in &items {
///     println!("{} {}", item.rank, item.name);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn page_query<E: QueryExecutor>(
    executor: &E,
    region: &str,
    page: u32,
    source: &str,
    cancel: &CancellationToken,
) -> Result<Vec<Item>> {
    let fetcher = Fetcher::resolve(source)
        .ok_or_else(|| QueryError::Config(format!("unknown source: {source:?}")))?;
    fetcher.fetch(executor, region, page, cancel).await
}

/// Fetch every listing of `region` from `source`, plus its count, without caching.
///
/// # Errors
///
/// Same as [`page_query`].
pub async fn meta_query<E: QueryExecutor>(
    executor: &E,
    region: &str,
    source: &str,
    cancel: &CancellationToken,
) -> Result<MetaPage> {
    let fetcher = Fetcher::resolve(source)
        .ok_or_else(|| QueryError::Config(format!("unknown source: {source:?}")))?;
    fetcher.fetch_meta(executor, region, cancel).await
}
