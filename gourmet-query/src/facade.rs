//! Query façade: resolve a fetcher, consult the cache, fetch on miss.
//!
//! Every entry point resolves the source name first (an unknown name is a
//! configuration error, never an empty result), then consults the per-source
//! cache and populates it after a successful fetch. Calls are bounded by the
//! configured timeout and by the caller's cancellation token.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cache::{Category, QueryCache};
use crate::config::QueryConfig;
use crate::error::QueryError;
use crate::executor::{cancellable, QueryExecutor};
use crate::fetcher::{Fetcher, SourceFetcher};
use crate::types::{CuisineCount, Item, MetaPage};

/// Catalog entry points over one executor and one shared cache.
pub struct Catalog<E> {
    executor: E,
    cache: Arc<QueryCache>,
    config: QueryConfig,
}

impl<E: QueryExecutor> Catalog<E> {
    /// # Errors
    ///
    /// Returns [`QueryError::Config`] if `config` does not validate.
    pub fn new(
        executor: E,
        cache: Arc<QueryCache>,
        config: QueryConfig,
    ) -> Result<Self, QueryError> {
        config.validate()?;
        Ok(Self {
            executor,
            cache,
            config,
        })
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Page `page` (zero-based) of `region` from `source`: at most ten items
    /// in ascending id order. Pages past the end are empty, not errors.
    ///
    /// # Errors
    ///
    /// [`QueryError::Config`] for an unknown source; otherwise whatever the
    /// fetch failed with.
    pub async fn page_query(
        &self,
        region: &str,
        page: u32,
        source: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Item>, QueryError> {
        let fetcher = resolve(source)?;
        let source = fetcher.source();
        tracing::debug!(%source, region, page, "page query");

        let detached = CancellationToken::new();
        let items = self
            .bounded(cancel, async {
                self.cache
                    .for_source(source)
                    .page_or_fetch(
                        region,
                        page,
                        fetcher.fetch(&self.executor, region, page, &detached),
                    )
                    .await
            })
            .await
            .inspect_err(|e| tracing::warn!(%source, page, error = %e, "page query failed"))?;

        Ok(items.as_ref().clone())
    }

    /// Every listing of `region` from `source` plus the region's row count.
    ///
    /// # Errors
    ///
    /// Same as [`Catalog::page_query`].
    pub async fn meta_query(
        &self,
        region: &str,
        source: &str,
        cancel: &CancellationToken,
    ) -> Result<Arc<MetaPage>, QueryError> {
        let fetcher = resolve(source)?;
        let source = fetcher.source();
        tracing::debug!(%source, region, "metadata query");

        let detached = CancellationToken::new();
        self.bounded(cancel, async {
            self.cache
                .for_source(source)
                .meta_or_fetch(region, fetcher.fetch_meta(&self.executor, region, &detached))
                .await
        })
        .await
        .inspect_err(|e| tracing::warn!(%source, error = %e, "metadata query failed"))
    }

    /// Per-cuisine listing counts for `region`, highest first (ties by name).
    ///
    /// Computed from the region's metadata page; each listing counts once per
    /// distinct non-empty cuisine. The counts are stored in the category
    /// mapping of the cache.
    pub async fn cuisine_counts(
        &self,
        region: &str,
        source: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<CuisineCount>, QueryError> {
        let source_tag = resolve(source)?.source();
        let meta = self.meta_query(region, source, cancel).await?;

        let mut totals: BTreeMap<&str, i64> = BTreeMap::new();
        for item in &meta.data {
            let distinct: BTreeSet<&str> = item
                .cuisines
                .iter()
                .map(String::as_str)
                .filter(|c| !c.is_empty())
                .collect();
            for cuisine in distinct {
                *totals.entry(cuisine).or_default() += 1;
            }
        }

        let listed = i64::try_from(meta.data.len())
            .map_err(|e| QueryError::Query(format!("listing count overflow: {e}")))?;
        self.cache.for_source(source_tag).record_categories(
            region,
            std::iter::once((Category::Total, listed)).chain(
                totals
                    .iter()
                    .map(|(cuisine, count)| (Category::Cuisine((*cuisine).to_owned()), *count)),
            ),
        )?;

        let mut counts: Vec<CuisineCount> = totals
            .into_iter()
            .map(|(cuisine, count)| CuisineCount {
                cuisine: cuisine.to_owned(),
                count,
            })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.cuisine.cmp(&b.cuisine)));
        Ok(counts)
    }

    /// Number of listings in `region` carrying `cuisine`.
    ///
    /// Served from the category mapping when the region has been aggregated;
    /// otherwise aggregates the region first.
    pub async fn cuisine_count(
        &self,
        region: &str,
        source: &str,
        cuisine: &str,
        cancel: &CancellationToken,
    ) -> Result<i64, QueryError> {
        let source_tag = resolve(source)?.source();
        let cache = self.cache.for_source(source_tag);

        if let Some(count) = cache.category_count(region, Category::Cuisine(cuisine.to_owned()))? {
            tracing::trace!(source = %source_tag, "cuisine count cache hit");
            return Ok(count);
        }
        if cache.category_count(region, Category::Total)?.is_some() {
            return Ok(0);
        }

        let counts = self.cuisine_counts(region, source, cancel).await?;
        Ok(counts
            .iter()
            .find(|c| c.cuisine == cuisine)
            .map(|c| c.count)
            .unwrap_or(0))
    }

    /// Apply the caller's token and the configured timeout to `fut`.
    async fn bounded<T>(
        &self,
        cancel: &CancellationToken,
        fut: impl Future<Output = Result<T, QueryError>>,
    ) -> Result<T, QueryError> {
        let limit = Duration::from_secs(self.config.query_timeout_seconds);
        cancellable(cancel, async {
            tokio::time::timeout(limit, fut).await.map_err(|_| {
                QueryError::Query(format!(
                    "timed out after {}s",
                    self.config.query_timeout_seconds
                ))
            })?
        })
        .await
    }
}

/// Resolve a fetcher, turning an unknown name into a configuration error.
fn resolve(source: &str) -> Result<Fetcher, QueryError> {
    Fetcher::resolve(source).ok_or_else(|| {
        tracing::error!(source, "unknown source requested");
        QueryError::Config(format!("unknown source: {source:?}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::MemoryExecutor;
    use crate::record::{MichelinRecord, SourceRecord};

    fn michelin(id: i64, cuisines: &str) -> SourceRecord {
        SourceRecord::Michelin(MichelinRecord {
            id,
            name: format!("m{id}"),
            cuisines: cuisines.into(),
            lat: 34.69,
            lng: 135.5,
            area: "Kita".into(),
            region: "Osaka".into(),
            rank: "1 Star".into(),
            price_category: "¥¥".into(),
            image: String::new(),
            url: format!("/r/{id}"),
        })
    }

    fn catalog(executor: MemoryExecutor) -> Catalog<MemoryExecutor> {
        Catalog::new(
            executor,
            Arc::new(QueryCache::default()),
            QueryConfig::default(),
        )
        .expect("valid config")
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = QueryConfig {
            query_timeout_seconds: 0,
            ..Default::default()
        };
        let result = Catalog::new(
            MemoryExecutor::new(),
            Arc::new(QueryCache::default()),
            config,
        );
        assert!(matches!(result, Err(QueryError::Config(_))));
    }

    #[tokio::test]
    async fn unknown_source_is_config_error_without_round_trip() {
        let catalog = catalog(MemoryExecutor::new());
        let cancel = CancellationToken::new();
        let err = catalog
            .page_query("Osaka", 0, "yelp", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Config(_)));
        assert_eq!(catalog.executor().round_trips(), 0);
    }

    #[tokio::test]
    async fn cuisine_counts_deduplicate_within_listing() {
        let catalog = catalog(MemoryExecutor::with_records([
            michelin(1, "Sushi、Sushi、Tempura"),
            michelin(2, "Tempura"),
            michelin(3, ""),
        ]));
        let cancel = CancellationToken::new();
        let counts = catalog
            .cuisine_counts("Osaka", "michelin", &cancel)
            .await
            .expect("counts");
        assert_eq!(
            counts,
            vec![
                CuisineCount {
                    cuisine: "Tempura".into(),
                    count: 2
                },
                CuisineCount {
                    cuisine: "Sushi".into(),
                    count: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn cuisine_count_served_from_category_cache() {
        let catalog = catalog(MemoryExecutor::with_records([
            michelin(1, "Sushi"),
            michelin(2, "Sushi、Kaiseki"),
        ]));
        let cancel = CancellationToken::new();

        let sushi = catalog
            .cuisine_count("Osaka", "michelin", "Sushi", &cancel)
            .await
            .expect("count");
        assert_eq!(sushi, 2);
        let trips = catalog.executor().round_trips();

        let kaiseki = catalog
            .cuisine_count("Osaka", "michelin", "Kaiseki", &cancel)
            .await
            .expect("count");
        let absent = catalog
            .cuisine_count("Osaka", "michelin", "Pizza", &cancel)
            .await
            .expect("count");
        assert_eq!(kaiseki, 1);
        assert_eq!(absent, 0);
        assert_eq!(catalog.executor().round_trips(), trips);
    }

    #[tokio::test]
    async fn cancelled_call_returns_cancelled() {
        let executor = MemoryExecutor::with_records([michelin(1, "Sushi")])
            .with_latency(Duration::from_secs(30));
        let catalog = catalog(executor);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = catalog
            .meta_query("Osaka", "michelin", &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, QueryError::Cancelled);
    }

    #[tokio::test]
    async fn slow_executor_times_out() {
        let executor = MemoryExecutor::with_records([michelin(1, "Sushi")])
            .with_latency(Duration::from_secs(5));
        let config = QueryConfig {
            query_timeout_seconds: 1,
            ..Default::default()
        };
        let catalog = Catalog::new(executor, Arc::new(QueryCache::new(&config)), config)
            .expect("valid config");
        let cancel = CancellationToken::new();
        let err = catalog
            .page_query("Osaka", 0, "michelin", &cancel)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"), "got {err}");
    }
}
