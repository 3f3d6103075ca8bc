//! Per-source query cache.
//!
//! Two mappings per source:
//!
//! - **pages**: `(source, region, page)` → a realized page of items, or the
//!   region's metadata page when `page` is `None`. Backed by [`moka`], so it is
//!   size-bounded with a TTL, and concurrent misses for one key share a single
//!   upstream fetch.
//! - **categories**: `(source, region, category)` → count, behind an
//!   [`RwLock`]: shared lock for reads, exclusive lock for writes. A region's
//!   counts are written in one exclusive section and evicted as a unit.
//!
//! Values are inserted whole, so a read returns a complete value or a miss.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use moka::future::Cache;

use crate::config::QueryConfig;
use crate::error::QueryError;
use crate::types::{Item, MetaPage, Source};

/// Composite key of the page mapping. `page: None` addresses the metadata page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub source: Source,
    pub region: String,
    pub page: Option<u32>,
}

impl PageKey {
    pub fn page(source: Source, region: &str, page: u32) -> Self {
        Self {
            source,
            region: region.to_owned(),
            page: Some(page),
        }
    }

    pub fn meta(source: Source, region: &str) -> Self {
        Self {
            source,
            region: region.to_owned(),
            page: None,
        }
    }
}

/// A realized value of the page mapping.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Page(Arc<Vec<Item>>),
    Meta(Arc<MetaPage>),
}

/// What a category count counts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    /// Number of listings aggregated for the region; present once the
    /// region's counts have been recorded.
    Total,
    /// Listings carrying this cuisine segment.
    Cuisine(String),
}

/// Composite key of the category mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CategoryKey {
    pub source: Source,
    pub region: String,
    pub category: Category,
}

#[derive(Debug, Clone, Copy)]
struct CategoryEntry {
    count: i64,
    inserted_at: Instant,
}

/// Cache state for one source.
pub struct SourceCache {
    source: Source,
    enabled: bool,
    pages: Cache<PageKey, CachedValue>,
    categories: RwLock<HashMap<CategoryKey, CategoryEntry>>,
    ttl: Duration,
    category_max_entries: usize,
}

impl SourceCache {
    pub fn new(source: Source, config: &QueryConfig) -> Self {
        let ttl = Duration::from_secs(config.cache_ttl_seconds);
        let pages = Cache::builder()
            .max_capacity(config.cache_max_entries)
            .time_to_live(ttl.max(Duration::from_secs(1)))
            .build();
        Self {
            source,
            enabled: config.cache_enabled(),
            pages,
            categories: RwLock::new(HashMap::new()),
            ttl,
            category_max_entries: config.category_max_entries,
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// Return the cached page for `(region, page)`, or run `fetch` and cache
    /// its result. Concurrent callers for the same key await one `fetch`.
    /// A failed fetch is not cached; every waiter receives the error.
    pub async fn page_or_fetch<F>(
        &self,
        region: &str,
        page: u32,
        fetch: F,
    ) -> Result<Arc<Vec<Item>>, QueryError>
    where
        F: Future<Output = Result<Vec<Item>, QueryError>>,
    {
        if !self.enabled {
            return fetch.await.map(Arc::new);
        }
        let key = PageKey::page(self.source, region, page);
        let source = self.source;
        let value = self
            .pages
            .try_get_with(key, async move {
                tracing::trace!(%source, page, "page cache miss");
                fetch.await.map(|items| CachedValue::Page(Arc::new(items)))
            })
            .await
            .map_err(|e| (*e).clone())?;
        match value {
            CachedValue::Page(items) => Ok(items),
            CachedValue::Meta(_) => {
                Err(QueryError::Cache("page key holds a metadata value".into()))
            }
        }
    }

    /// Metadata counterpart of [`SourceCache::page_or_fetch`].
    pub async fn meta_or_fetch<F>(
        &self,
        region: &str,
        fetch: F,
    ) -> Result<Arc<MetaPage>, QueryError>
    where
        F: Future<Output = Result<MetaPage, QueryError>>,
    {
        if !self.enabled {
            return fetch.await.map(Arc::new);
        }
        let key = PageKey::meta(self.source, region);
        let source = self.source;
        let value = self
            .pages
            .try_get_with(key, async move {
                tracing::trace!(%source, "metadata cache miss");
                fetch.await.map(|page| CachedValue::Meta(Arc::new(page)))
            })
            .await
            .map_err(|e| (*e).clone())?;
        match value {
            CachedValue::Meta(page) => Ok(page),
            CachedValue::Page(_) => {
                Err(QueryError::Cache("metadata key holds a page value".into()))
            }
        }
    }

    /// Look up a page without fetching.
    pub async fn cached_page(&self, region: &str, page: u32) -> Option<Arc<Vec<Item>>> {
        let key = PageKey::page(self.source, region, page);
        match self.pages.get(&key).await {
            Some(CachedValue::Page(items)) => Some(items),
            _ => None,
        }
    }

    /// Look up one category count. Expired entries read as a miss.
    pub fn category_count(
        &self,
        region: &str,
        category: Category,
    ) -> Result<Option<i64>, QueryError> {
        if !self.enabled {
            return Ok(None);
        }
        let key = CategoryKey {
            source: self.source,
            region: region.to_owned(),
            category,
        };
        let categories = self
            .categories
            .read()
            .map_err(|e| QueryError::Cache(format!("category lock poisoned: {e}")))?;
        Ok(categories
            .get(&key)
            .filter(|entry| entry.inserted_at.elapsed() <= self.ttl)
            .map(|entry| entry.count))
    }

    /// Replace every count of `region` in one exclusive section.
    ///
    /// Expired entries are dropped first; if the mapping is still over
    /// capacity, whole regions are evicted oldest first.
    pub fn record_categories(
        &self,
        region: &str,
        counts: impl IntoIterator<Item = (Category, i64)>,
    ) -> Result<(), QueryError> {
        if !self.enabled {
            return Ok(());
        }
        let now = Instant::now();
        let mut categories = self
            .categories
            .write()
            .map_err(|e| QueryError::Cache(format!("category lock poisoned: {e}")))?;

        let ttl = self.ttl;
        categories.retain(|key, entry| key.region != region && entry.inserted_at.elapsed() <= ttl);
        for (category, count) in counts {
            let key = CategoryKey {
                source: self.source,
                region: region.to_owned(),
                category,
            };
            categories.insert(key, CategoryEntry { count, inserted_at: now });
        }

        while categories.len() > self.category_max_entries {
            let oldest = categories
                .iter()
                .filter(|(key, _)| key.region != region)
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(key, _)| key.region.clone());
            let Some(evicted) = oldest else {
                break;
            };
            categories.retain(|key, _| key.region != evicted);
            tracing::debug!(source = %self.source, "evicted category counts for a region");
        }
        Ok(())
    }

    /// Drop every cached page and count.
    pub fn invalidate_all(&self) {
        self.pages.invalidate_all();
        if let Ok(mut categories) = self.categories.write() {
            categories.clear();
        }
    }

    /// Approximate number of cached pages and metadata pages.
    pub async fn page_entry_count(&self) -> u64 {
        self.pages.run_pending_tasks().await;
        self.pages.entry_count()
    }
}

/// The shared cache: one [`SourceCache`] per source.
///
/// Constructed once by the host and handed to the façade as an explicit
/// dependency.
pub struct QueryCache {
    tabelog: SourceCache,
    michelin: SourceCache,
}

impl QueryCache {
    pub fn new(config: &QueryConfig) -> Self {
        Self {
            tabelog: SourceCache::new(Source::Tabelog, config),
            michelin: SourceCache::new(Source::Michelin, config),
        }
    }

    pub fn for_source(&self, source: Source) -> &SourceCache {
        match source {
            Source::Tabelog => &self.tabelog,
            Source::Michelin => &self.michelin,
        }
    }

    pub fn invalidate_all(&self) {
        self.tabelog.invalidate_all();
        self.michelin.invalidate_all();
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(&QueryConfig::default())
    }
}
