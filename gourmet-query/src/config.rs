//! Query configuration with sensible defaults.
//!
//! [`QueryConfig`] controls caching and per-query time limits. Page size is
//! not configurable: page `p` always selects the same ten rows.

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Configuration for the catalog façade and its cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Maximum number of cached pages / metadata pages per source.
    /// Set to 0 to disable the page cache.
    pub cache_max_entries: u64,
    /// How long a cached page or category count stays valid, in seconds.
    /// Set to 0 to disable caching.
    pub cache_ttl_seconds: u64,
    /// Maximum number of cached category counts per source.
    pub category_max_entries: usize,
    /// Upper bound on a single façade call, in seconds.
    pub query_timeout_seconds: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            cache_max_entries: 1000,
            cache_ttl_seconds: 600,
            category_max_entries: 10_000,
            query_timeout_seconds: 15,
        }
    }
}

impl QueryConfig {
    /// Validates this configuration.
    ///
    /// Checks:
    /// - `query_timeout_seconds` must be greater than 0
    /// - `category_max_entries` must be greater than 0 while caching is enabled
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.query_timeout_seconds == 0 {
            return Err(QueryError::Config(
                "query_timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.cache_enabled() && self.category_max_entries == 0 {
            return Err(QueryError::Config(
                "category_max_entries must be greater than 0 when caching is enabled".into(),
            ));
        }
        Ok(())
    }

    /// Whether the façade consults and populates the cache at all.
    pub fn cache_enabled(&self) -> bool {
        self.cache_ttl_seconds > 0 && self.cache_max_entries > 0
    }
}
