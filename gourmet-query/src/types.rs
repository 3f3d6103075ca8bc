//! Wire types for catalog results and source identification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;

/// Number of rows in one page window.
pub const PAGE_SIZE: u32 = 10;

/// The upstream listings a query can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Tabelog-shaped listings: numeric rank, numeric price interval.
    Tabelog,
    /// Michelin-shaped listings: award text, price category, site-relative URLs.
    Michelin,
}

impl Source {
    /// Returns the source name as accepted by [`Source::from_str`].
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tabelog => "tabelog",
            Self::Michelin => "michelin",
        }
    }

    /// Returns every supported source.
    pub fn all() -> &'static [Source] {
        &[Self::Tabelog, Self::Michelin]
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Source {
    type Err = QueryError;

    /// Names match exactly; anything else is a configuration error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tabelog" => Ok(Self::Tabelog),
            "michelin" => Ok(Self::Michelin),
            other => Err(QueryError::Config(format!("unknown source: {other:?}"))),
        }
    }
}

/// The fixed row window selected for a zero-based page number.
///
/// Page `p` covers rows `[10p, 10p + 10)` under ascending identifier order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageWindow {
    pub offset: i64,
    pub limit: i64,
}

impl PageWindow {
    /// Window for a zero-based page number. Pages past the end are valid and
    /// simply select no rows.
    pub fn for_page(page: u32) -> Self {
        Self {
            offset: i64::from(page) * i64::from(PAGE_SIZE),
            limit: i64::from(PAGE_SIZE),
        }
    }
}

/// A normalized restaurant listing, identical in shape for every source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    /// Cuisine segments in the order they appeared in the raw string.
    pub cuisines: Vec<String>,
    pub lat: String,
    pub lng: String,
    pub city_area: String,
    pub region: String,
    pub rank: String,
    pub price_range: String,
    pub img: String,
    /// Fully-qualified listing URL.
    pub url: String,
}

/// Location and identity data for one listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaItem {
    pub id: i64,
    pub name: String,
    pub cuisines: Vec<String>,
    pub lat: String,
    pub lng: String,
    pub img: String,
    pub url: String,
}

/// Every listing of a region plus the region's total row count.
///
/// `data` and `count` come from two separate round-trips; a concurrent write
/// between them can make `data.len()` differ from `count`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaPage {
    pub data: Vec<MetaItem>,
    pub count: i64,
}

/// Number of listings in a region that carry a given cuisine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuisineCount {
    pub cuisine: String,
    pub count: i64,
}
