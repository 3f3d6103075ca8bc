//! Per-source row shapes as read from storage.
//!
//! Records live only for the duration of one fetch call; they are turned into
//! [`Item`](crate::types::Item) / [`MetaItem`](crate::types::MetaItem) by the
//! normalizer and then dropped.

use std::ops::Bound;

use rust_decimal::Decimal;
use sqlx::postgres::types::PgRange;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use crate::types::Source;

/// A numeric price interval. `None` on either side means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriceRange {
    pub lower: Option<Decimal>,
    pub upper: Option<Decimal>,
}

impl From<PgRange<Decimal>> for PriceRange {
    fn from(range: PgRange<Decimal>) -> Self {
        fn endpoint(bound: Bound<Decimal>) -> Option<Decimal> {
            match bound {
                Bound::Included(v) | Bound::Excluded(v) => Some(v),
                Bound::Unbounded => None,
            }
        }
        Self {
            lower: endpoint(range.start),
            upper: endpoint(range.end),
        }
    }
}

/// A tabelog-shaped row.
#[derive(Debug, Clone, PartialEq)]
pub struct TabelogRecord {
    pub id: i64,
    pub name: String,
    /// Cuisines joined with `、`.
    pub cuisines: String,
    pub lat: f64,
    pub lng: f64,
    pub city_area: String,
    pub region: String,
    pub rank: f64,
    /// `None` when the column is NULL.
    pub price_range: Option<PriceRange>,
    pub image: String,
    pub url: String,
}

/// A michelin-shaped row.
#[derive(Debug, Clone, PartialEq)]
pub struct MichelinRecord {
    pub id: i64,
    pub name: String,
    pub cuisines: String,
    pub lat: f64,
    pub lng: f64,
    pub area: String,
    pub region: String,
    /// Award text such as `"2 Stars"`.
    pub rank: String,
    /// Pre-ranked category such as `"¥¥¥"`.
    pub price_category: String,
    pub image: String,
    /// Site-relative path, e.g. `/en/tokyo-region/tokyo/restaurant/x`.
    pub url: String,
}

/// Identity and location columns shared by both sources.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaRecord {
    pub id: i64,
    pub name: String,
    pub cuisines: String,
    pub lat: f64,
    pub lng: f64,
    pub image: String,
    pub url: String,
}

/// A row from either source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceRecord {
    Tabelog(TabelogRecord),
    Michelin(MichelinRecord),
}

impl SourceRecord {
    pub fn source(&self) -> Source {
        match self {
            Self::Tabelog(_) => Source::Tabelog,
            Self::Michelin(_) => Source::Michelin,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Self::Tabelog(r) => r.id,
            Self::Michelin(r) => r.id,
        }
    }

    pub fn region(&self) -> &str {
        match self {
            Self::Tabelog(r) => &r.region,
            Self::Michelin(r) => &r.region,
        }
    }

    /// Projects the metadata columns out of a full row.
    pub fn to_meta(&self) -> MetaRecord {
        match self {
            Self::Tabelog(r) => MetaRecord {
                id: r.id,
                name: r.name.clone(),
                cuisines: r.cuisines.clone(),
                lat: r.lat,
                lng: r.lng,
                image: r.image.clone(),
                url: r.url.clone(),
            },
            Self::Michelin(r) => MetaRecord {
                id: r.id,
                name: r.name.clone(),
                cuisines: r.cuisines.clone(),
                lat: r.lat,
                lng: r.lng,
                image: r.image.clone(),
                url: r.url.clone(),
            },
        }
    }
}

impl<'r> FromRow<'r, PgRow> for TabelogRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let price_range: Option<PgRange<Decimal>> = row.try_get("price_range")?;
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            cuisines: row.try_get("cuisine")?,
            lat: row.try_get("lat")?,
            lng: row.try_get("lng")?,
            city_area: row.try_get("city_area")?,
            region: row.try_get("region")?,
            rank: row.try_get("rank")?,
            price_range: price_range.map(PriceRange::from),
            image: row.try_get("image")?,
            url: row.try_get("url")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for MichelinRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            cuisines: row.try_get("cuisine")?,
            lat: row.try_get("lat")?,
            lng: row.try_get("lng")?,
            area: row.try_get("area")?,
            region: row.try_get("region")?,
            rank: row.try_get("rank")?,
            price_category: row.try_get("price_category")?,
            image: row.try_get("image")?,
            url: row.try_get("url")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for MetaRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            cuisines: row.try_get("cuisine")?,
            lat: row.try_get("lat")?,
            lng: row.try_get("lng")?,
            image: row.try_get("image")?,
            url: row.try_get("url")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn michelin(id: i64) -> MichelinRecord {
        MichelinRecord {
            id,
            name: "Den".into(),
            cuisines: "Japanese、Creative".into(),
            lat: 35.67,
            lng: 139.71,
            area: "Jingumae".into(),
            region: "Tokyo".into(),
            rank: "2 Stars".into(),
            price_category: "¥¥¥".into(),
            image: "den.jpg".into(),
            url: "/en/tokyo/den".into(),
        }
    }

    #[test]
    fn price_range_from_bounded_pg_range() {
        let range = PgRange {
            start: Bound::Included(Decimal::new(1000, 0)),
            end: Bound::Excluded(Decimal::new(1999, 0)),
        };
        let price = PriceRange::from(range);
        assert_eq!(price.lower, Some(Decimal::new(1000, 0)));
        assert_eq!(price.upper, Some(Decimal::new(1999, 0)));
    }

    #[test]
    fn price_range_unbounded_side_is_none() {
        let range = PgRange {
            start: Bound::Included(Decimal::new(5000, 0)),
            end: Bound::Unbounded,
        };
        let price = PriceRange::from(range);
        assert_eq!(price.lower, Some(Decimal::new(5000, 0)));
        assert!(price.upper.is_none());
    }

    #[test]
    fn empty_pg_range_renders_no_price() {
        // sqlx decodes `'empty'::numrange` with both ends unbounded.
        let empty: PgRange<Decimal> = PgRange {
            start: Bound::Unbounded,
            end: Bound::Unbounded,
        };
        let price = PriceRange::from(empty);
        assert_eq!(
            crate::normalize::format_price_range(Some(&price)),
            crate::normalize::NO_PRICE
        );
    }

    #[test]
    fn to_meta_keeps_raw_url_and_cuisines() {
        let record = SourceRecord::Michelin(michelin(3));
        let meta = record.to_meta();
        assert_eq!(meta.id, 3);
        assert_eq!(meta.url, "/en/tokyo/den");
        assert_eq!(meta.cuisines, "Japanese、Creative");
    }

    #[test]
    fn accessors_dispatch_on_variant() {
        let record = SourceRecord::Michelin(michelin(9));
        assert_eq!(record.source(), Source::Michelin);
        assert_eq!(record.id(), 9);
        assert_eq!(record.region(), "Tokyo");
    }
}
