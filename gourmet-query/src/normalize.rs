//! Pure normalization from per-source rows to the unified wire shape.
//!
//! Nothing here performs I/O or can fail: every field of a decoded record has
//! exactly one rendering.

use crate::record::{MetaRecord, MichelinRecord, PriceRange, TabelogRecord};
use crate::types::{Item, MetaItem, Source};

/// Separator between cuisines in the raw cuisine column.
pub const CUISINE_DELIMITER: char = '、';

/// Origin prepended to michelin's site-relative listing paths.
pub const MICHELIN_ORIGIN: &str = "https://guide.michelin.com";

/// Rendering used when a listing has no price interval at all.
pub const NO_PRICE: &str = "No Price";

/// Split a raw cuisine string on [`CUISINE_DELIMITER`].
///
/// Segments are kept verbatim, empty ones included, so `""` yields `[""]`.
pub fn split_cuisines(raw: &str) -> Vec<String> {
    raw.split(CUISINE_DELIMITER).map(str::to_owned).collect()
}

/// Shortest decimal rendering that round-trips the coordinate.
pub fn format_coordinate(value: f64) -> String {
    value.to_string()
}

/// Numeric rank with exactly two fraction digits.
pub fn format_rank(rank: f64) -> String {
    format!("{rank:.2}")
}

/// Render a price interval as `¥<lower> ~ <upper>`.
///
/// An unbounded endpoint renders as an empty string in its position. A
/// missing interval, or one with no bound on either side (Postgres `empty`
/// decodes this way), renders as [`NO_PRICE`].
pub fn format_price_range(range: Option<&PriceRange>) -> String {
    let Some(range) = range.filter(|r| r.lower.is_some() || r.upper.is_some()) else {
        return NO_PRICE.to_owned();
    };
    let lower = range.lower.map(|v| v.to_string()).unwrap_or_default();
    let upper = range.upper.map(|v| v.to_string()).unwrap_or_default();
    format!("¥{lower} ~ {upper}")
}

/// Make a michelin listing path absolute.
pub fn michelin_url(path: &str) -> String {
    format!("{MICHELIN_ORIGIN}{path}")
}

/// Listing URL as exposed on the wire for the given source.
pub fn listing_url(source: Source, url: &str) -> String {
    match source {
        Source::Tabelog => url.to_owned(),
        Source::Michelin => michelin_url(url),
    }
}

impl TabelogRecord {
    pub fn into_item(self) -> Item {
        Item {
            id: self.id,
            name: self.name,
            cuisines: split_cuisines(&self.cuisines),
            lat: format_coordinate(self.lat),
            lng: format_coordinate(self.lng),
            city_area: self.city_area,
            region: self.region,
            rank: format_rank(self.rank),
            price_range: format_price_range(self.price_range.as_ref()),
            img: self.image,
            url: self.url,
        }
    }
}

impl MichelinRecord {
    pub fn into_item(self) -> Item {
        Item {
            id: self.id,
            name: self.name,
            cuisines: split_cuisines(&self.cuisines),
            lat: format_coordinate(self.lat),
            lng: format_coordinate(self.lng),
            city_area: self.area,
            region: self.region,
            rank: self.rank,
            price_range: self.price_category,
            img: self.image,
            url: michelin_url(&self.url),
        }
    }
}

impl MetaRecord {
    /// Normalize a metadata row; the URL is completed per `source`.
    pub fn into_meta_item(self, source: Source) -> MetaItem {
        MetaItem {
            id: self.id,
            name: self.name,
            cuisines: split_cuisines(&self.cuisines),
            lat: format_coordinate(self.lat),
            lng: format_coordinate(self.lng),
            img: self.image,
            url: listing_url(source, &self.url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn tabelog(price_range: Option<PriceRange>) -> TabelogRecord {
        TabelogRecord {
            id: 1,
            name: "Kyoaji".into(),
            cuisines: "Japanese、Kaiseki".into(),
            lat: 35.668_123,
            lng: 139.76,
            city_area: "Shimbashi".into(),
            region: "Tokyo".into(),
            rank: 4.5,
            price_range,
            image: "kyoaji.jpg".into(),
            url: "https://tabelog.com/tokyo/A1301/13001234/".into(),
        }
    }

    #[test]
    fn cuisines_split_in_order() {
        assert_eq!(split_cuisines("A、B、C"), vec!["A", "B", "C"]);
    }

    #[test]
    fn empty_cuisine_string_yields_single_empty_segment() {
        assert_eq!(split_cuisines(""), vec![""]);
    }

    #[test]
    fn empty_segments_are_preserved() {
        assert_eq!(split_cuisines("A、、B、"), vec!["A", "", "B", ""]);
    }

    #[test]
    fn other_separators_are_not_split() {
        assert_eq!(split_cuisines("Sushi, Tempura"), vec!["Sushi, Tempura"]);
    }

    #[test]
    fn coordinates_are_not_rounded() {
        assert_eq!(format_coordinate(35.668_123), "35.668123");
        assert_eq!(format_coordinate(139.0), "139");
        assert_eq!(format_coordinate(-0.5), "-0.5");
    }

    #[test]
    fn rank_has_two_fraction_digits() {
        assert_eq!(format_rank(3.5), "3.50");
        assert_eq!(format_rank(4.0), "4.00");
        assert_eq!(format_rank(3.456), "3.46");
    }

    #[test]
    fn bounded_price_interval() {
        let range = PriceRange {
            lower: Some(Decimal::new(1000, 0)),
            upper: Some(Decimal::new(1999, 0)),
        };
        assert_eq!(format_price_range(Some(&range)), "¥1000 ~ 1999");
    }

    #[test]
    fn unbounded_upper_renders_empty() {
        let range = PriceRange {
            lower: Some(Decimal::new(1000, 0)),
            upper: None,
        };
        assert_eq!(format_price_range(Some(&range)), "¥1000 ~ ");
    }

    #[test]
    fn unbounded_lower_renders_empty() {
        let range = PriceRange {
            lower: None,
            upper: Some(Decimal::new(999, 0)),
        };
        assert_eq!(format_price_range(Some(&range)), "¥ ~ 999");
    }

    #[test]
    fn missing_interval_is_no_price() {
        assert_eq!(format_price_range(None), "No Price");
    }

    #[test]
    fn interval_without_bounds_is_no_price() {
        assert_eq!(format_price_range(Some(&PriceRange::default())), "No Price");
    }

    #[test]
    fn michelin_path_becomes_absolute() {
        assert_eq!(
            michelin_url("/restaurant/tokyo/r1"),
            "https://guide.michelin.com/restaurant/tokyo/r1"
        );
    }

    #[test]
    fn tabelog_item_keeps_url_and_formats_fields() {
        let item = tabelog(None).into_item();
        assert_eq!(item.url, "https://tabelog.com/tokyo/A1301/13001234/");
        assert_eq!(item.rank, "4.50");
        assert_eq!(item.price_range, "No Price");
        assert_eq!(item.cuisines, vec!["Japanese", "Kaiseki"]);
        assert_eq!(item.lat, "35.668123");
        assert_eq!(item.city_area, "Shimbashi");
    }

    #[test]
    fn michelin_item_passes_text_fields_through() {
        let record = MichelinRecord {
            id: 2,
            name: "Narisawa".into(),
            cuisines: "Innovative".into(),
            lat: 35.67,
            lng: 139.72,
            area: "Minami-Aoyama".into(),
            region: "Tokyo".into(),
            rank: "2 Stars".into(),
            price_category: "¥¥¥¥".into(),
            image: "narisawa.jpg".into(),
            url: "/restaurant/tokyo/narisawa".into(),
        };
        let item = record.into_item();
        assert_eq!(item.rank, "2 Stars");
        assert_eq!(item.price_range, "¥¥¥¥");
        assert_eq!(item.city_area, "Minami-Aoyama");
        assert_eq!(
            item.url,
            "https://guide.michelin.com/restaurant/tokyo/narisawa"
        );
    }

    #[test]
    fn meta_item_url_follows_source() {
        let record = MetaRecord {
            id: 5,
            name: "X".into(),
            cuisines: String::new(),
            lat: 1.5,
            lng: 2.5,
            image: String::new(),
            url: "/restaurant/x".into(),
        };
        let michelin = record.clone().into_meta_item(Source::Michelin);
        assert_eq!(michelin.url, "https://guide.michelin.com/restaurant/x");
        assert_eq!(michelin.cuisines, vec![""]);

        let tabelog = record.into_meta_item(Source::Tabelog);
        assert_eq!(tabelog.url, "/restaurant/x");
    }
}
