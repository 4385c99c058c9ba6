//! Listing normalization for heterogeneous upstream sources.
//!
//! Provides the canonicalizer that turns any raw record into a `Listing`,
//! and the response adapter (`envelope`) that unwraps collection responses:
//! - Priority fallback chains per canonical field
//! - Image union with first-seen deduplication
//! - Suppression of internal-only source tags

use std::collections::{BTreeSet, HashSet};

use autolist_model::{number_of, text_of, Listing, RawListing, CANONICAL_KEYS};
use serde_json::Value;

pub mod envelope;

pub use envelope::{adapt, adapt_listings, adapt_values, AdaptError, ResponseShape};

const ID_KEYS: &[&str] = &["id", "_id", "vin", "lot_number", "url"];
const YEAR_KEYS: &[&str] = &["year", "model_year"];
const MAKE_KEYS: &[&str] = &["make", "brand", "manufacturer"];
const MODEL_KEYS: &[&str] = &["model", "series"];
const PRICE_KEYS: &[&str] = &["price", "current_bid", "buy_now_price"];
const MILEAGE_KEYS: &[&str] = &["mileage", "odometer"];
const SOURCE_KEYS: &[&str] = &["source", "market"];
const STATUS_KEYS: &[&str] = &["auction_status", "status"];

/// Single-URL image fields, highest priority first.
const IMAGE_KEYS: &[&str] = &["main_image", "image_url", "image", "thumbnail", "photo_url"];
const IMAGE_COLLECTION_KEY: &str = "images";
/// JSON-encoded or delimiter-separated secondary image list.
const IMAGE_BLOB_KEY: &str = "image_list";

/// Raw trim values that mean "no trim".
const BLANK_TRIMS: &[&str] = &["null", "None"];

const FALLBACK_TITLE: &str = "Car";

/// Source tags that must never be shown publicly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenSources {
    tags: BTreeSet<String>,
}

impl Default for HiddenSources {
    fn default() -> Self {
        Self::new(["json_import"])
    }
}

impl HiddenSources {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tags: tags
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            tags: BTreeSet::new(),
        }
    }

    pub fn with(mut self, tag: impl AsRef<str>) -> Self {
        self.tags.insert(tag.as_ref().trim().to_lowercase());
        self
    }

    /// `tag` must already be lower-cased and trimmed.
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Converts raw records into canonical listings.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    hidden_sources: HiddenSources,
}

impl Normalizer {
    pub fn new(hidden_sources: HiddenSources) -> Self {
        Self { hidden_sources }
    }

    /// Normalize one record. Never fails: unresolvable fields become `None`.
    pub fn normalize(&self, mut raw: RawListing) -> Listing {
        let year = first_of(&raw, YEAR_KEYS, year_of);
        let make = first_of(&raw, MAKE_KEYS, text_of);
        let model = first_of(&raw, MODEL_KEYS, text_of);
        let trim = raw
            .get("trim")
            .and_then(text_of)
            .filter(|t| !BLANK_TRIMS.contains(&t.as_str()));

        let title = raw
            .get("title")
            .and_then(text_of)
            .or_else(|| compose_title(year, &make, &model, &trim))
            .unwrap_or_else(|| FALLBACK_TITLE.to_string());

        let id = first_of(&raw, ID_KEYS, text_of)
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

        let price = first_of(&raw, PRICE_KEYS, number_of);
        let mileage = first_of(&raw, MILEAGE_KEYS, number_of);
        let location = raw.get("location").and_then(text_of).or_else(|| {
            join_present(&[raw.get("city"), raw.get("state")], ", ")
        });

        let (source, source_hidden) = self.resolve_source(&raw);
        let images = collect_images(&raw);
        let status = first_of(&raw, STATUS_KEYS, text_of).map(|s| s.to_uppercase());

        for key in CANONICAL_KEYS {
            raw.remove(*key);
        }
        for key in SOURCE_KEYS {
            if source_hidden || self.is_hidden(raw.get(*key)) {
                raw.remove(*key);
            }
        }

        Listing {
            id,
            title,
            year,
            make,
            model,
            trim,
            price,
            mileage,
            location,
            source,
            source_hidden,
            images,
            status,
            extra: raw,
        }
    }

    /// Any value under a source key naming an internal-only channel.
    fn is_hidden(&self, value: Option<&Value>) -> bool {
        value
            .and_then(text_of)
            .is_some_and(|tag| self.hidden_sources.contains(&tag.to_lowercase()))
    }

    fn resolve_source(&self, raw: &RawListing) -> (Option<String>, bool) {
        match first_of(raw, SOURCE_KEYS, text_of).map(|s| s.to_lowercase()) {
            Some(tag) if self.hidden_sources.contains(&tag) => (Some(String::new()), true),
            Some(tag) => (Some(tag), false),
            // An already-canonical record keeps its suppression marker.
            None if raw.get("source_hidden") == Some(&Value::Bool(true)) => {
                (Some(String::new()), true)
            }
            None => (None, false),
        }
    }
}

/// Normalize with the default hidden-source list.
pub fn normalize(raw: RawListing) -> Listing {
    Normalizer::default().normalize(raw)
}

/// First key in `keys` whose value `read` accepts.
fn first_of<T>(raw: &RawListing, keys: &[&str], read: impl Fn(&Value) -> Option<T>) -> Option<T> {
    keys.iter().find_map(|key| raw.get(*key).and_then(&read))
}

fn year_of(value: &Value) -> Option<i32> {
    number_of(value)
        .filter(|n| n.fract() == 0.0 && *n >= i32::MIN as f64 && *n <= i32::MAX as f64)
        .map(|n| n as i32)
}

fn compose_title(
    year: Option<i32>,
    make: &Option<String>,
    model: &Option<String>,
    trim: &Option<String>,
) -> Option<String> {
    let parts: Vec<String> = year
        .map(|y| y.to_string())
        .into_iter()
        .chain(make.iter().cloned())
        .chain(model.iter().cloned())
        .chain(trim.iter().cloned())
        .collect();
    (!parts.is_empty()).then(|| parts.join(" "))
}

fn join_present(values: &[Option<&Value>], sep: &str) -> Option<String> {
    let parts: Vec<String> = values.iter().flatten().filter_map(|v| text_of(v)).collect();
    (!parts.is_empty()).then(|| parts.join(sep))
}

/// Union of every image field in priority order, first occurrence wins.
fn collect_images(raw: &RawListing) -> Vec<String> {
    let singles = IMAGE_KEYS
        .iter()
        .filter_map(|key| raw.get(*key).and_then(Value::as_str).map(str::to_string));
    let collection = raw
        .get(IMAGE_COLLECTION_KEY)
        .map(image_collection)
        .unwrap_or_default();
    let blob = raw.get(IMAGE_BLOB_KEY).map(image_blob).unwrap_or_default();

    dedup_images(singles.chain(collection).chain(blob))
}

fn dedup_images(urls: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .filter(|u| seen.insert(u.clone()))
        .collect()
}

fn image_collection(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Parse a secondary image list: a JSON array, a JSON string, or a plain
/// string separated by newlines or commas. Text that parses as any other
/// JSON value (`null`, numbers, booleans, objects) holds no images.
pub fn image_blob(value: &Value) -> Vec<String> {
    match value {
        Value::Array(_) => image_collection(value),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(parsed @ Value::Array(_)) => image_collection(&parsed),
            Ok(Value::String(single)) => vec![single],
            Ok(_) => Vec::new(),
            Err(_) => text
                .split(['\n', '\r', ','])
                .map(str::to_string)
                .collect(),
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn raw(value: Value) -> RawListing {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_empty_record_is_total() {
        let listing = normalize(RawListing::new());
        assert_eq!(listing.title, "Car");
        assert!(!listing.id.is_empty());
        assert_eq!(listing.year, None);
        assert_eq!(listing.make, None);
        assert_eq!(listing.model, None);
        assert_eq!(listing.trim, None);
        assert_eq!(listing.price, None);
        assert_eq!(listing.mileage, None);
        assert_eq!(listing.location, None);
        assert_eq!(listing.source, None);
        assert!(!listing.source_hidden);
        assert_eq!(listing.status, None);
        assert!(listing.images.is_empty());
        assert!(listing.extra.is_empty());
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = normalize(RawListing::new());
        let b = normalize(RawListing::new());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_year_fallback_chain() {
        assert_eq!(normalize(raw(json!({"year": 2020, "model_year": 1999}))).year, Some(2020));
        assert_eq!(normalize(raw(json!({"model_year": 1999}))).year, Some(1999));
        assert_eq!(normalize(raw(json!({"year": "2004"}))).year, Some(2004));
        assert_eq!(normalize(raw(json!({"year": "n/a", "model_year": 1999}))).year, Some(1999));
    }

    #[test]
    fn test_id_fallback_chain() {
        assert_eq!(normalize(raw(json!({"id": 42, "vin": "V1"}))).id, "42");
        assert_eq!(normalize(raw(json!({"_id": "ext-9", "vin": "V1"}))).id, "ext-9");
        assert_eq!(normalize(raw(json!({"vin": "V1", "lot_number": "L7"}))).id, "V1");
        assert_eq!(normalize(raw(json!({"lot_number": "L7"}))).id, "L7");
        assert_eq!(
            normalize(raw(json!({"url": "https://example.com/lot/1"}))).id,
            "https://example.com/lot/1"
        );
    }

    #[test]
    fn test_make_model_price_mileage_chains() {
        let listing = normalize(raw(json!({
            "brand": "Porsche",
            "manufacturer": "VW",
            "series": 911,
            "current_bid": 85000,
            "buy_now_price": 99000,
            "odometer": "12000"
        })));
        assert_eq!(listing.make.as_deref(), Some("Porsche"));
        assert_eq!(listing.model.as_deref(), Some("911"));
        assert_eq!(listing.price, Some(85000.0));
        assert_eq!(listing.mileage, Some(12000.0));
    }

    #[test]
    fn test_title_composition() {
        let listing = normalize(raw(json!({
            "year": 2018, "make": "Honda", "model": "Civic", "trim": "EX"
        })));
        assert_eq!(listing.title, "2018 Honda Civic EX");

        let listing = normalize(raw(json!({"make": "Honda", "trim": "None"})));
        assert_eq!(listing.title, "Honda");
        assert_eq!(listing.trim, None);

        let listing = normalize(raw(json!({"title": "  ", "model": "Focus"})));
        assert_eq!(listing.title, "Focus");

        let listing = normalize(raw(json!({"title": "Demo Ford Focus", "model": "Focus"})));
        assert_eq!(listing.title, "Demo Ford Focus");
    }

    #[test]
    fn test_blank_trim_sentinels() {
        for sentinel in [json!(""), json!("null"), json!("None"), json!(null)] {
            let listing = normalize(raw(json!({"trim": sentinel})));
            assert_eq!(listing.trim, None);
        }
        assert_eq!(normalize(raw(json!({"trim": "GT3"}))).trim.as_deref(), Some("GT3"));
    }

    #[test]
    fn test_location_from_city_state() {
        let listing = normalize(raw(json!({"city": "Austin", "state": "TX"})));
        assert_eq!(listing.location.as_deref(), Some("Austin, TX"));

        let listing = normalize(raw(json!({"city": "", "state": "TX"})));
        assert_eq!(listing.location.as_deref(), Some("TX"));

        let listing = normalize(raw(json!({"city": " ", "state": null})));
        assert_eq!(listing.location, None);

        let listing = normalize(raw(json!({"location": "Denver, CO", "city": "Austin"})));
        assert_eq!(listing.location.as_deref(), Some("Denver, CO"));
    }

    #[test]
    fn test_source_suppression() {
        let hidden = normalize(raw(json!({"source": "JSON_IMPORT"})));
        assert_eq!(hidden.source.as_deref(), Some(""));
        assert!(hidden.source_hidden);

        let visible = normalize(raw(json!({"source": " CarsAndBids "})));
        assert_eq!(visible.source.as_deref(), Some("carsandbids"));
        assert!(!visible.source_hidden);

        let from_market = normalize(raw(json!({"market": "json_import"})));
        assert!(from_market.source_hidden);
        assert!(!from_market.extra.contains_key("market"));
    }

    #[test]
    fn test_hidden_market_behind_visible_source_is_dropped() {
        let listing = normalize(raw(json!({"source": "CarsAndBids", "market": "JSON_IMPORT"})));
        assert_eq!(listing.source.as_deref(), Some("carsandbids"));
        assert!(!listing.source_hidden);
        assert!(!listing.extra.contains_key("market"));

        let value = serde_json::to_value(&listing).unwrap();
        assert!(!value.to_string().to_lowercase().contains("json_import"));

        let listing = normalize(raw(json!({"source": "bat", "market": "us-west"})));
        assert_eq!(listing.extra.get("market"), Some(&json!("us-west")));
    }

    #[test]
    fn test_hidden_sources_are_injectable() {
        let normalizer = Normalizer::new(HiddenSources::default().with("Staging"));
        let listing = normalizer.normalize(raw(json!({"source": "staging"})));
        assert!(listing.source_hidden);

        let normalizer = Normalizer::new(HiddenSources::empty());
        let listing = normalizer.normalize(raw(json!({"source": "json_import"})));
        assert_eq!(listing.source.as_deref(), Some("json_import"));
        assert!(!listing.source_hidden);
    }

    #[test]
    fn test_image_union_dedup() {
        let listing = normalize(raw(json!({"image": "a.jpg", "images": ["a.jpg", "b.jpg"]})));
        assert_eq!(listing.images, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_image_priority_order() {
        let listing = normalize(raw(json!({
            "photo_url": "e.jpg",
            "thumbnail": "d.jpg",
            "image": "c.jpg",
            "image_url": "b.jpg",
            "main_image": "a.jpg",
            "images": ["f.jpg", "", "a.jpg"],
            "image_list": "g.jpg\nh.jpg, b.jpg"
        })));
        assert_eq!(
            listing.images,
            vec!["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg", "f.jpg", "g.jpg", "h.jpg"]
        );
        assert_eq!(listing.primary_image(), Some("a.jpg"));
    }

    #[test]
    fn test_image_blob_forms() {
        assert_eq!(image_blob(&json!("[\"x.jpg\", \"y.jpg\"]")), vec!["x.jpg", "y.jpg"]);
        assert_eq!(image_blob(&json!("\"x.jpg\"")), vec!["x.jpg"]);
        assert_eq!(image_blob(&json!("x.jpg")), vec!["x.jpg"]);
        assert_eq!(image_blob(&json!("x.jpg,y.jpg")), vec!["x.jpg", "y.jpg"]);
        assert_eq!(image_blob(&json!(["x.jpg"])), vec!["x.jpg"]);
        assert!(image_blob(&json!(12)).is_empty());
        for scalar in ["null", "42", "true", "{\"url\": \"x.jpg\"}"] {
            assert!(image_blob(&json!(scalar)).is_empty(), "{scalar}");
        }

        let listing = normalize(raw(json!({"image_list": "null"})));
        assert!(listing.images.is_empty());
        assert_eq!(listing.primary_image(), None);
    }

    #[test]
    fn test_status_upper_cased() {
        let listing = normalize(raw(json!({"auction_status": "sold"})));
        assert_eq!(listing.status.as_deref(), Some("SOLD"));
        assert!(listing.is_sold());
        assert_eq!(normalize(raw(json!({"auction_status": ""}))).status, None);
    }

    #[test]
    fn test_pass_through_fields() {
        let listing = normalize(raw(json!({
            "vin": "WP0ZZZ", "engine": "3.0L flat-6", "model_year": 2019, "year": 2019
        })));
        assert_eq!(listing.extra.get("engine"), Some(&json!("3.0L flat-6")));
        assert_eq!(listing.extra.get("model_year"), Some(&json!(2019)));
        assert!(!listing.extra.contains_key("year"));
        assert_eq!(listing.vin().as_deref(), Some("WP0ZZZ"));
    }

    #[test]
    fn test_renormalizing_is_idempotent() {
        let samples = [
            json!({}),
            json!({"source": "JSON_IMPORT", "market": "json_import", "year": "1999"}),
            json!({
                "_id": "x", "model_year": 2001, "brand": "BMW", "series": "M3",
                "trim": "null", "current_bid": "41000", "odometer": 88000,
                "city": "Austin", "state": "TX", "market": "CarsAndBids",
                "main_image": "a.jpg", "images": ["b.jpg", "a.jpg"],
                "image_list": "[\"c.jpg\"]", "auction_status": "live", "engine": "S54"
            }),
        ];
        for sample in samples {
            let first = normalize(raw(sample));
            let second = normalize(first.to_raw());
            assert_eq!(second, first);
        }
    }
}
