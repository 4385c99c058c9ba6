//! Core domain model for the autolist vehicle catalog.
//!
//! This crate defines the fundamental types used throughout the system:
//! - `RawListing`: an un-normalized record as received from an upstream source
//! - `Listing`: the canonical, stable-shape view of a raw listing
//! - `QueryFilters` / `SortKey` / `Paging`: the inputs of a catalog query
//! - `Page`: one slice of a query result
//! - `Dealership` / `SiteSettings`: display context joined onto listings

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Default number of listings per page when neither the caller nor the
/// site settings supply one.
pub const DEFAULT_PAGE_SIZE: usize = 12;

/// An upstream listing record with no fixed schema.
pub type RawListing = Map<String, Value>;

/// Keys the canonical `Listing` owns. Raw fields with these names are
/// replaced by their canonical values rather than passed through.
pub const CANONICAL_KEYS: &[&str] = &[
    "id",
    "title",
    "year",
    "make",
    "model",
    "trim",
    "price",
    "mileage",
    "location",
    "source",
    "source_hidden",
    "images",
    "status",
];

/// Render a scalar JSON value as trimmed, non-empty text.
///
/// Strings are trimmed; integral numbers print without a fractional part.
/// Everything else (null, bool, arrays, objects, blank strings) is `None`.
pub fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().filter(|f| f.is_finite()).map(|f| {
                    if f.fract() == 0.0 && f.abs() < 1e15 {
                        format!("{}", f as i64)
                    } else {
                        f.to_string()
                    }
                })
            }
        }
        _ => None,
    }
}

/// Read a JSON value as a finite number, accepting numeric strings.
pub fn number_of(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// A normalized vehicle listing.
///
/// This is the canonical representation consumed by every query and display
/// path. Produced by `autolist-normalize`; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Stable identity within a rendered collection
    pub id: String,

    /// Display title, never blank
    pub title: String,

    #[serde(default)]
    pub year: Option<i32>,

    #[serde(default)]
    pub make: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub trim: Option<String>,

    /// Asking price, current bid or buy-now price
    #[serde(default)]
    pub price: Option<f64>,

    #[serde(default)]
    pub mileage: Option<f64>,

    #[serde(default)]
    pub location: Option<String>,

    /// Lower-cased source/market tag; `Some("")` when suppressed
    #[serde(default)]
    pub source: Option<String>,

    /// Whether the source tag was an internal-only channel
    #[serde(default)]
    pub source_hidden: bool,

    /// Image URLs in priority order, deduplicated
    #[serde(default)]
    pub images: Vec<String>,

    /// Upper-cased auction/listing status
    #[serde(default)]
    pub status: Option<String>,

    /// Source-specific fields passed through verbatim
    #[serde(flatten)]
    pub extra: RawListing,
}

impl Listing {
    /// Create a minimal listing for testing.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            year: None,
            make: None,
            model: None,
            trim: None,
            price: None,
            mileage: None,
            location: None,
            source: None,
            source_hidden: false,
            images: Vec::new(),
            status: None,
            extra: RawListing::new(),
        }
    }

    /// The first image, used as the card thumbnail.
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// A pass-through field rendered as text.
    pub fn extra_text(&self, key: &str) -> Option<String> {
        self.extra.get(key).and_then(text_of)
    }

    pub fn vin(&self) -> Option<String> {
        self.extra_text("vin")
    }

    pub fn lot_number(&self) -> Option<String> {
        self.extra_text("lot_number")
    }

    /// The raw dealership identifier, as text regardless of its JSON type.
    pub fn dealership_id(&self) -> Option<String> {
        self.extra_text("dealership_id")
    }

    /// Whether the listing should carry a "SOLD" ribbon.
    pub fn is_sold(&self) -> bool {
        self.status.as_deref() == Some("SOLD")
    }

    /// Flatten back into a raw record: pass-through fields plus the
    /// canonical fields under their canonical keys.
    pub fn to_raw(&self) -> RawListing {
        let mut raw = self.extra.clone();
        raw.insert("id".into(), Value::from(self.id.clone()));
        raw.insert("title".into(), Value::from(self.title.clone()));
        raw.insert("year".into(), self.year.map_or(Value::Null, Value::from));
        raw.insert("make".into(), opt_text(&self.make));
        raw.insert("model".into(), opt_text(&self.model));
        raw.insert("trim".into(), opt_text(&self.trim));
        raw.insert("price".into(), self.price.map_or(Value::Null, Value::from));
        raw.insert("mileage".into(), self.mileage.map_or(Value::Null, Value::from));
        raw.insert("location".into(), opt_text(&self.location));
        raw.insert("source".into(), opt_text(&self.source));
        raw.insert("source_hidden".into(), Value::Bool(self.source_hidden));
        raw.insert(
            "images".into(),
            Value::Array(self.images.iter().cloned().map(Value::from).collect()),
        );
        raw.insert("status".into(), opt_text(&self.status));
        raw
    }
}

fn opt_text(value: &Option<String>) -> Value {
    value.clone().map_or(Value::Null, Value::from)
}

/// Sort orders exposed to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum SortKey {
    /// Input order, untouched
    #[default]
    Relevance,
    PriceAsc,
    PriceDesc,
    YearAsc,
    YearDesc,
    MileageAsc,
    MileageDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 7] = [
        Self::Relevance,
        Self::PriceAsc,
        Self::PriceDesc,
        Self::YearAsc,
        Self::YearDesc,
        Self::MileageAsc,
        Self::MileageDesc,
    ];

    /// Wire name, as sent in the `sort` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::YearAsc => "year_asc",
            Self::YearDesc => "year_desc",
            Self::MileageAsc => "mileage_asc",
            Self::MileageDesc => "mileage_desc",
        }
    }
}

/// Unknown names fall back to `Relevance`.
impl From<&str> for SortKey {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "price_asc" => Self::PriceAsc,
            "price_desc" => Self::PriceDesc,
            "year_asc" => Self::YearAsc,
            "year_desc" => Self::YearDesc,
            "mileage_asc" => Self::MileageAsc,
            "mileage_desc" => Self::MileageDesc,
            _ => Self::Relevance,
        }
    }
}

impl From<String> for SortKey {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter parameters for a catalog query.
///
/// Every field is independently optional; `None` means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFilters {
    /// Free-text query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_min: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_max: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,

    /// Source/market tag (substring match)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dealership_id: Option<String>,
}

impl QueryFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    pub fn with_vin(mut self, vin: impl Into<String>) -> Self {
        self.vin = Some(vin.into());
        self
    }

    pub fn with_make(mut self, make: impl Into<String>) -> Self {
        self.make = Some(make.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_year_range(mut self, min: Option<i32>, max: Option<i32>) -> Self {
        self.year_min = min;
        self.year_max = max;
        self
    }

    pub fn with_price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.price_min = min;
        self.price_max = max;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_dealership(mut self, dealership_id: impl Into<String>) -> Self {
        self.dealership_id = Some(dealership_id.into());
        self
    }
}

/// Errors from constructing paging parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PagingError {
    #[error("Page numbers start at 1")]
    ZeroPage,
    #[error("Page size must be at least 1")]
    ZeroPageSize,
}

/// A requested page: 1-based page number and page size, both at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    page: usize,
    page_size: usize,
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Paging {
    pub fn new(page: usize, page_size: usize) -> Result<Self, PagingError> {
        if page == 0 {
            return Err(PagingError::ZeroPage);
        }
        if page_size == 0 {
            return Err(PagingError::ZeroPageSize);
        }
        Ok(Self { page, page_size })
    }

    /// The first page at the given size.
    pub fn first(page_size: usize) -> Result<Self, PagingError> {
        Self::new(1, page_size)
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Index of the first item on this page.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// One page of a query result.
///
/// Field names match the upstream envelope (`page_size`), so pages and the
/// listings inside them share one snake_case convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,

    /// Size of the full (filtered, unsliced) result
    pub total: usize,

    /// 1-based page number
    pub page: usize,

    pub page_size: usize,
}

impl<T> Page<T> {
    /// Number of pages, never less than 1 even for an empty result.
    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.page_size.max(1)).max(1)
    }

    pub fn is_last_page(&self) -> bool {
        self.page >= self.page_count()
    }

    /// Convert the items while keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// A dealership or dealer group that listings can belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dealership {
    /// Identifier as text; numeric ids are accepted
    #[serde(deserialize_with = "scalar_id")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn scalar_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    text_of(&value).ok_or_else(|| serde::de::Error::custom("dealership id must be a string or number"))
}

/// Keyed lookup from dealership id to record.
#[derive(Debug, Clone, Default)]
pub struct DealershipIndex {
    by_id: HashMap<String, Dealership>,
}

impl DealershipIndex {
    pub fn get(&self, id: &str) -> Option<&Dealership> {
        self.by_id.get(id)
    }

    /// Resolve a listing's `dealership_id`.
    pub fn lookup(&self, listing: &Listing) -> Option<&Dealership> {
        listing.dealership_id().and_then(|id| self.get(&id))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl FromIterator<Dealership> for DealershipIndex {
    fn from_iter<I: IntoIterator<Item = Dealership>>(iter: I) -> Self {
        Self {
            by_id: iter.into_iter().map(|d| (d.id.clone(), d)).collect(),
        }
    }
}

/// Public site settings served by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_tagline: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SiteSettings {
    /// Configured page size, falling back to `DEFAULT_PAGE_SIZE` when
    /// missing, non-numeric or not positive.
    pub fn effective_page_size(&self) -> usize {
        self.extra
            .get("default_page_size")
            .and_then(number_of)
            .filter(|n| *n >= 1.0)
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }
}
