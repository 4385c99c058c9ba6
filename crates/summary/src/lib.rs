//! Display-ready summaries of canonical listings.
//!
//! Turns listings into the pieces a detail or list view needs without any
//! further normalization: detail-table rows, status labels, bullet lists from
//! free-text blobs, one-line headlines and catalog KPIs.

use std::collections::HashSet;

use autolist_model::{text_of, Listing, Page};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder for values that are missing.
pub const MISSING: &str = "—";

/// Detail-table rows in display order; VIN stays last.
const DETAIL_FIELDS: &[(&str, &str)] = &[
    ("Year", "year"),
    ("Make", "make"),
    ("Model", "model"),
    ("Trim", "trim"),
    ("Body", "body_type"),
    ("Engine", "engine"),
    ("Fuel", "fuel_type"),
    ("Transmission", "transmission"),
    ("Drivetrain", "drivetrain"),
    ("Exterior", "exterior_color"),
    ("Interior", "interior_color"),
    ("Mileage", "mileage"),
    ("Price", "price"),
    ("Currency", "currency"),
    ("Location", "location"),
    ("City", "city"),
    ("State", "state"),
    ("Seller", "seller_name"),
    ("Seller Type", "seller_type"),
    ("Auction", "auction_status"),
    ("Lot #", "lot_number"),
    ("Views", "number_of_views"),
    ("Bids", "number_of_bids"),
    ("Posted", "posted_at"),
    ("Ends", "end_time"),
    ("VIN", "vin"),
];

/// One labelled row of the detail table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRow {
    pub label: String,
    pub key: String,
    pub value: String,
}

/// Rows for every detail field the listing has a value for.
pub fn detail_rows(listing: &Listing) -> Vec<DetailRow> {
    DETAIL_FIELDS
        .iter()
        .filter_map(|(label, key)| {
            field_text(listing, key).map(|value| DetailRow {
                label: label.to_string(),
                key: key.to_string(),
                value,
            })
        })
        .collect()
}

/// Canonical fields take precedence over pass-through ones.
fn field_text(listing: &Listing, key: &str) -> Option<String> {
    match key {
        "year" => listing.year.map(|y| y.to_string()),
        "make" => listing.make.clone(),
        "model" => listing.model.clone(),
        "trim" => listing.trim.clone(),
        "mileage" => listing.mileage.and_then(|m| text_of(&Value::from(m))),
        "price" => listing.price.and_then(|p| text_of(&Value::from(p))),
        "location" => listing.location.clone(),
        _ => listing.extra_text(key),
    }
}

/// Human label for an auction/listing status.
pub fn status_label(status: &str) -> String {
    let folded = status
        .trim()
        .to_uppercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    match folded.as_str() {
        "RESERVE_NOT_MET" => "Reserve not met".to_string(),
        "SOLD" => "Sold".to_string(),
        "LIVE" => "Live".to_string(),
        "ENDED" => "Ended".to_string(),
        "" => MISSING.to_string(),
        _ => status.to_string(),
    }
}

/// Split a free-text blob (highlights, equipment, flaws...) into items.
///
/// Arrays are taken item by item. Strings split on line breaks and bullet
/// markers; duplicates are dropped case-insensitively, first one wins.
pub fn to_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                other => text_of(other),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(text) => {
            let mut seen = HashSet::new();
            text.split(['\n', '\r', '\u{2022}', '*'])
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .filter(|part| seen.insert(part.to_lowercase()))
                .map(str::to_string)
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Group an integer part with thousands separators.
fn group_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{}", rounded.abs() as u64);
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0.0 {
        format!("-{out}")
    } else {
        out
    }
}

pub fn format_price(price: Option<f64>) -> String {
    price.map_or_else(|| MISSING.to_string(), |p| format!("${}", group_thousands(p)))
}

pub fn format_mileage(mileage: Option<f64>) -> String {
    mileage.map_or_else(|| MISSING.to_string(), |m| format!("{} mi", group_thousands(m)))
}

/// A one-line description for list output.
pub fn headline(listing: &Listing) -> String {
    let mut parts = vec![
        listing.title.clone(),
        format_price(listing.price),
        format_mileage(listing.mileage),
    ];
    if let Some(location) = &listing.location {
        parts.push(location.clone());
    }
    if let Some(source) = listing.source.as_deref().filter(|s| !s.is_empty()) {
        parts.push(source.to_string());
    }
    let line = parts.join(" · ");
    if listing.is_sold() {
        format!("{line} [SOLD]")
    } else {
        line
    }
}

/// Headline numbers for a page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogKpis {
    pub total: usize,
    pub avg_price: Option<f64>,
    pub latest_posted: Option<String>,
}

pub fn catalog_kpis(page: &Page<Listing>) -> CatalogKpis {
    let prices: Vec<f64> = page.items.iter().filter_map(|l| l.price).collect();
    let avg_price = (!prices.is_empty()).then(|| prices.iter().sum::<f64>() / prices.len() as f64);
    CatalogKpis {
        total: page.total,
        avg_price,
        latest_posted: page.items.iter().find_map(|l| l.extra_text("posted_at")),
    }
}
