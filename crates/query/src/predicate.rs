//! Filter predicates over canonical listings.

use autolist_model::{Listing, QueryFilters};

/// A compiled `QueryFilters`: needles are pre-trimmed and lower-cased, blank
/// strings are dropped. All constraints are combined with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPredicate {
    text: Option<String>,
    vin: Option<String>,
    make: Option<String>,
    model: Option<String>,
    year_min: Option<i32>,
    year_max: Option<i32>,
    price_min: Option<f64>,
    price_max: Option<f64>,
    source: Option<String>,
    dealership_id: Option<String>,
}

/// Compile filters into a predicate. Never fails.
pub fn build_predicate(filters: &QueryFilters) -> ListingPredicate {
    ListingPredicate {
        text: needle(&filters.q),
        vin: needle(&filters.vin),
        make: needle(&filters.make),
        model: needle(&filters.model),
        year_min: filters.year_min,
        year_max: filters.year_max,
        price_min: filters.price_min.filter(|p| !p.is_nan()),
        price_max: filters.price_max.filter(|p| !p.is_nan()),
        source: needle(&filters.source),
        dealership_id: filters
            .dealership_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string),
    }
}

fn needle(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

impl ListingPredicate {
    /// True when no constraint is set.
    pub fn is_unconstrained(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        self.matches_text(listing)
            && self
                .vin
                .as_deref()
                .map_or(true, |n| contains_ci(listing.vin().as_deref(), n))
            && self
                .make
                .as_deref()
                .map_or(true, |n| contains_ci(listing.make.as_deref(), n))
            && self
                .model
                .as_deref()
                .map_or(true, |n| contains_ci(listing.model.as_deref(), n))
            && self.matches_year(listing)
            && self.matches_price(listing)
            && self
                .source
                .as_deref()
                .map_or(true, |n| listing.source.as_deref().unwrap_or("").contains(n))
            && self
                .dealership_id
                .as_deref()
                .map_or(true, |id| listing.dealership_id().as_deref() == Some(id))
    }

    fn matches_text(&self, listing: &Listing) -> bool {
        let Some(text) = self.text.as_deref() else {
            return true;
        };
        let vin = listing.vin();
        let lot = listing.lot_number();
        let haystack = [
            Some(listing.title.as_str()),
            listing.make.as_deref(),
            listing.model.as_deref(),
            listing.trim.as_deref(),
            listing.location.as_deref(),
            vin.as_deref(),
            lot.as_deref(),
            listing.source.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
        haystack.contains(text)
    }

    /// An unknown year fails a lower bound and passes an upper bound.
    fn matches_year(&self, listing: &Listing) -> bool {
        let lower = self
            .year_min
            .map_or(true, |min| listing.year.is_some_and(|y| y >= min));
        let upper = self
            .year_max
            .map_or(true, |max| listing.year.map_or(true, |y| y <= max));
        lower && upper
    }

    /// An unknown price fails either bound.
    fn matches_price(&self, listing: &Listing) -> bool {
        let price = listing.price.filter(|p| !p.is_nan());
        let lower = self
            .price_min
            .map_or(true, |min| price.is_some_and(|p| p >= min));
        let upper = self
            .price_max
            .map_or(true, |max| price.is_some_and(|p| p <= max));
        lower && upper
    }
}
