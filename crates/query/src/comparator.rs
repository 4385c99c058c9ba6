//! Sort orders over canonical listings.
//!
//! Missing values always sort last: ascending orders read them as `+inf`,
//! descending orders as `-inf`.

use std::borrow::Borrow;
use std::cmp::Ordering;

use autolist_model::{Listing, SortKey};

/// A total order over listings for one `SortKey`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingComparator {
    sort: SortKey,
}

pub fn build_comparator(sort: SortKey) -> ListingComparator {
    ListingComparator { sort }
}

#[derive(Clone, Copy)]
enum Direction {
    Asc,
    Desc,
}

impl ListingComparator {
    pub fn sort_key(&self) -> SortKey {
        self.sort
    }

    pub fn compare(&self, a: &Listing, b: &Listing) -> Ordering {
        let field = |l: &Listing| -> Option<f64> {
            match self.sort {
                SortKey::Relevance => None,
                SortKey::PriceAsc | SortKey::PriceDesc => l.price,
                SortKey::YearAsc | SortKey::YearDesc => l.year.map(f64::from),
                SortKey::MileageAsc | SortKey::MileageDesc => l.mileage,
            }
        };
        match self.sort {
            SortKey::Relevance => Ordering::Equal,
            SortKey::PriceAsc | SortKey::YearAsc | SortKey::MileageAsc => {
                by_key(field(a), field(b), Direction::Asc)
            }
            SortKey::PriceDesc | SortKey::YearDesc | SortKey::MileageDesc => {
                by_key(field(a), field(b), Direction::Desc)
            }
        }
    }

    /// Stable in-place sort over owned or borrowed listings; `Relevance`
    /// leaves the order untouched.
    pub fn sort<L: Borrow<Listing>>(&self, listings: &mut [L]) {
        if self.sort == SortKey::Relevance {
            return;
        }
        listings.sort_by(|a, b| self.compare(a.borrow(), b.borrow()));
    }
}

fn by_key(a: Option<f64>, b: Option<f64>, direction: Direction) -> Ordering {
    match direction {
        Direction::Asc => extreme(a, f64::INFINITY).total_cmp(&extreme(b, f64::INFINITY)),
        Direction::Desc => {
            extreme(b, f64::NEG_INFINITY).total_cmp(&extreme(a, f64::NEG_INFINITY))
        }
    }
}

/// Missing and NaN values become `fill`.
fn extreme(value: Option<f64>, fill: f64) -> f64 {
    value.filter(|v| !v.is_nan()).unwrap_or(fill)
}
