//! Catalog query execution and translation.
//!
//! Runs filter → sort → paginate over canonical listings on the client, and
//! translates the same query into the remote endpoint's parameters:
//! - `build_predicate`: `QueryFilters` → `ListingPredicate`
//! - `build_comparator`: `SortKey` → `ListingComparator`
//! - `run_query`: the full pipeline, also the reference semantics the
//!   remote endpoint is expected to match
//! - `QueryState`: caller-side state that resets to page 1 on changes

use autolist_model::{Listing, Page, Paging, PagingError, QueryFilters, SortKey};
use thiserror::Error;

pub mod comparator;
pub mod dialect;
pub mod predicate;

pub use comparator::{build_comparator, ListingComparator};
pub use dialect::{HttpParamsDialect, ListingQuery, Pagination, QueryDialect};
pub use predicate::{build_predicate, ListingPredicate};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Invalid paging: {0}")]
    Paging(#[from] PagingError),
    #[error("Limit must be at least 1")]
    ZeroLimit,
}

/// Filter, stably sort and slice `listings`.
///
/// `total` is the filtered count before slicing. The requested page is
/// never clamped: a page past the end yields no items.
pub fn run_query(
    listings: &[Listing],
    filters: &QueryFilters,
    sort: SortKey,
    paging: Paging,
) -> Page<Listing> {
    let predicate = build_predicate(filters);
    let comparator = build_comparator(sort);

    let mut matched: Vec<&Listing> = listings.iter().filter(|l| predicate.matches(l)).collect();
    comparator.sort(&mut matched);

    let total = matched.len();
    let items = matched
        .into_iter()
        .skip(paging.offset())
        .take(paging.page_size())
        .cloned()
        .collect();

    Page {
        items,
        total,
        page: paging.page(),
        page_size: paging.page_size(),
    }
}

/// The caller's side of a paginated catalog view.
///
/// Changing filters, sort or page size moves back to page 1; only
/// `set_page` navigates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryState {
    filters: QueryFilters,
    sort: SortKey,
    paging: Paging,
}

impl QueryState {
    pub fn new(page_size: usize) -> Result<Self, QueryError> {
        Ok(Self {
            paging: Paging::first(page_size)?,
            ..Self::default()
        })
    }

    pub fn filters(&self) -> &QueryFilters {
        &self.filters
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn paging(&self) -> Paging {
        self.paging
    }

    pub fn set_filters(&mut self, filters: QueryFilters) {
        if filters != self.filters {
            self.filters = filters;
            self.reset_page();
        }
    }

    /// Edit filters in place; resets the page if anything changed.
    pub fn update_filters(&mut self, edit: impl FnOnce(&mut QueryFilters)) {
        let mut filters = self.filters.clone();
        edit(&mut filters);
        self.set_filters(filters);
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        if sort != self.sort {
            self.sort = sort;
            self.reset_page();
        }
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<(), QueryError> {
        if page_size != self.paging.page_size() {
            self.paging = Paging::first(page_size)?;
        }
        Ok(())
    }

    pub fn set_page(&mut self, page: usize) -> Result<(), QueryError> {
        self.paging = Paging::new(page, self.paging.page_size())?;
        Ok(())
    }

    /// Execute client-side over a full collection.
    pub fn run(&self, listings: &[Listing]) -> Page<Listing> {
        run_query(listings, &self.filters, self.sort, self.paging)
    }

    /// The equivalent remote request.
    pub fn to_query(&self) -> ListingQuery {
        ListingQuery::new(self.filters.clone(), self.sort, self.paging)
    }

    fn reset_page(&mut self) {
        // page 1 with an existing page size is always valid
        if let Ok(first) = Paging::first(self.paging.page_size()) {
            self.paging = first;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn numbered(count: usize) -> Vec<Listing> {
        (1..=count)
            .map(|i| {
                let mut l = Listing::new(i.to_string(), format!("Car {i}"));
                l.price = Some(i as f64 * 1000.0);
                l.year = Some(2000 + i as i32);
                l
            })
            .collect()
    }

    #[test]
    fn test_last_partial_page() {
        let listings = numbered(25);
        let page = run_query(
            &listings,
            &QueryFilters::default(),
            SortKey::Relevance,
            Paging::new(3, 12).unwrap(),
        );
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, 25);
        assert_eq!(page.page_count(), 3);
        assert_eq!(page.items[0].id, "25");
    }

    #[test]
    fn test_total_counts_filtered_not_collection() {
        let listings = numbered(25);
        let filters = QueryFilters::new().with_price_range(Some(20500.0), None);
        let page = run_query(&listings, &filters, SortKey::PriceDesc, Paging::new(1, 2).unwrap());
        assert_eq!(page.total, 5);
        let ids: Vec<&str> = page.items.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["25", "24"]);
    }

    #[test]
    fn test_page_past_end_is_not_clamped() {
        let listings = numbered(5);
        let page = run_query(
            &listings,
            &QueryFilters::default(),
            SortKey::Relevance,
            Paging::new(4, 12).unwrap(),
        );
        assert!(page.items.is_empty());
        assert_eq!(page.page, 4);
        assert_eq!(page.total, 5);
    }

    #[test]
    fn test_empty_result_still_has_one_page() {
        let page = run_query(&[], &QueryFilters::default(), SortKey::YearAsc, Paging::default());
        assert_eq!(page.total, 0);
        assert_eq!(page.page_count(), 1);
    }

    #[test]
    fn test_run_query_does_not_mutate_input() {
        let listings = numbered(3);
        let before = listings.clone();
        let _ = run_query(&listings, &QueryFilters::default(), SortKey::PriceDesc, Paging::default());
        assert_eq!(listings, before);
    }

    #[test]
    fn test_state_resets_page_on_changes() {
        let mut state = QueryState::new(12).unwrap();
        state.set_page(3).unwrap();
        assert_eq!(state.paging().page(), 3);

        state.set_sort(SortKey::PriceAsc);
        assert_eq!(state.paging().page(), 1);

        state.set_page(2).unwrap();
        state.update_filters(|f| f.make = Some("Honda".into()));
        assert_eq!(state.paging().page(), 1);

        state.set_page(2).unwrap();
        state.set_sort(SortKey::PriceAsc);
        state.update_filters(|f| f.make = Some("Honda".into()));
        assert_eq!(state.paging().page(), 2);

        state.set_page_size(24).unwrap();
        assert_eq!(state.paging(), Paging::new(1, 24).unwrap());
    }

    #[test]
    fn test_state_local_and_remote_agree_on_request() {
        let mut state = QueryState::new(2).unwrap();
        state.set_filters(QueryFilters::new().with_price_range(Some(20500.0), None));
        state.set_sort(SortKey::PriceDesc);
        state.set_page(2).unwrap();

        let page = state.run(&numbered(25));
        let ids: Vec<&str> = page.items.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["23", "22"]);

        let query = state.to_query();
        assert_eq!(query.filters, *state.filters());
        assert_eq!(query.sort, SortKey::PriceDesc);
        assert_eq!(query.requested_paging(), Some(Paging::new(2, 2).unwrap()));
    }

    #[test]
    fn test_state_rejects_zero_page() {
        let mut state = QueryState::default();
        assert!(matches!(state.set_page(0), Err(QueryError::Paging(PagingError::ZeroPage))));
        assert!(QueryState::new(0).is_err());
    }
}
