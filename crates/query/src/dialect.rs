//! Translation of catalog queries into remote endpoint parameters.

use autolist_model::{Paging, QueryFilters, SortKey};

use crate::QueryError;

/// How a remote request selects its slice of the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// `page` / `page_size`
    Paged(Paging),
    /// `limit` / `offset`
    Window {
        limit: Option<usize>,
        offset: Option<usize>,
    },
}

impl Default for Pagination {
    fn default() -> Self {
        Self::Paged(Paging::default())
    }
}

/// A complete catalog request: what to match, how to order, which slice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingQuery {
    pub filters: QueryFilters,
    pub sort: SortKey,
    pub pagination: Pagination,
}

impl ListingQuery {
    pub fn new(filters: QueryFilters, sort: SortKey, paging: Paging) -> Self {
        Self {
            filters,
            sort,
            pagination: Pagination::Paged(paging),
        }
    }

    /// The page the caller is asking for, used to fill envelope gaps.
    ///
    /// A window maps to the page containing its offset.
    pub fn requested_paging(&self) -> Option<Paging> {
        match self.pagination {
            Pagination::Paged(paging) => Some(paging),
            Pagination::Window { limit, offset } => {
                let limit = limit.filter(|l| *l > 0)?;
                Paging::new(offset.unwrap_or(0) / limit + 1, limit).ok()
            }
        }
    }
}

/// Trait for translating queries to backend-specific syntax.
pub trait QueryDialect {
    /// The output type (query pairs, a URL, ...)
    type Output;

    /// Translate a `ListingQuery` to this dialect
    fn translate(&self, query: &ListingQuery) -> Result<Self::Output, QueryError>;
}

/// Query-string dialect of the `/cars` collection endpoint.
#[derive(Debug, Default)]
pub struct HttpParamsDialect;

impl QueryDialect for HttpParamsDialect {
    type Output = Vec<(&'static str, String)>;

    fn translate(&self, query: &ListingQuery) -> Result<Self::Output, QueryError> {
        let mut params = Vec::new();

        match query.pagination {
            Pagination::Paged(paging) => {
                params.push(("page", paging.page().to_string()));
                params.push(("page_size", paging.page_size().to_string()));
            }
            Pagination::Window { limit, offset } => {
                if limit == Some(0) {
                    return Err(QueryError::ZeroLimit);
                }
                if let Some(limit) = limit {
                    params.push(("limit", limit.to_string()));
                }
                if let Some(offset) = offset {
                    params.push(("offset", offset.to_string()));
                }
            }
        }

        let filters = &query.filters;
        push_text(&mut params, "q", &filters.q);
        push_text(&mut params, "vin", &filters.vin);
        push_text(&mut params, "make", &filters.make);
        push_text(&mut params, "model", &filters.model);
        push_value(&mut params, "year_min", filters.year_min);
        push_value(&mut params, "year_max", filters.year_max);
        push_value(&mut params, "price_min", filters.price_min);
        push_value(&mut params, "price_max", filters.price_max);
        push_text(&mut params, "source", &filters.source);
        push_text(&mut params, "dealership_id", &filters.dealership_id);
        params.push(("sort", query.sort.as_str().to_string()));

        Ok(params)
    }
}

fn push_text(params: &mut Vec<(&'static str, String)>, key: &'static str, value: &Option<String>) {
    if let Some(text) = value.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        params.push((key, text.to_string()));
    }
}

fn push_value<T: ToString>(params: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<T>) {
    if let Some(value) = value {
        params.push((key, value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(params: Vec<(&'static str, String)>) -> Vec<(String, String)> {
        params.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn expected(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_paged_query() {
        let filters = QueryFilters::new()
            .with_text("civic")
            .with_make("  ")
            .with_year_range(Some(2015), None)
            .with_price_range(None, Some(25000.0));
        let query = ListingQuery::new(filters, SortKey::PriceAsc, Paging::new(2, 24).unwrap());

        let params = HttpParamsDialect.translate(&query).unwrap();
        assert_eq!(
            pairs(params),
            expected(&[
                ("page", "2"),
                ("page_size", "24"),
                ("q", "civic"),
                ("year_min", "2015"),
                ("price_max", "25000"),
                ("sort", "price_asc"),
            ])
        );
    }

    #[test]
    fn test_window_query() {
        let query = ListingQuery {
            filters: QueryFilters::new().with_dealership("7"),
            sort: SortKey::Relevance,
            pagination: Pagination::Window {
                limit: Some(50),
                offset: Some(100),
            },
        };
        let params = HttpParamsDialect.translate(&query).unwrap();
        assert_eq!(
            pairs(params),
            expected(&[
                ("limit", "50"),
                ("offset", "100"),
                ("dealership_id", "7"),
                ("sort", "relevance"),
            ])
        );
        assert_eq!(query.requested_paging(), Paging::new(3, 50).ok());
    }

    #[test]
    fn test_zero_limit_error() {
        let query = ListingQuery {
            pagination: Pagination::Window {
                limit: Some(0),
                offset: None,
            },
            ..Default::default()
        };
        assert!(matches!(
            HttpParamsDialect.translate(&query),
            Err(QueryError::ZeroLimit)
        ));
        assert_eq!(query.requested_paging(), None);
    }
}
