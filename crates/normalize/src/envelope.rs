//! Response adapter for collection endpoints.
//!
//! Upstreams answer either with a bare JSON array or with a paginated
//! envelope (`items`/`results`, `total`, `page`, `page_size`). The shape is
//! resolved once here; everything downstream sees a `Page`.

use autolist_model::{Listing, Page, Paging, RawListing};
use serde_json::Value;
use thiserror::Error;

use crate::Normalizer;

/// Errors from adapting a collection response.
#[derive(Debug, Error)]
pub enum AdaptError {
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// The two accepted collection response shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape {
    /// `[item, ...]`
    Bare(Vec<Value>),

    /// `{ items | results, total?, page?, page_size? }`
    Envelope {
        items: Vec<Value>,
        total: Option<usize>,
        page: Option<usize>,
        page_size: Option<usize>,
    },
}

impl ResponseShape {
    /// Classify a response, failing when the item list is not an array.
    pub fn classify(response: Value) -> Result<Self, AdaptError> {
        match response {
            Value::Array(items) => Ok(Self::Bare(items)),
            Value::Object(mut envelope) => {
                let items = ["items", "results"]
                    .iter()
                    .find_map(|key| envelope.remove(*key).filter(|v| !v.is_null()))
                    .unwrap_or_else(|| Value::Array(Vec::new()));

                let items = match items {
                    Value::Array(items) => items,
                    other => {
                        return Err(AdaptError::MalformedResponse(format!(
                            "expected an item array, found {}",
                            kind_of(&other)
                        )))
                    }
                };

                Ok(Self::Envelope {
                    items,
                    total: envelope.get("total").and_then(count_of),
                    page: envelope.get("page").and_then(count_of).filter(|p| *p >= 1),
                    page_size: envelope
                        .get("page_size")
                        .and_then(count_of)
                        .filter(|s| *s >= 1),
                })
            }
            other => Err(AdaptError::MalformedResponse(format!(
                "expected an array or an envelope object, found {}",
                kind_of(&other)
            ))),
        }
    }

    /// Resolve paging metadata, preferring what the response states, then
    /// what the caller requested.
    pub fn into_page(self, requested: Option<Paging>) -> Page<Value> {
        match self {
            Self::Bare(items) => {
                let len = items.len();
                Page {
                    items,
                    total: len,
                    page: 1,
                    page_size: len.max(1),
                }
            }
            Self::Envelope {
                items,
                total,
                page,
                page_size,
            } => {
                let len = items.len();
                Page {
                    total: total.unwrap_or(len),
                    page: page.or(requested.map(|p| p.page())).unwrap_or(1),
                    page_size: page_size
                        .or(requested.map(|p| p.page_size()))
                        .unwrap_or(len)
                        .max(1),
                    items,
                }
            }
        }
    }
}

/// Adapt a response into a page of untyped values.
pub fn adapt_values(response: Value, requested: Option<Paging>) -> Result<Page<Value>, AdaptError> {
    Ok(ResponseShape::classify(response)?.into_page(requested))
}

/// Adapt a response into a page of raw listings.
///
/// Items that are not JSON objects degrade to empty records, which
/// normalize to the fallback listing.
pub fn adapt(response: Value, requested: Option<Paging>) -> Result<Page<RawListing>, AdaptError> {
    let page = adapt_values(response, requested)?;
    Ok(page.map(|item| match item {
        Value::Object(map) => map,
        other => {
            tracing::warn!(kind = kind_of(&other), "Non-object listing in response");
            RawListing::new()
        }
    }))
}

/// Adapt and normalize in one step.
pub fn adapt_listings(
    response: Value,
    requested: Option<Paging>,
    normalizer: &Normalizer,
) -> Result<Page<Listing>, AdaptError> {
    let page = adapt(response, requested)?;
    tracing::debug!(
        items = page.items.len(),
        total = page.total,
        page = page.page,
        "Adapted listing response"
    );
    Ok(page.map(|raw| normalizer.normalize(raw)))
}

fn count_of(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize).or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as usize)
        }),
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
