//! HTTP listing source.
//!
//! Provides the `ListingSource` trait and its implementation against the
//! catalog REST API. Responses are adapted and normalized at this boundary,
//! so callers only ever see canonical `Listing`s and `Page`s.

use std::future::Future;
use std::time::{Duration, Instant};

use autolist_model::{Dealership, Listing, Page, SiteSettings};
use autolist_normalize::{adapt_listings, adapt_values, AdaptError, Normalizer};
use autolist_query::{HttpParamsDialect, ListingQuery, QueryDialect, QueryError};
use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use thiserror::Error;

/// How much of an error body to keep in `SourceError::Http`.
const ERROR_BODY_LIMIT: usize = 200;

/// Errors from listing source operations.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("HTTP client setup failed: {0}")]
    Client(String),

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Listing not found: {0}")]
    NotFound(String),

    #[error("Invalid JSON from {url}: {reason}")]
    InvalidJson { url: String, reason: String },

    #[error(transparent)]
    Malformed(#[from] AdaptError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Source not available")]
    Unavailable,
}

/// Trait for listing sources (REST API, fixtures, ...).
///
/// Every method resolves to canonical data or an error; a failed fetch
/// never yields partial results.
pub trait ListingSource {
    /// One page of listings matching the query, filtered and sorted remotely.
    fn fetch_page(
        &self,
        query: &ListingQuery,
    ) -> impl Future<Output = Result<Page<Listing>, SourceError>> + Send;

    /// The whole collection, unfiltered, for client-side querying.
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<Listing>, SourceError>> + Send;

    /// A single listing by id.
    fn fetch_listing(&self, id: &str) -> impl Future<Output = Result<Listing, SourceError>> + Send;

    fn fetch_dealerships(
        &self,
    ) -> impl Future<Output = Result<Vec<Dealership>, SourceError>> + Send;

    fn fetch_settings(&self) -> impl Future<Output = Result<SiteSettings, SourceError>> + Send;

    /// Check if the source is reachable.
    fn health_check(&self) -> impl Future<Output = Result<(), SourceError>> + Send;

    /// Get the source name for logging.
    fn name(&self) -> &'static str;
}

/// REST source configuration.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Base URL of the catalog API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 12,
        }
    }
}

/// Catalog REST API source.
pub struct HttpListingSource {
    base_url: Url,
    timeout_secs: u64,
    client: reqwest::Client,
    normalizer: Normalizer,
}

impl HttpListingSource {
    /// Create a new source. Fails on an unusable base URL.
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        let trimmed = config.base_url.trim().trim_end_matches('/');
        let base_url = Url::parse(trimmed)
            .map_err(|e| SourceError::InvalidBaseUrl(format!("{trimmed}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(SourceError::InvalidBaseUrl(trimmed.to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::Client(e.to_string()))?;

        Ok(Self {
            base_url,
            timeout_secs: config.timeout_secs,
            client,
            normalizer: Normalizer::default(),
        })
    }

    /// Use a custom normalizer (e.g. a different hidden-source list).
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL; segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, SourceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SourceError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request_error(&self, err: reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::Timeout(self.timeout_secs)
        } else {
            SourceError::Network(err.to_string())
        }
    }

    async fn get_json(
        &self,
        segments: &[&str],
        params: &[(&'static str, String)],
    ) -> Result<Value, SourceError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(url = %url, params = params.len(), "Fetching");

        let started = Instant::now();
        let response = self
            .client
            .get(url.clone())
            .query(params)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.request_error(e))?;
        tracing::debug!(
            url = %url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Fetched"
        );

        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }

        serde_json::from_str(&body).map_err(|e| SourceError::InvalidJson {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

impl ListingSource for HttpListingSource {
    async fn fetch_page(&self, query: &ListingQuery) -> Result<Page<Listing>, SourceError> {
        let params = HttpParamsDialect.translate(query)?;
        let response = self.get_json(&["cars"], &params).await?;
        let page = adapt_listings(response, query.requested_paging(), &self.normalizer)?;
        tracing::info!(
            items = page.items.len(),
            total = page.total,
            page = page.page,
            "Fetched listing page"
        );
        Ok(page)
    }

    async fn fetch_all(&self) -> Result<Vec<Listing>, SourceError> {
        let response = self.get_json(&["cars"], &[]).await?;
        let page = adapt_listings(response, None, &self.normalizer)?;
        tracing::info!(items = page.items.len(), "Fetched full collection");
        Ok(page.items)
    }

    async fn fetch_listing(&self, id: &str) -> Result<Listing, SourceError> {
        let response = match self.get_json(&["cars", id], &[]).await {
            Err(SourceError::Http { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                return Err(SourceError::NotFound(id.to_string()))
            }
            other => other?,
        };
        match response {
            Value::Object(raw) => Ok(self.normalizer.normalize(raw)),
            _ => Err(AdaptError::MalformedResponse("expected a listing object".to_string()).into()),
        }
    }

    async fn fetch_dealerships(&self) -> Result<Vec<Dealership>, SourceError> {
        let response = self.get_json(&["dealerships"], &[]).await?;
        let page = adapt_values(response, None)?;
        Ok(page
            .items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<Dealership>(item) {
                Ok(dealership) => Some(dealership),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed dealership");
                    None
                }
            })
            .collect())
    }

    async fn fetch_settings(&self) -> Result<SiteSettings, SourceError> {
        let response = self.get_json(&["public", "settings"], &[]).await?;
        serde_json::from_value(response).map_err(|e| SourceError::InvalidJson {
            url: "/public/settings".to_string(),
            reason: e.to_string(),
        })
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        match self.get_json(&["public", "settings"], &[]).await {
            Ok(_) => Ok(()),
            Err(e @ (SourceError::Network(_) | SourceError::Timeout(_))) => Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "Health check failed");
                Err(SourceError::Unavailable)
            }
        }
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}
