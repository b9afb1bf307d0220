//! Per-retailer crawler: request mapping, fetch, and parse in one call.

use crate::config::Config;
use crate::error::CrawlError;
use crate::http::{FetchRequest, HttpTransport, RateLimiter, RetryingFetcher};
use crate::retail::models::PriceQuote;
use crate::retail::retailers::Retailer;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// A source of price quotes for a search query - enables mocking for tests.
#[async_trait]
pub trait SourceCrawler: Send + Sync {
    /// Display name of the retailer.
    fn retailer_name(&self) -> &str;

    /// Searches the retailer and returns every quote on the result page.
    async fn fetch_prices(&self, query: &str) -> Result<Vec<PriceQuote>, CrawlError>;
}

/// Crawler for one of the supported [`Retailer`]s.
pub struct RetailCrawler {
    retailer: Retailer,
    fetcher: RetryingFetcher,
    search_url: String,
    timeout: Duration,
    empty_statuses: Vec<u16>,
}

impl RetailCrawler {
    /// Creates a crawler with the retailer's own defaults.
    pub fn new(retailer: Retailer, fetcher: RetryingFetcher) -> Self {
        Self {
            retailer,
            fetcher,
            search_url: retailer.search_url().to_string(),
            timeout: retailer.default_timeout(),
            empty_statuses: retailer.empty_result_statuses().to_vec(),
        }
    }

    /// Creates a crawler with its own rate limiter, using `config` overrides.
    pub fn from_config(
        retailer: Retailer,
        config: &Config,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, CrawlError> {
        let limiter = RateLimiter::new(config.rate_for(retailer))?;
        let fetcher = RetryingFetcher::new(transport, limiter, config.retry_policy());

        Ok(Self::new(retailer, fetcher)
            .with_timeout(config.timeout_for(retailer))
            .with_empty_statuses(config.empty_statuses_for(retailer)))
    }

    /// Points the crawler at a different search page (for testing).
    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }

    /// Overrides the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the statuses treated as "no results".
    pub fn with_empty_statuses(mut self, statuses: Vec<u16>) -> Self {
        self.empty_statuses = statuses;
        self
    }

    pub fn retailer(&self) -> Retailer {
        self.retailer
    }

    /// Builds the search request for `query`.
    pub fn build_request(&self, query: &str) -> FetchRequest {
        let mut request = FetchRequest::get(&self.search_url).timeout(self.timeout);

        for (key, value) in self.retailer.query_params(query) {
            request = request.param(key, value);
        }
        if let Some(referer) = self.retailer.referer(&self.search_url, query) {
            request = request.header("Referer", referer);
        }

        request
    }
}

#[async_trait]
impl SourceCrawler for RetailCrawler {
    fn retailer_name(&self) -> &str {
        self.retailer.name()
    }

    async fn fetch_prices(&self, query: &str) -> Result<Vec<PriceQuote>, CrawlError> {
        info!("Searching {} for: {}", self.retailer.name(), query);

        let response = self.fetcher.execute(&self.build_request(query)).await?;

        if self.empty_statuses.contains(&response.status_code) {
            debug!("{} answered {}, treating as no results", self.retailer.name(), response.status_code);
            return Ok(Vec::new());
        }
        let response = response.error_for_status()?;

        if response.body.trim().is_empty() {
            debug!("{} returned an empty body", self.retailer.name());
            return Ok(Vec::new());
        }

        let page_url = Url::parse(&self.search_url).map_err(|e| {
            CrawlError::InvalidConfiguration(format!("invalid search URL '{}': {}", self.search_url, e))
        })?;

        self.retailer.parse(&response.body, &page_url)
    }
}
