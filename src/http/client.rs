//! Rate-limited, retrying HTTP fetcher using wreq for TLS fingerprint emulation.

use crate::error::CrawlError;
use crate::http::rate_limit::RateLimiter;
use async_trait::async_trait;
use rand::RngExt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;
use wreq::{Client, Method};
use wreq_util::Emulation;

/// Headers sent with every request unless the request sets its own value.
pub const DEFAULT_HEADERS: &[(&str, &str)] = &[
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
    ),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Cache-Control", "no-cache"),
    ("Pragma", "no-cache"),
    (
        "User-Agent",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0 Safari/537.36",
    ),
];

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base for exponential backoff.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(500);

/// A request description handed to [`RetryingFetcher::execute`].
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl FetchRequest {
    /// Creates a GET request with the default timeout.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            params: Vec::new(),
            headers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Appends a query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Sets a request header, replacing any default of the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Overrides the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A fully resolved request: final URL, merged headers, timeout.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl PreparedRequest {
    /// Returns the value of a header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// HTTP response with the body decoded as (lossy) UTF-8.
#[derive(Debug, Clone)]
pub struct Response {
    pub status_code: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

impl Response {
    /// Converts a status >= 400 into [`CrawlError::HttpStatus`].
    pub fn error_for_status(self) -> Result<Self, CrawlError> {
        if self.status_code >= 400 {
            Err(CrawlError::HttpStatus { status_code: self.status_code })
        } else {
            Ok(self)
        }
    }
}

/// Network-level failure of a single attempt.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(format!("timed out after {:?}", after))
    }
}

/// Trait for sending a single HTTP request - enables mocking for tests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends one request. Non-2xx statuses are returned as responses, not errors.
    async fn send(&self, request: PreparedRequest) -> Result<Response, TransportError>;
}

/// Production transport with browser impersonation.
pub struct WreqTransport {
    client: Client,
}

impl WreqTransport {
    /// Builds the underlying client, optionally routed through a proxy.
    pub fn new(proxy: Option<&str>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let mut builder = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .connect_timeout(Duration::from_secs(10));

        if let Some(proxy_url) = proxy {
            debug!("Configuring proxy: {}", proxy_url);
            let proxy = wreq::Proxy::all(proxy_url).context("Failed to configure proxy")?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for WreqTransport {
    async fn send(&self, request: PreparedRequest) -> Result<Response, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.as_str())
            .emulation(Emulation::Chrome131);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let exchange = async {
            let response =
                builder.send().await.map_err(|e| TransportError::new(e.to_string()))?;

            let status_code = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| {
                    value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect();

            let bytes = response
                .bytes()
                .await
                .map_err(|e| TransportError::new(format!("Failed to read response body: {}", e)))?;

            Ok::<_, TransportError>(Response {
                status_code,
                body: String::from_utf8_lossy(&bytes).into_owned(),
                headers,
            })
        };

        match tokio::time::timeout(request.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::timeout(request.timeout)),
        }
    }
}

/// Retry policy for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
    pub backoff_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: DEFAULT_MAX_RETRIES, backoff: DEFAULT_BACKOFF, backoff_jitter: Duration::ZERO }
    }
}

impl RetryPolicy {
    /// Sleep before the retry that follows `attempt` (0-indexed).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let base = self.backoff.saturating_mul(2u32.saturating_pow(attempt));

        let jitter_ms = self.backoff_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return base;
        }

        base + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }
}

/// Issues requests through a rate limiter, retrying network failures.
pub struct RetryingFetcher {
    transport: Arc<dyn HttpTransport>,
    limiter: RateLimiter,
    policy: RetryPolicy,
    default_headers: Vec<(String, String)>,
}

impl RetryingFetcher {
    /// Creates a fetcher with the standard default header set.
    pub fn new(transport: Arc<dyn HttpTransport>, limiter: RateLimiter, policy: RetryPolicy) -> Self {
        let default_headers =
            DEFAULT_HEADERS.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();

        Self { transport, limiter, policy, default_headers }
    }

    /// Resolves the final URL and merges headers for `request`.
    pub fn prepare(&self, request: &FetchRequest) -> Result<PreparedRequest, CrawlError> {
        let mut url = Url::parse(&request.url).map_err(|e| {
            CrawlError::InvalidConfiguration(format!("invalid URL '{}': {}", request.url, e))
        })?;

        if !request.params.is_empty() {
            url.query_pairs_mut().extend_pairs(request.params.iter());
        }

        let mut headers: Vec<(String, String)> = self
            .default_headers
            .iter()
            .filter(|(name, _)| !request.headers.iter().any(|(key, _)| key.eq_ignore_ascii_case(name)))
            .cloned()
            .collect();
        headers.extend(request.headers.iter().cloned());

        Ok(PreparedRequest { method: request.method.clone(), url, headers, timeout: request.timeout })
    }

    /// Performs the request, retrying network failures with exponential backoff.
    ///
    /// HTTP error statuses are returned as normal responses; use
    /// [`Response::error_for_status`] to turn them into errors.
    pub async fn execute(&self, request: &FetchRequest) -> Result<Response, CrawlError> {
        let prepared = self.prepare(request)?;
        let mut attempt = 0;

        loop {
            self.limiter.wait().await;
            debug!("{} {} (attempt {})", prepared.method, prepared.url, attempt + 1);

            match self.transport.send(prepared.clone()).await {
                Ok(response) => {
                    debug!("Response status: {}", response.status_code);
                    return Ok(response);
                }
                Err(e) if attempt >= self.policy.max_retries => {
                    warn!("Giving up on {} after {} attempts: {}", prepared.url, attempt + 1, e);
                    return Err(CrawlError::TransientFetch {
                        url: prepared.url.to_string(),
                        attempts: attempt + 1,
                        message: e.message,
                    });
                }
                Err(e) => {
                    let sleep_for = self.policy.backoff_for(attempt);
                    warn!("Request to {} failed ({}), retrying in {:?}", prepared.url, e, sleep_for);
                    tokio::time::sleep(sleep_for).await;
                    attempt += 1;
                }
            }
        }
    }
}
