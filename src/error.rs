//! Error types for the fetch → parse → aggregate pipeline.

use thiserror::Error;

/// Failures that can escape a single source's `fetch_prices` call.
///
/// Everything here is contained at the source boundary: the aggregation
/// layer turns it into a per-source error entry instead of failing the search.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Construction-time misconfiguration (e.g. a non-positive rate limit).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Network-level failure that survived every retry.
    #[error("request to {url} failed after {attempts} attempts: {message}")]
    TransientFetch { url: String, attempts: u32, message: String },

    /// HTTP status >= 400 that the source does not treat as "no results".
    #[error("HTTP {status_code}")]
    HttpStatus { status_code: u16 },

    /// Response body could not be scanned for product tiles.
    #[error("could not parse response: {0}")]
    Parse(String),
}

/// A single price string could not be turned into a decimal amount.
///
/// Parsers handle this locally by skipping the offending tile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not parse price from '{raw}'")]
pub struct PriceParseError {
    pub raw: String,
}
