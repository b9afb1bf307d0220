//! Outbound HTTP: rate limiting, retries, and the wreq-backed transport.

pub mod client;
pub mod rate_limit;

pub use client::{
    FetchRequest, HttpTransport, PreparedRequest, Response, RetryPolicy, RetryingFetcher,
    TransportError, WreqTransport, DEFAULT_HEADERS,
};
pub use rate_limit::RateLimiter;
