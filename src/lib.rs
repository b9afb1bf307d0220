//! price-crawl - Multi-retailer price search
//!
//! Queries several Hong Kong retailers in parallel, extracts price quotes
//! from their search pages, and merges them into one ranked list.

pub mod commands;
pub mod config;
pub mod error;
pub mod format;
pub mod http;
pub mod retail;
pub mod search;

pub use config::Config;
pub use error::{CrawlError, PriceParseError};
pub use retail::{PriceQuote, Retailer, SourceCrawler};
pub use search::{AggregatedProduct, AggregatedResult, AggregationService, SourceError};
