//! Multi-retailer search: identity derivation, deduplication, and ranking.

pub mod adapter;
pub mod identity;
pub mod models;
pub mod service;

pub use adapter::{CrawlerSource, ProductSource};
pub use identity::derive_id;
pub use models::{AggregatedProduct, AggregatedResult, RawPrice, RawProduct, SourceError};
pub use service::AggregationService;
