//! Retailer search pages: request mapping, markup extraction, and price parsing.

pub mod crawler;
pub mod markup;
pub mod models;
pub mod parser;
pub mod price;
pub mod retailers;
pub mod selectors;
pub mod tile_scanner;

pub use crawler::{RetailCrawler, SourceCrawler};
pub use models::PriceQuote;
pub use price::normalize_price;
pub use retailers::Retailer;
