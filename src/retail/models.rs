//! Data model for scraped price observations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One price observation for one product from one retailer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Retailer display name
    pub retailer: String,
    /// Product title as scraped
    pub name: String,
    /// Exact, non-negative amount
    pub price: Decimal,
    /// Three-letter currency code
    pub currency: String,
    /// Absolute product URL
    pub url: String,
}

impl PriceQuote {
    pub fn new(
        retailer: impl Into<String>,
        name: impl Into<String>,
        price: Decimal,
        currency: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            retailer: retailer.into(),
            name: name.into(),
            price,
            currency: currency.into(),
            url: url.into(),
        }
    }
}
