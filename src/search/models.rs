//! Records exchanged between sources and the aggregation service.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A price as handed over by a source: exact, or text still to be parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPrice {
    Exact(Decimal),
    Text(String),
}

impl RawPrice {
    /// Returns the amount, or `None` when the text is not a number.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            RawPrice::Exact(value) => Some(*value),
            RawPrice::Text(text) => {
                let text = text.trim();
                Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text)).ok()
            }
        }
    }
}

impl From<Decimal> for RawPrice {
    fn from(value: Decimal) -> Self {
        RawPrice::Exact(value)
    }
}

impl From<&str> for RawPrice {
    fn from(value: &str) -> Self {
        RawPrice::Text(value.to_string())
    }
}

/// Loosely-typed product record produced by a source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProduct {
    #[serde(default, alias = "sku")]
    pub id: Option<String>,
    #[serde(default, alias = "title")]
    pub name: Option<String>,
    #[serde(default)]
    pub retailer: Option<String>,
    #[serde(default)]
    pub price: Option<RawPrice>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl RawProduct {
    /// Creates a record with the fields every usable product needs.
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: impl Into<RawPrice>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            price: Some(price.into()),
            ..Self::default()
        }
    }

    pub fn with_retailer(mut self, retailer: impl Into<String>) -> Self {
        self.retailer = Some(retailer.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// A deduplicated product in the aggregated result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedProduct {
    pub id: String,
    pub name: String,
    pub retailer: String,
    pub price: Decimal,
    pub currency: String,
    pub url: Option<String>,
}

/// A source that failed during a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceError {
    pub source: String,
    pub message: String,
}

impl SourceError {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self { source: source.into(), message: message.into() }
    }
}

/// Outcome of one search across every source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    /// Ascending by price; equal prices keep processing order
    pub products: Vec<AggregatedProduct>,
    /// One entry per failed source, in source order
    pub errors: Vec<SourceError>,
}

impl AggregatedResult {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_price_to_decimal() {
        assert_eq!(RawPrice::from("9.5").to_decimal(), Some(Decimal::new(95, 1)));
        assert_eq!(RawPrice::from(" 12 ").to_decimal(), Some(Decimal::new(12, 0)));
        assert_eq!(RawPrice::from("1e3").to_decimal(), Some(Decimal::new(1000, 0)));
        assert_eq!(RawPrice::from("cheap").to_decimal(), None);
        assert_eq!(RawPrice::from("").to_decimal(), None);
        assert_eq!(RawPrice::Exact(Decimal::new(500, 2)).to_decimal(), Some(Decimal::new(500, 2)));
    }

    #[test]
    fn test_raw_product_accepts_sku_and_title_keys() {
        let raw: RawProduct =
            serde_json::from_str(r#"{"sku": "123", "title": "Widget", "price": "10.00"}"#).unwrap();

        assert_eq!(raw.id.as_deref(), Some("123"));
        assert_eq!(raw.name.as_deref(), Some("Widget"));
        assert_eq!(raw.price.and_then(|p| p.to_decimal()), Some(Decimal::new(1000, 2)));
        assert!(raw.currency.is_none());
    }

    #[test]
    fn test_result_serializes_prices_as_strings() {
        let result = AggregatedResult {
            products: vec![AggregatedProduct {
                id: "abc".to_string(),
                name: "Widget".to_string(),
                retailer: "Broadway".to_string(),
                price: Decimal::new(950, 2),
                currency: "HKD".to_string(),
                url: None,
            }],
            errors: vec![SourceError::new("Fortress", "HTTP 500")],
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["products"][0]["price"], "9.50");
        assert_eq!(json["products"][0]["url"], serde_json::Value::Null);
        assert_eq!(json["errors"][0]["source"], "Fortress");
    }
}
