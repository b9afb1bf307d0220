//! Sources feeding the aggregation service.

use crate::retail::{PriceQuote, SourceCrawler};
use crate::search::identity::derive_id;
use crate::search::models::{RawPrice, RawProduct};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A named producer of raw product records - enables mocking for tests.
#[async_trait]
pub trait ProductSource: Send + Sync {
    /// Name reported in errors and used as the default retailer.
    fn name(&self) -> &str;

    /// Returns every product the source knows for `query`.
    async fn search(&self, query: &str) -> Result<Vec<RawProduct>>;
}

/// Exposes a [`SourceCrawler`] as a [`ProductSource`], deriving ids from
/// quote name and URL.
pub struct CrawlerSource {
    crawler: Arc<dyn SourceCrawler>,
}

impl CrawlerSource {
    pub fn new(crawler: Arc<dyn SourceCrawler>) -> Self {
        Self { crawler }
    }
}

#[async_trait]
impl ProductSource for CrawlerSource {
    fn name(&self) -> &str {
        self.crawler.retailer_name()
    }

    async fn search(&self, query: &str) -> Result<Vec<RawProduct>> {
        let quotes = self.crawler.fetch_prices(query).await?;
        Ok(quotes.into_iter().map(quote_to_raw).collect())
    }
}

fn quote_to_raw(quote: PriceQuote) -> RawProduct {
    RawProduct {
        id: Some(derive_id(&quote.name, Some(&quote.url))),
        name: Some(quote.name),
        retailer: Some(quote.retailer),
        price: Some(RawPrice::Exact(quote.price)),
        currency: Some(quote.currency),
        url: Some(quote.url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrawlError;
    use rust_decimal::Decimal;

    struct FixedCrawler {
        quotes: Vec<PriceQuote>,
    }

    #[async_trait]
    impl SourceCrawler for FixedCrawler {
        fn retailer_name(&self) -> &str {
            "Fortress"
        }

        async fn fetch_prices(&self, _query: &str) -> Result<Vec<PriceQuote>, CrawlError> {
            Ok(self.quotes.clone())
        }
    }

    struct FailingCrawler;

    #[async_trait]
    impl SourceCrawler for FailingCrawler {
        fn retailer_name(&self) -> &str {
            "Broadway"
        }

        async fn fetch_prices(&self, _query: &str) -> Result<Vec<PriceQuote>, CrawlError> {
            Err(CrawlError::HttpStatus { status_code: 503 })
        }
    }

    #[tokio::test]
    async fn test_quotes_become_raw_products_with_ids() {
        let quote = PriceQuote::new(
            "Fortress",
            "Dyson V15 Detect Absolute",
            Decimal::new(668000, 2),
            "HKD",
            "https://www.fortress.com.hk/en/product/dyson-v15",
        );
        let source = CrawlerSource::new(Arc::new(FixedCrawler { quotes: vec![quote.clone()] }));

        assert_eq!(source.name(), "Fortress");

        let products = source.search("dyson").await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id.as_deref(), Some(derive_id(&quote.name, Some(&quote.url)).as_str()));
        assert_eq!(products[0].name.as_deref(), Some("Dyson V15 Detect Absolute"));
        assert_eq!(products[0].price, Some(RawPrice::Exact(Decimal::new(668000, 2))));
        assert_eq!(products[0].currency.as_deref(), Some("HKD"));
        assert_eq!(products[0].url.as_deref(), Some(quote.url.as_str()));
    }

    #[tokio::test]
    async fn test_crawler_errors_propagate() {
        let source = CrawlerSource::new(Arc::new(FailingCrawler));
        let err = source.search("anything").await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 503");
    }
}
