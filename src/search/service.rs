//! Fans a query out to every source and merges the answers.

use crate::config::Config;
use crate::error::CrawlError;
use crate::http::HttpTransport;
use crate::retail::RetailCrawler;
use crate::search::adapter::{CrawlerSource, ProductSource};
use crate::search::models::{AggregatedProduct, AggregatedResult, RawProduct, SourceError};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{Id, JoinError, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Currency assumed when a record does not name one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Queries every source in parallel and returns one ranked, deduplicated list.
pub struct AggregationService {
    sources: Vec<Arc<dyn ProductSource>>,
    search_timeout: Option<Duration>,
}

impl AggregationService {
    pub fn new(sources: Vec<Arc<dyn ProductSource>>) -> Self {
        Self { sources, search_timeout: None }
    }

    /// Bounds the whole search; sources still running when it expires are
    /// aborted and reported as timed out.
    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = Some(timeout);
        self
    }

    /// Builds one crawler per configured retailer, all sharing `transport`.
    pub fn from_config(config: &Config, transport: Arc<dyn HttpTransport>) -> Result<Self, CrawlError> {
        let mut sources: Vec<Arc<dyn ProductSource>> = Vec::with_capacity(config.sources.len());
        for retailer in &config.sources {
            let crawler = RetailCrawler::from_config(*retailer, config, Arc::clone(&transport))?;
            sources.push(Arc::new(CrawlerSource::new(Arc::new(crawler))));
        }

        let service = Self::new(sources);
        Ok(match config.search_timeout() {
            Some(timeout) => service.with_search_timeout(timeout),
            None => service,
        })
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Searches every source. Never fails; failed sources are listed in
    /// [`AggregatedResult::errors`].
    ///
    /// Source tasks live in a [`JoinSet`], so dropping the returned future
    /// aborts every fetch still in flight.
    pub async fn search(&self, query: &str) -> AggregatedResult {
        if self.sources.is_empty() {
            return AggregatedResult::default();
        }

        let deadline = self.search_timeout.map(|t| Instant::now() + t);

        let mut tasks = JoinSet::new();
        let mut slots: HashMap<Id, usize> = HashMap::with_capacity(self.sources.len());
        for (index, source) in self.sources.iter().enumerate() {
            let source = Arc::clone(source);
            let query = query.to_string();
            let handle = tasks.spawn(async move { source.search(&query).await });
            slots.insert(handle.id(), index);
        }

        let mut outcomes: Vec<Option<Result<Vec<RawProduct>, String>>> =
            (0..self.sources.len()).map(|_| None).collect();

        loop {
            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, tasks.join_next_with_id()).await {
                    Ok(next) => next,
                    Err(_) => break,
                },
                None => tasks.join_next_with_id().await,
            };
            let Some(joined) = next else {
                break;
            };

            let (id, outcome) = match joined {
                Ok((id, Ok(records))) => (id, Ok(records)),
                Ok((id, Err(e))) => (id, Err(format!("{:#}", e))),
                Err(e) => (e.id(), Err(join_error_message(&e))),
            };
            if let Some(&index) = slots.get(&id) {
                outcomes[index] = Some(outcome);
            }
        }
        tasks.abort_all();

        let mut merger = Merger::default();
        let mut errors = Vec::new();

        for (source, outcome) in self.sources.iter().zip(outcomes) {
            let name = source.name();
            match outcome {
                Some(Ok(records)) => {
                    debug!("{} returned {} records", name, records.len());
                    for raw in records {
                        merger.add(raw, name);
                    }
                }
                Some(Err(message)) => {
                    warn!("{} failed: {}", name, message);
                    errors.push(SourceError::new(name, message));
                }
                None => {
                    warn!("{} did not finish before the search deadline", name);
                    errors.push(SourceError::new(name, "timeout"));
                }
            }
        }

        let products = merger.finish();
        info!("Aggregated {} products ({} sources failed)", products.len(), errors.len());

        AggregatedResult { products, errors }
    }
}

fn join_error_message(error: &JoinError) -> String {
    if error.is_cancelled() {
        "cancelled".to_string()
    } else {
        "source panicked".to_string()
    }
}

/// Keeps the cheapest product per id in first-seen order.
#[derive(Default)]
struct Merger {
    products: Vec<AggregatedProduct>,
    index: HashMap<String, usize>,
}

impl Merger {
    fn add(&mut self, raw: RawProduct, source_name: &str) {
        let Some(product) = normalize(raw, source_name) else {
            return;
        };

        match self.index.get(&product.id) {
            Some(&slot) => {
                if product.price < self.products[slot].price {
                    self.products[slot] = product;
                }
            }
            None => {
                self.index.insert(product.id.clone(), self.products.len());
                self.products.push(product);
            }
        }
    }

    fn finish(mut self) -> Vec<AggregatedProduct> {
        // sort_by is stable, so equal prices keep first-seen order.
        self.products.sort_by(|a, b| a.price.cmp(&b.price));
        self.products
    }
}

/// Turns a raw record into a product, or drops it when id, name or price is unusable.
pub fn normalize(raw: RawProduct, source_name: &str) -> Option<AggregatedProduct> {
    let id = non_blank(raw.id)?;
    let name = non_blank(raw.name)?;
    let price = raw.price.as_ref().and_then(|p| p.to_decimal())?;

    let retailer = non_blank(raw.retailer).unwrap_or_else(|| source_name.trim().to_string());
    let currency = non_blank(raw.currency)
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
        .to_uppercase();

    Some(AggregatedProduct { id, name, retailer, price, currency, url: raw.url })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
