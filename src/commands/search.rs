//! Search command implementation.

use crate::config::Config;
use crate::format::Formatter;
use crate::http::{HttpTransport, WreqTransport};
use crate::search::AggregationService;
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Executes a price search across the configured retailers.
pub struct SearchCommand {
    config: Config,
}

impl SearchCommand {
    /// Creates a new search command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Executes the search and returns formatted output.
    pub async fn execute(&self, query: &str) -> Result<String> {
        let transport = WreqTransport::new(self.config.proxy.as_deref())
            .context("Failed to create HTTP client")?;
        let transport: Arc<dyn HttpTransport> = Arc::new(transport);

        let service = AggregationService::from_config(&self.config, transport)
            .context("Failed to set up retailers")?;

        self.execute_with_service(&service, query).await
    }

    /// Executes the search with a provided service (for testing).
    pub async fn execute_with_service(&self, service: &AggregationService, query: &str) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            bail!("Search query must not be empty");
        }

        info!("Searching for: {}", query);
        debug!("Retailers: {}", service.source_names().join(", "));

        let result = service.search(query).await;
        info!("Found {} products, {} retailers failed", result.products.len(), result.errors.len());

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_result(&result))
    }
}
