//! price-crawl - Multi-retailer price search CLI
//!
//! Searches several retailers at once and prints one ranked price list.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use price_crawl::commands::SearchCommand;
use price_crawl::config::{Config, OutputFormat};
use price_crawl::retail::Retailer;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "price-crawl",
    version,
    about = "Compare product prices across retailers",
    long_about = "Searches Broadway, Fortress and Price.com.hk in parallel and lists the cheapest offer per product."
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, global = true, env = "PRICE_CRAWL_PROXY")]
    proxy: Option<String>,

    /// Maximum requests per second to each retailer
    #[arg(long, global = true)]
    rate: Option<f64>,

    /// Overall search timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search all retailers for a product
    #[command(alias = "s")]
    Search {
        /// Search query
        query: String,

        /// Retailers to query (comma-separated)
        #[arg(long, value_delimiter = ',')]
        sources: Option<Vec<Retailer>>,
    },

    /// List supported retailers
    Sources,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }
    if let Some(rate) = cli.rate {
        config.max_calls_per_second = rate;
    }
    if let Some(timeout) = cli.timeout {
        config.search_timeout_secs = Some(timeout);
    }

    match cli.command {
        Commands::Search { query, sources } => {
            if let Some(sources) = sources {
                config.sources = sources;
            }
            config.validate().context("Invalid options")?;

            let cmd = SearchCommand::new(config);
            let output = cmd.execute(&query).await?;
            println!("{}", output);
        }

        Commands::Sources => {
            println!("Supported retailers:\n");
            println!("{:<14} {:<14} {:<10} {}", "Slug", "Name", "Currency", "Search URL");
            println!("{:-<14} {:-<14} {:-<10} {:-<40}", "", "", "", "");

            for retailer in Retailer::all() {
                println!(
                    "{:<14} {:<14} {:<10} {}",
                    retailer.slug(),
                    retailer.name(),
                    retailer.default_currency(),
                    retailer.search_url()
                );
            }
        }
    }

    Ok(())
}
