//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::http::{RateLimiter, RetryPolicy};
use crate::retail::Retailer;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Proxy URL (e.g., socks5://host:port)
    #[serde(default)]
    pub proxy: Option<String>,

    /// Enabled retailers, in search order
    #[serde(default = "default_sources")]
    pub sources: Vec<Retailer>,

    /// Request rate per retailer
    #[serde(default = "default_max_calls_per_second")]
    pub max_calls_per_second: f64,

    /// Retries after the first failed attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Random jitter added to each backoff (0 to this value)
    #[serde(default)]
    pub backoff_jitter_ms: u64,

    /// Overall deadline for one search; unfinished retailers are reported as timed out
    #[serde(default)]
    pub search_timeout_secs: Option<u64>,

    /// Per-retailer overrides keyed by slug
    #[serde(default)]
    pub retailers: BTreeMap<String, RetailerSettings>,
}

/// Overrides for a single retailer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetailerSettings {
    /// Per-request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Request rate for this retailer only
    #[serde(default)]
    pub max_calls_per_second: Option<f64>,

    /// Statuses treated as "no results"
    #[serde(default)]
    pub empty_statuses: Option<Vec<u16>>,
}

fn default_sources() -> Vec<Retailer> {
    Retailer::all().to_vec()
}

fn default_max_calls_per_second() -> f64 {
    1.0
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format: OutputFormat::Table,
            proxy: None,
            sources: default_sources(),
            max_calls_per_second: default_max_calls_per_second(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            backoff_jitter_ms: 0,
            search_timeout_secs: None,
            retailers: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("price-crawl").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides. Unparseable values are ignored.
    pub fn with_env(mut self) -> Self {
        if let Ok(proxy) = std::env::var("PRICE_CRAWL_PROXY") {
            self.proxy = Some(proxy);
        }

        if let Ok(sources) = std::env::var("PRICE_CRAWL_SOURCES") {
            match parse_sources(&sources) {
                Ok(s) => self.sources = s,
                Err(e) => warn!("Ignoring PRICE_CRAWL_SOURCES: {}", e),
            }
        }

        if let Ok(rate) = std::env::var("PRICE_CRAWL_RATE") {
            match rate.parse::<f64>() {
                Ok(r) if r.is_finite() && r > 0.0 => self.max_calls_per_second = r,
                _ => warn!("Ignoring PRICE_CRAWL_RATE: {}", rate),
            }
        }

        if let Ok(timeout) = std::env::var("PRICE_CRAWL_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.search_timeout_secs = Some(t);
            }
        }

        self
    }

    /// Checks values that would otherwise fail later at crawler construction.
    pub fn validate(&self) -> Result<()> {
        RateLimiter::new(self.max_calls_per_second).context("Invalid max_calls_per_second")?;

        for (slug, settings) in &self.retailers {
            if slug.parse::<Retailer>().is_err() {
                bail!("unknown retailer in [retailers]: {}", slug);
            }
            if let Some(rate) = settings.max_calls_per_second {
                RateLimiter::new(rate)
                    .with_context(|| format!("Invalid retailers.{}.max_calls_per_second", slug))?;
            }
        }

        Ok(())
    }

    /// Returns the overrides for `retailer`, if any were configured.
    pub fn retailer_settings(&self, retailer: Retailer) -> Option<&RetailerSettings> {
        self.retailers
            .iter()
            .find(|(slug, _)| slug.parse::<Retailer>().ok() == Some(retailer))
            .map(|(_, settings)| settings)
    }

    /// Request rate for `retailer`.
    pub fn rate_for(&self, retailer: Retailer) -> f64 {
        self.retailer_settings(retailer)
            .and_then(|s| s.max_calls_per_second)
            .unwrap_or(self.max_calls_per_second)
    }

    /// Per-request timeout for `retailer`.
    pub fn timeout_for(&self, retailer: Retailer) -> Duration {
        self.retailer_settings(retailer)
            .and_then(|s| s.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or_else(|| retailer.default_timeout())
    }

    /// Statuses `retailer` treats as an empty result set.
    pub fn empty_statuses_for(&self, retailer: Retailer) -> Vec<u16> {
        self.retailer_settings(retailer)
            .and_then(|s| s.empty_statuses.clone())
            .unwrap_or_else(|| retailer.empty_result_statuses().to_vec())
    }

    /// Retry policy shared by every retailer.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff: Duration::from_millis(self.backoff_ms),
            backoff_jitter: Duration::from_millis(self.backoff_jitter_ms),
        }
    }

    /// Overall search deadline.
    pub fn search_timeout(&self) -> Option<Duration> {
        self.search_timeout_secs.map(Duration::from_secs)
    }
}

/// Parses a comma-separated retailer list such as `broadway,fortress`.
pub fn parse_sources(list: &str) -> Result<Vec<Retailer>, String> {
    let mut sources = Vec::new();
    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let retailer: Retailer = part.parse()?;
        if !sources.contains(&retailer) {
            sources.push(retailer);
        }
    }

    if sources.is_empty() {
        return Err("no retailers given".to_string());
    }
    Ok(sources)
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Markdown,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use: table, json, markdown, csv", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
