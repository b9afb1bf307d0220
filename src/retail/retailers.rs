//! Supported retailers with their search endpoints and request conventions.

use crate::error::CrawlError;
use crate::retail::models::PriceQuote;
use crate::retail::parser::{self, Parser};
use crate::retail::tile_scanner;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Supported retailers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Retailer {
    Broadway,
    Fortress,
    PriceDotCom,
}

impl Retailer {
    /// Returns the display name used in quotes and error reports.
    pub fn name(&self) -> &'static str {
        match self {
            Retailer::Broadway => "Broadway",
            Retailer::Fortress => "Fortress",
            Retailer::PriceDotCom => "Price.com.hk",
        }
    }

    /// Returns the short identifier used in config files and on the command line.
    pub fn slug(&self) -> &'static str {
        match self {
            Retailer::Broadway => "broadway",
            Retailer::Fortress => "fortress",
            Retailer::PriceDotCom => "price-dot-com",
        }
    }

    /// Returns the search page URL.
    pub fn search_url(&self) -> &'static str {
        match self {
            Retailer::Broadway => "https://www.broadwaylifestyle.com/search",
            Retailer::Fortress => "https://www.fortress.com.hk/en/search",
            Retailer::PriceDotCom => "https://www.price.com.hk/search.php",
        }
    }

    /// Returns the currency assumed when a tile does not declare one.
    pub fn default_currency(&self) -> &'static str {
        "HKD"
    }

    /// Returns the default per-request timeout.
    pub fn default_timeout(&self) -> Duration {
        match self {
            Retailer::Fortress => Duration::from_secs(25),
            _ => Duration::from_secs(10),
        }
    }

    /// Statuses this retailer uses to signal an empty result set.
    pub fn empty_result_statuses(&self) -> &'static [u16] {
        match self {
            Retailer::Broadway | Retailer::PriceDotCom => &[404],
            Retailer::Fortress => &[],
        }
    }

    /// Maps a query to search page parameters.
    pub fn query_params(&self, query: &str) -> Vec<(String, String)> {
        match self {
            Retailer::PriceDotCom => {
                vec![("g".to_string(), "0".to_string()), ("q".to_string(), query.to_string())]
            }
            _ => vec![("q".to_string(), query.to_string())],
        }
    }

    /// Returns the Referer to send for `query`, if this retailer expects one.
    pub fn referer(&self, search_url: &str, query: &str) -> Option<String> {
        match self {
            Retailer::Fortress => {
                let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
                Some(format!("{}?q={}", search_url, encoded))
            }
            _ => None,
        }
    }

    /// Parses a search results page.
    pub fn parse(&self, body: &str, page_url: &Url) -> Result<Vec<PriceQuote>, CrawlError> {
        match self {
            Retailer::Broadway => {
                Parser::new(self.name(), self.default_currency(), parser::broadway_selectors())
                    .parse_search(body, page_url)
            }
            Retailer::Fortress => {
                Parser::new(self.name(), self.default_currency(), parser::fortress_selectors())
                    .parse_search(body, page_url)
            }
            Retailer::PriceDotCom => {
                tile_scanner::parse_search(body, page_url, self.name(), self.default_currency())
            }
        }
    }

    /// Returns all supported retailers in default search order.
    pub fn all() -> &'static [Retailer] {
        &[Retailer::Broadway, Retailer::Fortress, Retailer::PriceDotCom]
    }
}

impl fmt::Display for Retailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for Retailer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "broadway" => Ok(Retailer::Broadway),
            "fortress" => Ok(Retailer::Fortress),
            "price-dot-com" | "pricedotcom" | "price.com.hk" | "price" => Ok(Retailer::PriceDotCom),
            _ => Err(format!(
                "Unknown retailer: {}. Supported: broadway, fortress, price-dot-com",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retailer_parsing() {
        assert_eq!("broadway".parse::<Retailer>().unwrap(), Retailer::Broadway);
        assert_eq!("FORTRESS".parse::<Retailer>().unwrap(), Retailer::Fortress);
        assert_eq!("price-dot-com".parse::<Retailer>().unwrap(), Retailer::PriceDotCom);
        assert_eq!("Price.com.hk".parse::<Retailer>().unwrap(), Retailer::PriceDotCom);

        let err = "amazon".parse::<Retailer>().unwrap_err();
        assert!(err.contains("Unknown retailer"));
    }

    #[test]
    fn test_display_roundtrips_through_from_str() {
        for retailer in Retailer::all() {
            assert_eq!(retailer.to_string().parse::<Retailer>().unwrap(), *retailer);
        }
    }

    #[test]
    fn test_serde_uses_slug() {
        let json = serde_json::to_string(&Retailer::PriceDotCom).unwrap();
        assert_eq!(json, "\"price-dot-com\"");

        let parsed: Retailer = serde_json::from_str("\"fortress\"").unwrap();
        assert_eq!(parsed, Retailer::Fortress);
    }

    #[test]
    fn test_query_params() {
        assert_eq!(
            Retailer::Broadway.query_params("sony"),
            vec![("q".to_string(), "sony".to_string())]
        );
        assert_eq!(
            Retailer::PriceDotCom.query_params("sony"),
            vec![("g".to_string(), "0".to_string()), ("q".to_string(), "sony".to_string())]
        );
    }

    #[test]
    fn test_fortress_referer_is_query_specific() {
        let referer = Retailer::Fortress.referer(Retailer::Fortress.search_url(), "iphone 15 pro");
        assert_eq!(referer.as_deref(), Some("https://www.fortress.com.hk/en/search?q=iphone+15+pro"));

        assert!(Retailer::Broadway.referer(Retailer::Broadway.search_url(), "x").is_none());
    }

    #[test]
    fn test_empty_result_policy() {
        assert_eq!(Retailer::Broadway.empty_result_statuses(), &[404]);
        assert_eq!(Retailer::PriceDotCom.empty_result_statuses(), &[404]);
        assert!(Retailer::Fortress.empty_result_statuses().is_empty());
    }

    #[test]
    fn test_default_timeouts() {
        assert_eq!(Retailer::Fortress.default_timeout(), Duration::from_secs(25));
        assert_eq!(Retailer::Broadway.default_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_search_urls_are_valid() {
        for retailer in Retailer::all() {
            assert!(Url::parse(retailer.search_url()).is_ok(), "{}", retailer);
        }
    }
}
