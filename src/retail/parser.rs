//! DOM-based parser for retailers whose product tiles are selectable with CSS.

use crate::error::CrawlError;
use crate::retail::markup;
use crate::retail::models::PriceQuote;
use crate::retail::price::normalize_price;
use crate::retail::selectors;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, trace};
use url::Url;

/// The three selectors that describe a retailer's product tile.
#[derive(Clone, Copy)]
pub struct TileSelectors {
    pub tile: &'static Selector,
    pub title: &'static Selector,
    pub price: &'static Selector,
}

/// Extracts quotes from every tile matched by a [`TileSelectors`] set.
pub struct Parser {
    retailer: &'static str,
    default_currency: &'static str,
    selectors: TileSelectors,
}

impl Parser {
    /// Creates a parser for one retailer.
    pub fn new(retailer: &'static str, default_currency: &'static str, selectors: TileSelectors) -> Self {
        Self { retailer, default_currency, selectors }
    }

    /// Parses a search results page into quotes.
    ///
    /// Tiles missing a title, price, or link, or whose price does not
    /// normalize, are skipped. Relative links resolve against `page_url`.
    pub fn parse_search(&self, html: &str, page_url: &Url) -> Result<Vec<PriceQuote>, CrawlError> {
        // The DOM builder accepts anything, so check lexical structure first.
        markup::tokenize(html)?;

        let document = Html::parse_document(html);
        let mut quotes = Vec::new();

        for tile in document.select(self.selectors.tile) {
            match self.parse_tile(tile, page_url) {
                Some(quote) => {
                    trace!("Parsed quote: {} - {}", quote.name, quote.price);
                    quotes.push(quote);
                }
                None => trace!("Skipping incomplete {} tile", self.retailer),
            }
        }

        debug!("Parsed {} quotes from {}", quotes.len(), self.retailer);
        Ok(quotes)
    }

    fn parse_tile(&self, tile: ElementRef, page_url: &Url) -> Option<PriceQuote> {
        let title = tile.select(self.selectors.title).next()?;
        let price_el = tile.select(self.selectors.price).next()?;
        let link = tile.select(&selectors::LINK).next()?;

        let name = title.text().collect::<String>().trim().to_string();
        if name.is_empty() {
            return None;
        }

        let raw_price = price_el.text().collect::<String>();
        let price = match normalize_price(raw_price.trim()) {
            Ok(price) => price,
            Err(e) => {
                debug!("{}: {}", self.retailer, e);
                return None;
            }
        };

        let currency = price_el
            .value()
            .attr("data-currency")
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(self.default_currency)
            .to_string();

        let href = link.value().attr("href").unwrap_or_default();
        let url = page_url.join(href.trim()).ok()?;

        Some(PriceQuote::new(self.retailer, name, price, currency, url.to_string()))
    }
}

/// Tile selectors for Broadway.
pub fn broadway_selectors() -> TileSelectors {
    TileSelectors {
        tile: &selectors::broadway::TILE,
        title: &selectors::broadway::TITLE,
        price: &selectors::broadway::PRICE,
    }
}

/// Tile selectors for Fortress.
pub fn fortress_selectors() -> TileSelectors {
    TileSelectors {
        tile: &selectors::fortress::TILE,
        title: &selectors::fortress::TITLE,
        price: &selectors::fortress::PRICE,
    }
}
