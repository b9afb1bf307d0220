//! Event-driven tile scanner for Price.com.hk result pages.
//!
//! Tiles are found by walking markup events with an explicit stack of open
//! elements. Each stack entry remembers which counters it incremented, so
//! closing it (explicitly, or implicitly when an ancestor closes) undoes
//! exactly those increments. A tile nested inside another tile only bumps the
//! tile depth; capture continues until the outermost tile closes.

use crate::error::CrawlError;
use crate::retail::markup::{self, Event};
use crate::retail::models::PriceQuote;
use crate::retail::price::normalize_price;
use crate::retail::selectors::price_dot_com::{PRICE_CLASS, PRICE_VALUE_CLASS, TILE_CLASS, TITLE_CLASS};
use tracing::{debug, trace};
use url::Url;

/// Text captured for one tile before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTile {
    pub name: String,
    pub price: String,
    pub url: String,
    pub currency: Option<String>,
}

#[derive(Debug, Default)]
struct OpenElement {
    name: String,
    opens_tile: bool,
    opens_title: bool,
    opens_price: bool,
    captures_name: bool,
    captures_price: bool,
}

#[derive(Debug, Default)]
struct TileAccumulator {
    name: String,
    price: String,
    url: Option<String>,
    currency: Option<String>,
    depth: usize,
}

#[derive(Debug, Default)]
struct ScanState {
    stack: Vec<OpenElement>,
    current: Option<TileAccumulator>,
    title_depth: usize,
    price_depth: usize,
    capture_name: usize,
    capture_price: usize,
    tiles: Vec<RawTile>,
}

impl ScanState {
    fn start(&mut self, event: &Event) {
        let Event::Start { name, self_closing, .. } = event else {
            return;
        };

        let mut element = OpenElement { name: name.clone(), ..Default::default() };

        if name == "div" && event.has_class(TILE_CLASS) {
            match self.current.as_mut() {
                Some(tile) => tile.depth += 1,
                None => self.current = Some(TileAccumulator { depth: 1, ..Default::default() }),
            }
            element.opens_tile = true;
        } else if let Some(tile) = self.current.as_mut() {
            if name == "div" && event.has_class(TITLE_CLASS) {
                self.title_depth += 1;
                element.opens_title = true;
            }
            if name == "div" && event.has_class(PRICE_CLASS) {
                self.price_depth += 1;
                element.opens_price = true;
            }
            if name == "a" && self.title_depth > 0 {
                if let Some(href) = event.attr("href") {
                    self.capture_name += 1;
                    element.captures_name = true;
                    if tile.url.is_none() {
                        tile.url = Some(href.to_string());
                    }
                }
            }
            if name == "span" && self.price_depth > 0 && event.has_class(PRICE_VALUE_CLASS) {
                self.capture_price += 1;
                element.captures_price = true;
                if tile.currency.is_none() {
                    tile.currency = event.attr("data-currency").map(str::to_string);
                }
            }
        }

        if *self_closing {
            self.close(element);
        } else {
            self.stack.push(element);
        }
    }

    fn end(&mut self, name: &str) {
        // Unmatched end tags are ignored; a match implicitly closes everything above it.
        let Some(index) = self.stack.iter().rposition(|open| open.name == name) else {
            return;
        };
        while self.stack.len() > index {
            if let Some(element) = self.stack.pop() {
                self.close(element);
            }
        }
    }

    fn close(&mut self, element: OpenElement) {
        if element.captures_name {
            self.capture_name -= 1;
        }
        if element.captures_price {
            self.capture_price -= 1;
        }
        if element.opens_title {
            self.title_depth -= 1;
        }
        if element.opens_price {
            self.price_depth -= 1;
        }
        if element.opens_tile {
            let finished = match self.current.as_mut() {
                Some(tile) => {
                    tile.depth -= 1;
                    tile.depth == 0
                }
                None => false,
            };
            if finished {
                if let Some(tile) = self.current.take() {
                    self.finish(tile);
                }
            }
        }
    }

    fn finish(&mut self, tile: TileAccumulator) {
        let name = tile.name.trim().to_string();
        let price = tile.price.trim().to_string();
        // Names are only captured inside `a[href]`, so a named tile always has a link.
        let Some(url) = tile.url.filter(|_| !name.is_empty() && !price.is_empty()) else {
            trace!("Dropping tile without name or price");
            return;
        };
        self.tiles.push(RawTile { name, price, url, currency: tile.currency });
    }

    fn text(&mut self, text: &str) {
        let Some(tile) = self.current.as_mut() else {
            return;
        };
        if self.capture_name > 0 {
            tile.name.push_str(text);
        }
        if self.capture_price > 0 {
            tile.price.push_str(text);
        }
    }
}

/// Scans markup for complete product tiles.
pub fn scan_tiles(html: &str) -> Result<Vec<RawTile>, CrawlError> {
    let mut state = ScanState::default();

    for event in markup::tokenize(html)? {
        match &event {
            Event::Start { .. } => state.start(&event),
            Event::End { name } => state.end(name),
            Event::Text(text) => state.text(text),
        }
    }

    if state.current.is_some() {
        debug!("Discarding tile left open at end of document");
    }

    Ok(state.tiles)
}

/// Parses a Price.com.hk search page into quotes.
///
/// Links resolve against the origin of `page_url`.
pub fn parse_search(
    html: &str,
    page_url: &Url,
    retailer: &str,
    default_currency: &str,
) -> Result<Vec<PriceQuote>, CrawlError> {
    let tiles = scan_tiles(html)?;
    let origin = page_url.join("/").unwrap_or_else(|_| page_url.clone());

    let mut quotes = Vec::with_capacity(tiles.len());
    for tile in tiles {
        let Ok(url) = origin.join(tile.url.trim()) else {
            trace!("Skipping tile with unusable link: {}", tile.url);
            continue;
        };
        let price = match normalize_price(&tile.price) {
            Ok(price) => price,
            Err(e) => {
                debug!("{}: {}", retailer, e);
                continue;
            }
        };
        let currency = tile
            .currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(default_currency);

        quotes.push(PriceQuote::new(retailer, tile.name, price, currency, url.to_string()));
    }

    debug!("Parsed {} quotes from {}", quotes.len(), retailer);
    Ok(quotes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn tile_html(name: &str, href: &str, price: &str) -> String {
        format!(
            r#"<div class="product-list-item">
                 <div class="product-list-item__title"><a href="{}">{}</a></div>
                 <div class="product-list-item__price">
                   <span class="product-price__value">{}</span>
                 </div>
               </div>"#,
            href, name, price
        )
    }

    #[test]
    fn test_scan_simple_tiles() {
        let html = format!(
            "<html><body>{}{}</body></html>",
            tile_html("Apple iPhone 15 Pro 256GB", "/product/iphone", "HK$9,299"),
            tile_html("Sony WH-1000XM5", "/product/sony", "HK$2,999")
        );

        let tiles = scan_tiles(&html).unwrap();
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[0].name, "Apple iPhone 15 Pro 256GB");
        assert_eq!(tiles[0].price, "HK$9,299");
        assert_eq!(tiles[0].url, "/product/iphone");
        assert_eq!(tiles[1].name, "Sony WH-1000XM5");
    }

    #[test]
    fn test_nested_tile_keeps_capturing_until_outer_closes() {
        let html = r#"
            <div class="product-list-item">
              <div class="product-list-item__title"><a href="/product/outer">Outer</a></div>
              <div class="product-list-item">
                <div class="product-list-item__title"><a href="/product/inner"> Inner</a></div>
              </div>
              <div class="product-list-item__price">
                <span class="product-price__value">HK$1,000</span>
              </div>
            </div>
        "#;

        let tiles = scan_tiles(html).unwrap();
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].name, "Outer Inner");
        assert_eq!(tiles[0].price, "HK$1,000");
        assert_eq!(tiles[0].url, "/product/outer");
    }

    #[test]
    fn test_text_outside_capture_is_ignored() {
        let html = r#"
            <div class="product-list-item">
              <span>Sponsored</span>
              <div class="product-list-item__title">
                <span>Brand:</span><a href="/p/1">Widget <em>Pro</em></a>
              </div>
              <div class="product-list-item__price">
                <span class="product-price__old">HK$500</span>
                <span class="product-price__value">HK$<b>399</b></span>
              </div>
            </div>
        "#;

        let tiles = scan_tiles(html).unwrap();
        assert_eq!(tiles[0].name, "Widget Pro");
        assert_eq!(tiles[0].price, "HK$399");
    }

    #[test]
    fn test_void_elements_do_not_unbalance_stack() {
        let html = r#"
            <div class="product-list-item">
              <img src="/thumb.jpg">
              <div class="product-list-item__title"><a href="/p/1">Camera<br>Kit</a></div>
              <div class="product-list-item__price"><span class="product-price__value">100</span></div>
            </div>
            <div class="product-list-item">
              <div class="product-list-item__title"><a href="/p/2">Lens</a></div>
              <div class="product-list-item__price"><span class="product-price__value">200</span></div>
            </div>
        "#;

        let tiles = scan_tiles(html).unwrap();
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[0].name, "CameraKit");
        assert_eq!(tiles[1].name, "Lens");
    }

    #[test]
    fn test_unclosed_inner_elements_close_with_tile() {
        let html = r#"
            <div class="product-list-item">
              <div class="product-list-item__title"><a href="/p/1">Unclosed link
              <div class="product-list-item__price"><span class="product-price__value">50</span></div>
            </div></div></div>
            <div class="product-list-item">
              <div class="product-list-item__title"><a href="/p/2">Next</a></div>
              <div class="product-list-item__price"><span class="product-price__value">60</span></div>
            </div>
        "#;

        let tiles = scan_tiles(html).unwrap();
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[1].name, "Next");
        assert_eq!(tiles[1].price, "60");
    }

    #[test]
    fn test_character_references_are_decoded() {
        let html = tile_html("Caf&eacute; Machine &ndash; Pro", "/product/caf&eacute;?a=1&amp;b=2", "HK&#36;1,299");

        let tiles = scan_tiles(&html).unwrap();
        assert_eq!(tiles[0].name, "Café Machine – Pro");
        assert_eq!(tiles[0].url, "/product/café?a=1&b=2");
        assert_eq!(tiles[0].price, "HK$1,299");
    }

    #[test]
    fn test_tile_without_price_is_dropped() {
        let html = r#"
            <div class="product-list-item">
              <div class="product-list-item__title"><a href="/p/1">No price</a></div>
            </div>
        "#;
        assert!(scan_tiles(html).unwrap().is_empty());
    }

    #[test]
    fn test_title_without_link_captures_nothing() {
        let html = r#"
            <div class="product-list-item">
              <div class="product-list-item__title"><a>Anchorless</a></div>
              <div class="product-list-item__price"><span class="product-price__value">50</span></div>
            </div>
        "#;
        assert!(scan_tiles(html).unwrap().is_empty());
    }

    #[test]
    fn test_unclosed_tile_is_discarded() {
        let html = r#"
            <div class="product-list-item">
              <div class="product-list-item__title"><a href="/p/1">Open</a></div>
              <div class="product-list-item__price"><span class="product-price__value">50</span></div>
        "#;
        assert!(scan_tiles(html).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_markup_fails() {
        let html = r#"<div class="product-list-item"><div class="product-list-item__title"><a href="/p/1"#;
        assert!(matches!(scan_tiles(html), Err(CrawlError::Parse(_))));
    }

    #[test]
    fn test_parse_search_builds_quotes() {
        let html = format!(
            "{}{}{}",
            tile_html("Good", "/product/good", "HK$1,299.50"),
            tile_html("Bad price", "/product/bad", "Call us"),
            tile_html("Absolute", "http://www.price.com.hk/product/abs", "99"),
        );
        let page = Url::parse("https://www.price.com.hk/search.php").unwrap();

        let quotes = parse_search(&html, &page, "Price.com.hk", "HKD").unwrap();

        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].retailer, "Price.com.hk");
        assert_eq!(quotes[0].name, "Good");
        assert_eq!(quotes[0].price, Decimal::from_str("1299.50").unwrap());
        assert_eq!(quotes[0].currency, "HKD");
        assert_eq!(quotes[0].url, "https://www.price.com.hk/product/good");
        assert_eq!(quotes[1].url, "http://www.price.com.hk/product/abs");
        assert_eq!(quotes[1].price, Decimal::from_str("99.00").unwrap());
    }

    #[test]
    fn test_parse_search_reads_currency_marker() {
        let html = r#"
            <div class="product-list-item">
              <div class="product-list-item__title"><a href="/p/1">Imported</a></div>
              <div class="product-list-item__price">
                <span class="product-price__value" data-currency="JPY">¥12,000</span>
              </div>
            </div>
        "#;
        let page = Url::parse("https://www.price.com.hk/search.php").unwrap();

        let quotes = parse_search(html, &page, "Price.com.hk", "HKD").unwrap();
        assert_eq!(quotes[0].currency, "JPY");
        assert_eq!(quotes[0].price, Decimal::from_str("12000").unwrap());
    }
}
