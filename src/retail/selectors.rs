//! CSS selectors for retailer search result pages.
//!
//! This file contains the selectors used by the DOM-based parsers.
//! Update this file when a retailer changes its HTML structure.
//!
//! **Update process**: When parsing fails, capture HTML sample,
//! update selectors, and add test fixture.

use scraper::Selector;
use std::sync::LazyLock;

/// First link carrying an href, shared by every retailer.
pub static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Selectors for Broadway search results.
pub mod broadway {
    use super::*;

    /// Product card container.
    pub static TILE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("li.product-card").unwrap());

    /// Product title text.
    pub static TITLE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("span.product-card__title").unwrap());

    /// Price text; may carry a `data-currency` attribute.
    pub static PRICE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("span.product-card__price").unwrap());
}

/// Selectors for Fortress search results.
pub mod fortress {
    use super::*;

    /// Product tile container.
    pub static TILE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("div.product-tile").unwrap());

    /// Product title text.
    pub static TITLE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("div.product-title").unwrap());

    /// Price text; may carry a `data-currency` attribute.
    pub static PRICE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("div.product-price").unwrap());
}

/// Class markers for the Price.com.hk event scanner.
pub mod price_dot_com {
    /// Product tile container (`div`).
    pub const TILE_CLASS: &str = "product-list-item";

    /// Title block (`div`); the link inside carries the product name.
    pub const TITLE_CLASS: &str = "product-list-item__title";

    /// Price block (`div`).
    pub const PRICE_CLASS: &str = "product-list-item__price";

    /// Price value (`span`) inside the price block.
    pub const PRICE_VALUE_CLASS: &str = "product-price__value";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_selectors_parse() {
        // Force every LazyLock so a typo fails here, not in a parser.
        let all: [&Selector; 7] = [
            &LINK,
            &broadway::TILE,
            &broadway::TITLE,
            &broadway::PRICE,
            &fortress::TILE,
            &fortress::TITLE,
            &fortress::PRICE,
        ];
        assert_eq!(all.len(), 7);
    }
}
