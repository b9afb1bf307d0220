//! Output formatting for search results (table, JSON, markdown, CSV).

use crate::config::OutputFormat;
use crate::search::{AggregatedProduct, AggregatedResult, SourceError};

/// Formats aggregated results for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a search result, including any per-source errors.
    pub fn format_result(&self, result: &AggregatedResult) -> String {
        match self.format {
            OutputFormat::Json => self.json_result(result),
            OutputFormat::Table => self.table_result(result),
            OutputFormat::Markdown => self.markdown_result(result),
            OutputFormat::Csv => self.csv_result(result),
        }
    }

    // JSON formatting

    fn json_result(&self, result: &AggregatedResult) -> String {
        serde_json::to_string_pretty(result)
            .unwrap_or_else(|_| r#"{"products":[],"errors":[]}"#.to_string())
    }

    // Table formatting

    fn table_result(&self, result: &AggregatedResult) -> String {
        let mut lines = Vec::new();

        if result.products.is_empty() {
            lines.push("No products found.".to_string());
        } else {
            lines.extend(self.table_products(&result.products));
        }

        if !result.errors.is_empty() {
            lines.push(String::new());
            lines.push("Errors:".to_string());
            for error in &result.errors {
                lines.push(format!("  {}: {}", error.source, error.message));
            }
        }

        lines.join("\n")
    }

    fn table_products(&self, products: &[AggregatedProduct]) -> Vec<String> {
        let price_width = 12;
        let currency_width = 8;
        let retailer_width = 14;
        let name_width = 50;

        let mut lines = Vec::new();

        lines.push(format!(
            "{:<price_width$}  {:<currency_width$}  {:<retailer_width$}  {}",
            "Price", "Currency", "Retailer", "Name"
        ));
        lines.push(format!(
            "{:-<price_width$}  {:-<currency_width$}  {:-<retailer_width$}  {:-<name_width$}",
            "", "", "", ""
        ));

        for product in products {
            lines.push(format!(
                "{:>price_width$}  {:<currency_width$}  {:<retailer_width$}  {}",
                format!("{:.2}", product.price),
                product.currency,
                truncate(&product.retailer, retailer_width),
                truncate(&product.name, name_width)
            ));
        }

        lines.push(String::new());
        lines.push(format!("Total: {} products", products.len()));

        lines
    }

    // Markdown formatting

    fn markdown_result(&self, result: &AggregatedResult) -> String {
        let mut lines = Vec::new();

        if result.products.is_empty() {
            lines.push("*No products found*".to_string());
        } else {
            lines.push("| Price | Currency | Retailer | Name |".to_string());
            lines.push("|-------|----------|----------|------|".to_string());

            for product in &result.products {
                let name = truncate(&product.name, 40).replace('|', "\\|");
                let name_cell = match &product.url {
                    Some(url) => format!("[{}]({})", name, url),
                    None => name,
                };

                lines.push(format!(
                    "| {:.2} | {} | {} | {} |",
                    product.price, product.currency, product.retailer, name_cell
                ));
            }

            lines.push(String::new());
            lines.push(format!("*{} products found*", result.products.len()));
        }

        if !result.errors.is_empty() {
            lines.push(String::new());
            lines.push("### Errors".to_string());
            lines.push(String::new());
            for error in &result.errors {
                lines.push(format!("- **{}:** {}", error.source, error.message));
            }
        }

        lines.join("\n")
    }

    // CSV formatting

    fn csv_header(&self) -> String {
        "id,name,retailer,price,currency,url".to_string()
    }

    fn csv_result(&self, result: &AggregatedResult) -> String {
        let mut lines = Vec::new();
        lines.push(self.csv_header());

        for product in &result.products {
            lines.push(format!(
                "{},{},{},{},{},{}",
                product.id,
                Self::csv_escape(&product.name),
                Self::csv_escape(&product.retailer),
                product.price,
                product.currency,
                product.url.as_deref().map(Self::csv_escape).unwrap_or_default()
            ));
        }

        // Errors go in a second section so the product rows stay uniform.
        if !result.errors.is_empty() {
            lines.push(String::new());
            lines.push("source,error".to_string());
            lines.extend(result.errors.iter().map(Self::csv_error));
        }

        lines.join("\n")
    }

    fn csv_error(error: &SourceError) -> String {
        format!("{},{}", Self::csv_escape(&error.source), Self::csv_escape(&error.message))
    }

    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let head: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn make_product(id: &str, name: &str, cents: i64, retailer: &str) -> AggregatedProduct {
        AggregatedProduct {
            id: id.to_string(),
            name: name.to_string(),
            retailer: retailer.to_string(),
            price: Decimal::new(cents, 2),
            currency: "HKD".to_string(),
            url: Some(format!("https://shop.example/p/{}", id)),
        }
    }

    fn make_result() -> AggregatedResult {
        AggregatedResult {
            products: vec![
                make_product("d11fae479cb4", "Sony A7C Mirrorless Camera", 1249000, "Broadway"),
                make_product("b35482c20d4f", "Apple iPhone 15 Pro, 256GB", 929900, "Price.com.hk"),
            ],
            errors: vec![SourceError::new("Fortress", "HTTP 503")],
        }
    }

    #[test]
    fn test_json_format() {
        let output = Formatter::new(OutputFormat::Json).format_result(&make_result());

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["products"][0]["id"], "d11fae479cb4");
        assert_eq!(parsed["products"][0]["price"], "12490.00");
        assert_eq!(parsed["errors"][0]["source"], "Fortress");
        assert_eq!(parsed["errors"][0]["message"], "HTTP 503");
    }

    #[test]
    fn test_json_format_empty() {
        let output = Formatter::new(OutputFormat::Json).format_result(&AggregatedResult::default());
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["products"].as_array().unwrap().len(), 0);
        assert_eq!(parsed["errors"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_table_format() {
        let output = Formatter::new(OutputFormat::Table).format_result(&make_result());

        assert!(output.contains("Price"));
        assert!(output.contains("Retailer"));
        assert!(output.contains("12490.00"));
        assert!(output.contains("Sony A7C Mirrorless Camera"));
        assert!(output.contains("Total: 2 products"));
        assert!(output.contains("Errors:"));
        assert!(output.contains("Fortress: HTTP 503"));
    }

    #[test]
    fn test_table_format_empty() {
        let output = Formatter::new(OutputFormat::Table).format_result(&AggregatedResult::default());
        assert_eq!(output, "No products found.");
    }

    #[test]
    fn test_table_truncates_long_names() {
        let long = "This is a very long product name that exceeds fifty characters and keeps going";
        let result = AggregatedResult {
            products: vec![make_product("x", long, 100, "Broadway")],
            errors: Vec::new(),
        };

        let output = Formatter::new(OutputFormat::Table).format_result(&result);
        assert!(output.contains("..."));
        assert!(!output.contains(long));
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("價格比較價格比較", 5), "價格...");
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn test_markdown_format() {
        let output = Formatter::new(OutputFormat::Markdown).format_result(&make_result());

        assert!(output.contains("| Price | Currency | Retailer | Name |"));
        assert!(output.contains("[Sony A7C Mirrorless Camera](https://shop.example/p/d11fae479cb4)"));
        assert!(output.contains("*2 products found*"));
        assert!(output.contains("### Errors"));
        assert!(output.contains("- **Fortress:** HTTP 503"));
    }

    #[test]
    fn test_markdown_without_url() {
        let mut product = make_product("x", "Plain", 500, "Shop");
        product.url = None;
        let result = AggregatedResult { products: vec![product], errors: Vec::new() };

        let output = Formatter::new(OutputFormat::Markdown).format_result(&result);
        assert!(output.contains("| 5.00 | HKD | Shop | Plain |"));
    }

    #[test]
    fn test_csv_format() {
        let output = Formatter::new(OutputFormat::Csv).format_result(&make_result());
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "id,name,retailer,price,currency,url");
        assert_eq!(
            lines[1],
            "d11fae479cb4,Sony A7C Mirrorless Camera,Broadway,12490.00,HKD,https://shop.example/p/d11fae479cb4"
        );
        assert!(lines[2].contains("\"Apple iPhone 15 Pro, 256GB\""));
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "source,error");
        assert_eq!(lines[5], "Fortress,HTTP 503");
    }

    #[test]
    fn test_csv_format_empty() {
        let output = Formatter::new(OutputFormat::Csv).format_result(&AggregatedResult::default());
        assert_eq!(output, "id,name,retailer,price,currency,url");
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(Formatter::csv_escape("simple"), "simple");
        assert_eq!(Formatter::csv_escape("with,comma"), "\"with,comma\"");
        assert_eq!(Formatter::csv_escape("with\"quote"), "\"with\"\"quote\"");
        assert_eq!(Formatter::csv_escape("with\nnewline"), "\"with\nnewline\"");
    }
}
