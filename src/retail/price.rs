//! Free-form price string normalization.

use crate::error::PriceParseError;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Converts a scraped price string into an exact decimal amount.
///
/// Everything except digits, `.` and `,` is discarded. Commas are always
/// thousands separators. Only the first `.` is kept as the decimal point and
/// the digits after any later dots are appended to the fraction, so
/// `"1.234.56"` becomes `1.23456`. A price without a decimal point gets `.00`.
pub fn normalize_price(raw: &str) -> Result<Decimal, PriceParseError> {
    let fail = || PriceParseError { raw: raw.to_string() };

    let cleaned: String =
        raw.chars().filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',').collect();
    // Separators alone are not a price.
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return Err(fail());
    }

    let without_commas = cleaned.replace(',', "");

    let mut number = match without_commas.split_once('.') {
        Some((whole, fraction)) => format!("{}.{}", whole, fraction.replace('.', "")),
        None => format!("{}.00", without_commas),
    };

    if number.starts_with('.') {
        number.insert(0, '0');
    }
    if number.ends_with('.') {
        number.push('0');
    }

    Decimal::from_str(&number).map_err(|_| fail())
}
