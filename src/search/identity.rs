//! Stable surrogate identifiers for products that carry no catalog SKU.

use percent_encoding::percent_decode_str;
use sha1::{Digest, Sha1};
use url::Url;

/// Length of a derived identifier in hex characters.
pub const ID_LEN: usize = 12;

/// Derives a product identifier from its name and, when present, the last
/// path segment of its URL.
///
/// The name is lower-cased with whitespace runs collapsed, so cosmetic
/// differences between retailers map to the same id. Relative URLs are
/// accepted, and the segment is percent-decoded so an encoded and a raw
/// slug give the same id.
pub fn derive_id(name: &str, url: Option<&str>) -> String {
    let name_key = name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();

    let key = match url.and_then(last_path_segment) {
        Some(segment) => format!("{}|{}", name_key, segment),
        None => name_key,
    };

    let digest = Sha1::digest(key.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(ID_LEN);
    id
}

fn last_path_segment(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        // Relative link: drop query and fragment by hand.
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }

    trimmed
        .rsplit('/')
        .next()
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().to_lowercase())
}
