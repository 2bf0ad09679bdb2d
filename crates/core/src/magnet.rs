//! Magnet URI helpers.

use once_cell::sync::Lazy;
use regex_lite::Regex;

static BTIH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)urn:btih:([a-z0-9]+)").unwrap());

/// Extract the info hash from a magnet URI (lowercase). `None` when the
/// URI carries no `urn:btih:` component.
pub fn info_hash(magnet: &str) -> Option<String> {
    BTIH.captures(magnet)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// Read a query parameter from a magnet URI (percent-decoded).
pub fn query_param(magnet: &str, key: &str) -> Option<String> {
    let (_, query) = magnet.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| {
            urlencoding::decode(v)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| v.to_string())
        })
}

/// Caller-forced file index carried as `fileIndex` in the magnet query.
pub fn file_index(magnet: &str) -> Option<usize> {
    query_param(magnet, "fileIndex").and_then(|v| v.parse().ok())
}
