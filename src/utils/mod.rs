//! Utility functions and helpers.

pub mod http;
pub mod logging;

use chrono::Local;
use regex::Regex;
use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Build the list page URL for a page offset.
pub fn page_url(base_url: &str, offset: usize) -> String {
    format!("{}/top250?start={}&filter=", base_url.trim_end_matches('/'), offset)
}

/// Extract the first run of decimal digits in `text`.
///
/// Thousands separators inside the run are skipped, so `"1,234人评价"`
/// yields `1234`. Returns `None` when the text has no digit or the run
/// overflows.
pub fn first_number(text: &str) -> Option<u64> {
    let re = Regex::new(r"[0-9][0-9,]*").ok()?;
    let run = re.find(text)?.as_str();
    let digits: String = run.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Local timestamp usable in file names.
pub fn timestamp_slug() -> String {
    Local::now().format("%Y-%m-%dT%H-%M-%S").to_string()
}
