// src/ingest/mod.rs
pub mod dates;
pub mod fetcher;
pub mod parser;
pub mod types;

use once_cell::sync::OnceCell;
use regex::Regex;

pub use fetcher::{FeedFetcher, FetchError};
pub use parser::{parse_feed, ParsedFeed};
pub use types::{FeedSource, FetchFeed, RawItem};

/// Plain text from a feed summary: strip tags, decode entities, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)<[^>]*>").unwrap());
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());

    // Tags become spaces so "<p>a</p><p>b</p>" does not glue words together.
    let out = re_tags.replace_all(s, " ");
    let out = html_escape::decode_html_entities(&out);
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// First `max` chars of `s` (char boundaries, not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Host of `link` without a leading `www.`; empty when the link does not parse.
pub fn source_domain(link: &str) -> String {
    url::Url::parse(link.trim())
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .map(|h| h.strip_prefix("www.").map(str::to_string).unwrap_or(h))
        .unwrap_or_default()
}

/// Exact or sub-domain match against a list of bare domains.
pub fn is_whitelisted<S: AsRef<str>>(domain: S, whitelist: &[String]) -> bool {
    let d = domain.as_ref().to_ascii_lowercase();
    if d.is_empty() {
        return false;
    }
    whitelist.iter().any(|w| {
        let w = w.to_ascii_lowercase();
        d == w || d.ends_with(&format!(".{w}"))
    })
}
