// src/relevance.rs
//! Relevance gate: title, freshness, negative keywords, economic relevance and
//! user keywords, checked in that order.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use metrics::counter;
use tracing::debug;

use crate::config::FilterSettings;
use crate::ingest::dates::effective_timestamp;
use crate::ingest::types::RawItem;
use crate::ingest::{clean_text, is_whitelisted, source_domain};

/// Why an item was dropped. The first failing check wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyTitle,
    Stale,
    NegativeKeyword,
    NotEconomic,
    NoUserKeyword,
}

impl Rejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rejection::EmptyTitle => "empty_title",
            Rejection::Stale => "stale",
            Rejection::NegativeKeyword => "negative_keyword",
            Rejection::NotEconomic => "not_economic",
            Rejection::NoUserKeyword => "no_user_keyword",
        }
    }
}

pub struct RelevanceFilter {
    freshness: Duration,
    timezone: Tz,
    require_economic: bool,
    negative: Vec<String>,
    economic: Vec<String>,
    user: Vec<String>,
    whitelist: Vec<String>,
}

impl RelevanceFilter {
    pub fn new(cfg: &FilterSettings) -> Self {
        let lower = |v: &[String]| -> Vec<String> {
            v.iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        Self {
            freshness: cfg.freshness,
            timezone: cfg.timezone,
            require_economic: cfg.require_economic,
            negative: lower(&cfg.negative_keywords),
            economic: lower(&cfg.economic_keywords),
            user: lower(&cfg.user_keywords),
            whitelist: lower(&cfg.whitelist_domains),
        }
    }

    /// Keep the items that pass every check, in input order.
    pub fn filter(&self, items: Vec<RawItem>, now: DateTime<Utc>) -> Vec<RawItem> {
        items
            .into_iter()
            .filter(|item| match self.check(item, now) {
                Ok(()) => true,
                Err(why) => {
                    debug!(title = %item.title, reason = why.as_str(), "item filtered");
                    counter!(crate::metrics::RELEVANCE_REJECTED, "reason" => why.as_str()).increment(1);
                    false
                }
            })
            .collect()
    }

    pub fn check(&self, item: &RawItem, now: DateTime<Utc>) -> Result<(), Rejection> {
        if item.title.trim().is_empty() {
            return Err(Rejection::EmptyTitle);
        }

        if let Some(ts) = effective_timestamp(item, self.timezone) {
            if now - ts > self.freshness {
                return Err(Rejection::Stale);
            }
        }

        let text = searchable_text(item);
        if contains_any(&text, &self.negative) {
            return Err(Rejection::NegativeKeyword);
        }

        if self.require_economic {
            let domain = item.link.as_deref().map(source_domain).unwrap_or_default();
            if !is_whitelisted(&domain, &self.whitelist) && !contains_any(&text, &self.economic) {
                return Err(Rejection::NotEconomic);
            }
        }

        if !self.user.is_empty() && !contains_any(&text, &self.user) {
            return Err(Rejection::NoUserKeyword);
        }
        Ok(())
    }
}

/// Lower-cased title + cleaned summary + tag terms.
fn searchable_text(item: &RawItem) -> String {
    let mut parts = vec![item.title.clone()];
    if let Some(s) = item.summary.as_deref() {
        parts.push(clean_text(s));
    }
    parts.extend(item.tags.iter().cloned());
    parts.join(" ").to_lowercase()
}

fn contains_any(text: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| text.contains(n.as_str()))
}
