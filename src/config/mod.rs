// src/config/mod.rs
//! Process configuration, read once at startup and handed to each component
//! by section (`settings.fetch`, `settings.filter`, ...).

pub mod ai;
pub mod sources;

use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub use ai::AiSettings;
pub use sources::{HashtagTopic, SourceLists};

pub const DEFAULT_TIMEZONE: &str = "Europe/Rome";
pub const DEFAULT_CACHE_PATH: &str = "finance_news_cache.json";
pub const DEFAULT_USER_AGENT: &str =
    "finance-news-relay/0.1 (+https://github.com/finance-news-relay; RSS/Atom reader)";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub timeout: Duration,
    /// Extra attempts after the first one.
    pub retries: u32,
    pub retry_delay: Duration,
    pub concurrency: usize,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            retries: 2,
            retry_delay: Duration::from_secs(3),
            concurrency: 4,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterSettings {
    pub freshness: chrono::Duration,
    pub timezone: Tz,
    pub require_economic: bool,
    pub negative_keywords: Vec<String>,
    pub economic_keywords: Vec<String>,
    pub user_keywords: Vec<String>,
    pub whitelist_domains: Vec<String>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            freshness: chrono::Duration::minutes(360),
            timezone: chrono_tz::Europe::Rome,
            require_economic: false,
            negative_keywords: Vec::new(),
            economic_keywords: Vec::new(),
            user_keywords: Vec::new(),
            whitelist_domains: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComposeSettings {
    pub max_summary_len: usize,
    pub max_comment_len: usize,
    pub hashtag_max: usize,
    pub base_hashtags: Vec<String>,
    pub hashtag_topics: Vec<HashtagTopic>,
}

impl Default for ComposeSettings {
    fn default() -> Self {
        Self {
            max_summary_len: 240,
            max_comment_len: 200,
            hashtag_max: 5,
            base_hashtags: Vec::new(),
            hashtag_topics: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PublishSettings {
    pub dry_run: bool,
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub mastodon_enabled: bool,
    pub mastodon_base_url: String,
    pub mastodon_access_token: String,
}

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub budget: Duration,
    pub post_limit: usize,
    pub post_delay: Duration,
    pub cache_path: PathBuf,
    pub timezone: Tz,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            budget: Duration::from_secs(600),
            post_limit: 6,
            post_delay: Duration::from_secs(2),
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            timezone: chrono_tz::Europe::Rome,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub feeds: Vec<String>,
    pub fetch: FetchSettings,
    pub filter: FilterSettings,
    pub compose: ComposeSettings,
    pub ai: AiSettings,
    pub publish: PublishSettings,
    pub run: RunSettings,
}

/// Load a dotenv file into the process environment, replacing variables that
/// are already set. Returns false when the file is missing or unreadable.
pub fn load_env_file(path: &Path) -> bool {
    match dotenvy::from_path_override(path) {
        Ok(()) => true,
        Err(e) if e.not_found() => false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable env file");
            false
        }
    }
}

impl Settings {
    /// Read the process environment plus the sources file.
    pub fn from_env() -> Result<Self> {
        let lists = SourceLists::load_default()?;
        Self::from_lookup(|k| std::env::var(k).ok(), lists)
    }

    /// Build settings from any key lookup. Unparseable numbers and flags fall back
    /// to defaults with a warning; an unknown timezone is an error.
    pub fn from_lookup<F>(get: F, lists: SourceLists) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let tz_raw = get("TIMEZONE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone =
            Tz::from_str(&tz_raw).map_err(|e| anyhow!("invalid TIMEZONE `{tz_raw}`: {e}"))?;

        let feeds = match get("FEEDS") {
            Some(raw) if !split_list(&raw).is_empty() => {
                sources::clean_ordered(split_list(&raw), false)
            }
            _ => lists.feeds,
        };

        let fetch_defaults = FetchSettings::default();
        let fetch = FetchSettings {
            timeout: Duration::from_secs(num(&get, "FETCH_TIMEOUT_SECS", 20u64)),
            retries: num(&get, "FETCH_RETRIES", fetch_defaults.retries),
            retry_delay: Duration::from_secs(num(&get, "FETCH_RETRY_DELAY_SECS", 3u64)),
            concurrency: num(&get, "FETCH_CONCURRENCY", fetch_defaults.concurrency).max(1),
            user_agent: fetch_defaults.user_agent,
        };

        let filter = FilterSettings {
            freshness: chrono::Duration::minutes(num(&get, "FRESHNESS_MINUTES", 360i64)),
            timezone,
            require_economic: flag(&get, "REQUIRE_ECONOMIC_RELEVANCE", true),
            negative_keywords: lists.negative_keywords,
            economic_keywords: lists.economic_keywords,
            user_keywords: sources::clean_ordered(
                get("KEYWORDS").map(|s| split_list(&s)).unwrap_or_default(),
                true,
            ),
            whitelist_domains: lists.whitelist_domains,
        };

        let compose_defaults = ComposeSettings::default();
        let compose = ComposeSettings {
            max_summary_len: num(&get, "MAX_SUMMARY_LEN", compose_defaults.max_summary_len),
            max_comment_len: num(&get, "MAX_COMMENT_LEN", compose_defaults.max_comment_len),
            hashtag_max: num(&get, "HASHTAG_MAX", compose_defaults.hashtag_max),
            base_hashtags: lists.base_hashtags,
            hashtag_topics: lists.hashtag_topics,
        };

        let publish = PublishSettings {
            dry_run: flag(&get, "DRY_RUN", true),
            telegram_token: text(&get, "TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: text(&get, "TELEGRAM_CHAT_ID"),
            mastodon_enabled: flag(&get, "MASTODON_ENABLED", false),
            mastodon_base_url: text(&get, "MASTODON_BASE_URL"),
            mastodon_access_token: text(&get, "MASTODON_ACCESS_TOKEN"),
        };

        let run = RunSettings {
            budget: Duration::from_secs(num(&get, "RUN_BUDGET_SECS", 600u64)),
            post_limit: num(&get, "POST_LIMIT_PER_RUN", 6usize),
            post_delay: Duration::from_secs(num(&get, "POST_DELAY_SECS", 2u64)),
            cache_path: get("CACHE_PATH")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH)),
            timezone,
        };

        Ok(Self {
            feeds,
            fetch,
            filter,
            compose,
            ai: AiSettings::from_lookup(&get),
            publish,
            run,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn text<F: Fn(&str) -> Option<String>>(get: &F, key: &str) -> String {
    get(key).unwrap_or_default().trim().to_string()
}

fn num<T, F>(get: &F, key: &str, default: T) -> T
where
    T: FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => default,
        Some(raw) if raw.trim().is_empty() => default,
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!(key, value = %raw, "unparseable number, using default");
            default
        }),
    }
}

fn flag<F: Fn(&str) -> Option<String>>(get: &F, key: &str, default: bool) -> bool {
    let Some(raw) = get(key) else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        "" => default,
        other => {
            warn!(key, value = other, "unparseable flag, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::from_lookup(lookup(&[]), SourceLists::default()).unwrap();
        assert!(s.publish.dry_run);
        assert!(s.filter.require_economic);
        assert_eq!(s.run.post_limit, 6);
        assert_eq!(s.compose.max_summary_len, 240);
        assert_eq!(s.filter.freshness, chrono::Duration::minutes(360));
        assert_eq!(s.run.timezone, chrono_tz::Europe::Rome);
        assert_eq!(s.run.cache_path, PathBuf::from(DEFAULT_CACHE_PATH));
        assert_eq!(s.fetch.retries, 2);
    }

    #[test]
    fn env_overrides_lists_and_numbers() {
        let lists = SourceLists {
            feeds: vec!["https://from-file.test/rss".into()],
            ..Default::default()
        };
        let s = Settings::from_lookup(
            lookup(&[
                ("FEEDS", "https://a.test/rss, ,https://b.test/atom"),
                ("KEYWORDS", "BTP, spread"),
                ("POST_LIMIT_PER_RUN", "3"),
                ("DRY_RUN", "false"),
                ("FRESHNESS_MINUTES", "oops"),
                ("TIMEZONE", "America/New_York"),
            ]),
            lists,
        )
        .unwrap();
        assert_eq!(s.feeds, vec!["https://a.test/rss", "https://b.test/atom"]);
        assert_eq!(s.filter.user_keywords, vec!["btp", "spread"]);
        assert_eq!(s.run.post_limit, 3);
        assert!(!s.publish.dry_run);
        assert_eq!(s.filter.freshness, chrono::Duration::minutes(360));
        assert_eq!(s.filter.timezone, chrono_tz::America::New_York);
    }

    #[test]
    fn feeds_fall_back_to_sources_file() {
        let lists = SourceLists {
            feeds: vec!["https://from-file.test/rss".into()],
            ..Default::default()
        };
        let s = Settings::from_lookup(lookup(&[("FEEDS", " , ")]), lists).unwrap();
        assert_eq!(s.feeds, vec!["https://from-file.test/rss"]);
    }

    #[test]
    fn unknown_timezone_is_an_error() {
        let err = Settings::from_lookup(lookup(&[("TIMEZONE", "Mars/Olympus")]), SourceLists::default());
        assert!(err.is_err());
    }
}
