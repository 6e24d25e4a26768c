// src/config/sources.rs
//! Feed list, keyword lists, trusted domains and hashtag rules.
//!
//! Loaded from TOML or JSON (same schema). Lookup order:
//! 1) `$NEWS_SOURCES_PATH`
//! 2) `config/sources.toml`
//! 3) `config/sources.json`
//! 4) the copy of `config/sources.toml` compiled into the binary

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_SOURCES_PATH: &str = "NEWS_SOURCES_PATH";

const BUILTIN_SOURCES: &str = include_str!("../../config/sources.toml");

/// A keyword-triggered hashtag: `tag` is added when any trigger occurs in the text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HashtagTopic {
    pub tag: String,
    #[serde(default)]
    pub triggers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLists {
    pub feeds: Vec<String>,
    /// Lower-cased topic-exclusion keywords.
    pub negative_keywords: Vec<String>,
    /// Lower-cased positive/economic keywords.
    pub economic_keywords: Vec<String>,
    /// Lower-cased trusted domains (no `www.` prefix).
    pub whitelist_domains: Vec<String>,
    pub base_hashtags: Vec<String>,
    pub hashtag_topics: Vec<HashtagTopic>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSources {
    #[serde(default)]
    feeds: Vec<String>,
    #[serde(default)]
    keywords: RawKeywords,
    #[serde(default)]
    whitelist: RawWhitelist,
    #[serde(default)]
    hashtags: RawHashtags,
}

#[derive(Debug, Default, Deserialize)]
struct RawKeywords {
    #[serde(default)]
    negative: Vec<String>,
    #[serde(default)]
    economic: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawWhitelist {
    #[serde(default)]
    domains: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawHashtags {
    #[serde(default)]
    base: Vec<String>,
    #[serde(default)]
    topics: Vec<HashtagTopic>,
}

impl SourceLists {
    /// Load from an explicit path. Format is picked by extension, then by sniffing.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading sources from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_sources(&content, ext.as_str())
            .with_context(|| format!("parsing sources file {}", path.display()))
    }

    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_SOURCES_PATH} points to non-existent path"));
        }
        let toml_p = PathBuf::from("config/sources.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/sources.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Self::builtin()
    }

    pub fn builtin() -> Result<Self> {
        parse_toml(BUILTIN_SOURCES).context("parsing built-in sources")
    }
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<SourceLists> {
    if hint_ext == "json" || s.trim_start().starts_with('{') {
        if let Ok(v) = parse_json(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_toml(s) {
        return Ok(v);
    }
    if hint_ext != "json" {
        if let Ok(v) = parse_json(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported sources format"))
}

fn parse_toml(s: &str) -> Result<SourceLists> {
    let raw: RawSources = toml::from_str(s)?;
    Ok(raw.into())
}

fn parse_json(s: &str) -> Result<SourceLists> {
    let raw: RawSources = serde_json::from_str(s)?;
    Ok(raw.into())
}

impl From<RawSources> for SourceLists {
    fn from(raw: RawSources) -> Self {
        Self {
            feeds: clean_ordered(raw.feeds, false),
            negative_keywords: clean_ordered(raw.keywords.negative, true),
            economic_keywords: clean_ordered(raw.keywords.economic, true),
            whitelist_domains: clean_ordered(raw.whitelist.domains, true)
                .into_iter()
                .map(|d| d.trim_start_matches("www.").to_string())
                .collect(),
            base_hashtags: clean_ordered(raw.hashtags.base, false),
            hashtag_topics: raw
                .hashtags
                .topics
                .into_iter()
                .filter(|t| !t.tag.trim().is_empty())
                .map(|t| HashtagTopic {
                    tag: t.tag.trim().to_string(),
                    triggers: clean_ordered(t.triggers, true),
                })
                .collect(),
        }
    }
}

/// Trim, drop empties and duplicates, keep first-seen order.
pub(crate) fn clean_ordered(items: Vec<String>, lowercase: bool) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if t.is_empty() {
            continue;
        }
        let t = if lowercase {
            t.to_lowercase()
        } else {
            t.to_string()
        };
        if seen.insert(t.clone()) {
            out.push(t);
        }
    }
    out
}
