// src/ingest/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// URL of one remote feed endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedSource(String);

impl FeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn url(&self) -> &str {
        &self.0
    }
}

impl From<String> for FeedSource {
    fn from(url: String) -> Self {
        Self(url)
    }
}

impl From<&str> for FeedSource {
    fn from(url: &str) -> Self {
        Self(url.to_string())
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry as parsed from a feed. Timestamps are kept verbatim; see `ingest::dates`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawItem {
    pub id: Option<String>,
    pub title: String,
    pub link: Option<String>,
    /// Raw markup (HTML allowed).
    pub summary: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub created: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[async_trait::async_trait]
pub trait FetchFeed: Send + Sync {
    /// Never fails: an unreachable or unparseable feed yields an empty vec.
    async fn fetch(&self, source: &FeedSource) -> Vec<RawItem>;
}
