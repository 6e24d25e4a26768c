// src/ingest/fetcher.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::config::FetchSettings;
use crate::ingest::parser::parse_feed;
use crate::ingest::types::{FeedSource, FetchFeed, RawItem};

const FEED_ACCEPT: &str =
    "application/rss+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.9, */*;q=0.8";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
}

/// HTTP feed fetcher with a fixed-delay retry loop.
#[derive(Clone)]
pub struct FeedFetcher {
    client: Client,
    retries: u32,
    retry_delay: Duration,
}

impl FeedFetcher {
    pub fn new(cfg: &FetchSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(FEED_ACCEPT));
        let client = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .default_headers(headers)
            .timeout(cfg.timeout)
            .build()
            .context("building feed HTTP client")?;
        Ok(Self {
            client,
            retries: cfg.retries,
            retry_delay: cfg.retry_delay,
        })
    }

    async fn get_once(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let rsp = self.client.get(url).send().await?;
        let status = rsp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        Ok(rsp.bytes().await?.to_vec())
    }

    /// Body of `url`, retrying `retries` extra times with a fixed delay.
    pub async fn get_with_retries(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            match self.get_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    debug!(error = %e, url, attempt, "feed fetch failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl FetchFeed for FeedFetcher {
    async fn fetch(&self, source: &FeedSource) -> Vec<RawItem> {
        let body = match self.get_with_retries(source.url()).await {
            Ok(b) => b,
            Err(e) => {
                error!(error = %e, feed = %source, attempts = self.retries + 1, "feed unavailable");
                return Vec::new();
            }
        };
        let parsed = parse_feed(&body);
        for w in &parsed.warnings {
            warn!(feed = %source, warning = %w, "feed parse warning");
        }
        debug!(feed = %source, items = parsed.items.len(), "feed parsed");
        parsed.items
    }
}
