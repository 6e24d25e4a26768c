use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;

use super::{PublishError, Publisher};
use crate::ingest::truncate_chars;

/// Default instance status limit.
pub const STATUS_MAX_CHARS: usize = 500;

#[derive(Clone)]
pub struct MastodonPublisher {
    base_url: String,
    access_token: String,
    client: Client,
}

impl MastodonPublisher {
    pub fn new(base_url: &str, access_token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("building Mastodon HTTP client")?;
        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            access_token: access_token.trim().to_string(),
            client,
        })
    }
}

#[async_trait::async_trait]
impl Publisher for MastodonPublisher {
    async fn publish(&self, text: &str) -> Result<(), PublishError> {
        if self.base_url.is_empty() || self.access_token.is_empty() {
            return Err(PublishError::MissingCredentials(
                "MASTODON_BASE_URL / MASTODON_ACCESS_TOKEN",
            ));
        }

        let body = serde_json::json!({ "status": truncate_chars(text, STATUS_MAX_CHARS) });
        let rsp = self
            .client
            .post(format!("{}/api/v1/statuses", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        let status = rsp.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = rsp.text().await.unwrap_or_default();
        Err(PublishError::Api {
            target: "mastodon",
            status,
            detail: detail.chars().take(200).collect(),
        })
    }

    fn name(&self) -> &'static str {
        "mastodon"
    }
}
