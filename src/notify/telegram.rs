use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{PublishError, Publisher};

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct TelegramPublisher {
    token: String,
    chat_id: String,
    api_base: String,
    client: Client,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramPublisher {
    /// Credentials may be empty; `publish` then fails with `MissingCredentials`.
    pub fn new(token: &str, chat_id: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("building Telegram HTTP client")?;
        Ok(Self {
            token: token.trim().to_string(),
            chat_id: chat_id.trim().to_string(),
            api_base: TELEGRAM_API.to_string(),
            client,
        })
    }

    /// Override the Bot API host (tests, self-hosted Bot API servers).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait::async_trait]
impl Publisher for TelegramPublisher {
    async fn publish(&self, text: &str) -> Result<(), PublishError> {
        if self.token.is_empty() || self.chat_id.is_empty() {
            return Err(PublishError::MissingCredentials(
                "TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID",
            ));
        }

        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            disable_web_page_preview: false,
        };
        let rsp = self.client.post(url).json(&payload).send().await?;
        let status = rsp.status();
        let body = rsp.text().await?;

        match serde_json::from_str::<ApiReply>(&body) {
            Ok(reply) if reply.ok => Ok(()),
            Ok(reply) => Err(PublishError::Api {
                target: "telegram",
                status,
                detail: reply.description.unwrap_or_else(|| "ok=false".to_string()),
            }),
            Err(_) => Err(PublishError::Api {
                target: "telegram",
                status,
                detail: format!("unreadable reply: {}", body.chars().take(200).collect::<String>()),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
