//! Text backend for summaries and comments: provider trait, OpenAI chat
//! completions, a deterministic mock, and response sanitization.
//!
//! Every call may fail; callers fall back locally and never surface a
//! `BackendError` past the composer.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::AiSettings;
use crate::ingest::truncate_chars;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned status {0}")]
    Status(StatusCode),
    #[error("backend returned an empty answer")]
    Empty,
}

/// One instruction + input pair sent to the backend.
#[derive(Debug, Clone, Copy)]
pub struct Prompt<'a> {
    pub system: &'a str,
    pub input: &'a str,
    pub max_tokens: u32,
}

pub trait TextBackend: Send + Sync {
    fn complete<'a>(
        &'a self,
        prompt: Prompt<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, BackendError>> + Send + 'a>>;
    /// Provider name for logs.
    fn name(&self) -> &'static str;
}

pub type DynBackend = Arc<dyn TextBackend>;

/// Pick a backend from settings and environment.
///
/// * `AI_TEST_MODE=mock` gives a deterministic mock.
/// * Otherwise `LLM_PROVIDER=openai` plus an API key gives the OpenAI backend.
/// * Anything else disables the backend (`None`).
pub fn build_backend(cfg: &AiSettings) -> Option<DynBackend> {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        info!("text backend: mock");
        return Some(Arc::new(MockBackend::default()));
    }
    if !cfg.is_enabled() {
        info!(provider = %cfg.provider, "text backend disabled");
        return None;
    }
    match OpenAiBackend::new(cfg) {
        Ok(b) => {
            info!(model = %cfg.model, "text backend: openai");
            Some(Arc::new(b))
        }
        Err(e) => {
            warn!(error = ?e, "text backend unavailable, continuing without it");
            None
        }
    }
}

/// OpenAI Chat Completions.
pub struct OpenAiBackend {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiBackend {
    pub fn new(cfg: &AiSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(crate::config::DEFAULT_USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .context("building OpenAI HTTP client")?;
        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            endpoint: OPENAI_CHAT_URL.to_string(),
        })
    }

    /// Point at a compatible endpoint (local proxies, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl TextBackend for OpenAiBackend {
    fn complete<'a>(
        &'a self,
        prompt: Prompt<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, BackendError>> + Send + 'a>> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
                max_tokens: u32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: Option<String>,
            }

            let req = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: prompt.system,
                    },
                    Msg {
                        role: "user",
                        content: prompt.input,
                    },
                ],
                temperature: 0.3,
                max_tokens: prompt.max_tokens,
            };

            let resp = self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await?;
            if !resp.status().is_success() {
                return Err(BackendError::Status(resp.status()));
            }
            let body: Resp = resp.json().await?;
            let content = body
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .unwrap_or_default();
            let cleaned = sanitize_line(&content);
            if cleaned.is_empty() {
                Err(BackendError::Empty)
            } else {
                Ok(cleaned)
            }
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Deterministic backend for tests and local runs.
#[derive(Debug, Clone)]
pub struct MockBackend {
    pub fixed: String,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            fixed: "Markets digest the news (mock).".to_string(),
        }
    }
}

impl TextBackend for MockBackend {
    fn complete<'a>(
        &'a self,
        _prompt: Prompt<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String, BackendError>> + Send + 'a>> {
        let out = self.fixed.clone();
        Box::pin(async move { Ok(out) })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Single line, collapsed whitespace, surrounding quotes removed.
pub fn sanitize_line(input: &str) -> String {
    let joined = input.split_whitespace().collect::<Vec<_>>().join(" ");
    joined
        .trim_matches(|c| matches!(c, '"' | '\'' | '\u{201C}' | '\u{201D}'))
        .trim()
        .to_string()
}

/// Sanitize and cap a backend answer at `max` chars.
pub fn fit(answer: &str, max: usize) -> String {
    truncate_chars(&sanitize_line(answer), max).trim_end().to_string()
}
