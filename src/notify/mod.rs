// src/notify/mod.rs
pub mod mastodon;
pub mod telegram;

use std::sync::Arc;

use anyhow::Result;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::PublishSettings;

pub use mastodon::MastodonPublisher;
pub use telegram::TelegramPublisher;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("missing credentials: {0}")]
    MissingCredentials(&'static str),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{target} rejected the message (status {status}): {detail}")]
    Api {
        target: &'static str,
        status: StatusCode,
        detail: String,
    },
}

#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, text: &str) -> Result<(), PublishError>;
    fn name(&self) -> &'static str;
}

/// Dry-run gate in front of a primary target and an optional secondary one.
pub struct PublisherMux {
    dry_run: bool,
    primary: Arc<dyn Publisher>,
    secondary: Option<Arc<dyn Publisher>>,
}

impl PublisherMux {
    pub fn new(dry_run: bool, primary: Arc<dyn Publisher>) -> Self {
        Self {
            dry_run,
            primary,
            secondary: None,
        }
    }

    pub fn with_secondary(mut self, secondary: Arc<dyn Publisher>) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

#[async_trait::async_trait]
impl Publisher for PublisherMux {
    async fn publish(&self, text: &str) -> Result<(), PublishError> {
        if self.dry_run {
            info!(target: "publish", dry_run = true, "simulated post:\n{text}");
            return Ok(());
        }

        self.primary.publish(text).await?;
        debug!(target_name = self.primary.name(), "primary publish ok");

        if let Some(secondary) = &self.secondary {
            if let Err(e) = secondary.publish(text).await {
                warn!(error = %e, target_name = secondary.name(), "secondary publish failed");
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mux"
    }
}

/// Telegram as primary; Mastodon as secondary when enabled and fully configured.
pub fn build_publisher(cfg: &PublishSettings) -> Result<PublisherMux> {
    let telegram = TelegramPublisher::new(&cfg.telegram_token, &cfg.telegram_chat_id)?;
    let mut mux = PublisherMux::new(cfg.dry_run, Arc::new(telegram));

    if cfg.mastodon_enabled {
        if cfg.mastodon_base_url.is_empty() || cfg.mastodon_access_token.is_empty() {
            debug!("Mastodon enabled but base URL or token missing, skipping");
        } else {
            let masto = MastodonPublisher::new(&cfg.mastodon_base_url, &cfg.mastodon_access_token)?;
            mux = mux.with_secondary(Arc::new(masto));
        }
    }
    Ok(mux)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Counting {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait::async_trait]
    impl Publisher for Counting {
        async fn publish(&self, _text: &str) -> Result<(), PublishError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(PublishError::MissingCredentials("test"))
            } else {
                Ok(())
            }
        }
        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn dry_run_never_touches_targets() {
        let primary = Counting::new(true);
        let mux = PublisherMux::new(true, primary.clone());
        assert!(mux.publish("hello").await.is_ok());
        assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn secondary_failure_does_not_fail_item() {
        let primary = Counting::new(false);
        let secondary = Counting::new(true);
        let mux = PublisherMux::new(false, primary.clone()).with_secondary(secondary.clone());
        assert!(mux.publish("hello").await.is_ok());
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn primary_failure_skips_secondary() {
        let primary = Counting::new(true);
        let secondary = Counting::new(false);
        let mux = PublisherMux::new(false, primary).with_secondary(secondary.clone());
        assert!(mux.publish("hello").await.is_err());
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_telegram_credentials_fail_outside_dry_run() {
        let live = build_publisher(&PublishSettings::default()).unwrap();
        assert!(matches!(
            live.publish("x").await,
            Err(PublishError::MissingCredentials(_))
        ));

        let dry = build_publisher(&PublishSettings {
            dry_run: true,
            ..Default::default()
        })
        .unwrap();
        assert!(dry.publish("x").await.is_ok());
    }
}
