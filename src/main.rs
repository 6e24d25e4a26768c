//! finance-news-relay: one bounded collect/filter/publish run per invocation.
//! Schedule it with cron or a systemd timer.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use finance_news_relay::{config, run_once, Settings};

/// `RUST_LOG` filter (default `info`); `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_target(false)).init();
    } else {
        registry.with(fmt::layer().compact().with_target(false)).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env values override the inherited environment.
    config::load_env_file(Path::new(".env"));
    init_tracing();

    let settings = Settings::from_env().context("loading configuration")?;
    info!(
        feeds = settings.feeds.len(),
        dry_run = settings.publish.dry_run,
        post_limit = settings.run.post_limit,
        timezone = %settings.run.timezone,
        "starting run"
    );

    run_once(&settings).await?;
    Ok(())
}
