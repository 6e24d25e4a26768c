// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod compose;
pub mod config;
pub mod dedup;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod relevance;

use std::sync::Arc;

use anyhow::Result;

pub use crate::compose::{ComposedPost, Composer};
pub use crate::config::Settings;
pub use crate::pipeline::{Pipeline, RunDeadline, RunReport};

/// Wire the production components from `settings` and run once.
pub async fn run_once(settings: &Settings) -> Result<RunReport> {
    let fetcher = ingest::FeedFetcher::new(&settings.fetch)?;
    let backend = compose::build_backend(&settings.ai);
    let composer = Composer::new(settings.compose.clone(), backend);
    let publisher = notify::build_publisher(&settings.publish)?;

    let mut pipeline = Pipeline::new(settings, Arc::new(fetcher), composer, Arc::new(publisher));
    Ok(pipeline.run().await)
}
