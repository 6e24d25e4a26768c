// src/pipeline.rs
//! One bounded run: collect (fetch, filter, dedup), rank, publish.
//!
//! Fetches run concurrently but their results are consumed in feed order, and the
//! dedup check, the publish call and the fingerprint commit all happen on this
//! task, so an item can never be published twice by the same process.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::stream::{self, StreamExt};
use metrics::{counter, gauge};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::compose::Composer;
use crate::config::{RunSettings, Settings};
use crate::dedup::{Fingerprint, FingerprintStore};
use crate::ingest::dates::effective_timestamp;
use crate::ingest::types::{FeedSource, FetchFeed, RawItem};
use crate::metrics as m;
use crate::notify::Publisher;
use crate::relevance::RelevanceFilter;

/// Wall-clock limit fixed at run start.
#[derive(Debug, Clone, Copy)]
pub struct RunDeadline {
    at: Instant,
}

impl RunDeadline {
    pub fn new(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Fetches started before the deadline.
    pub feeds_attempted: usize,
    /// Feeds never fetched because the deadline had passed.
    pub feeds_skipped: usize,
    /// Fetches whose result arrived after the deadline.
    pub feeds_discarded: usize,
    pub items_fetched: usize,
    pub items_kept: usize,
    pub items_new: usize,
    pub published: usize,
    pub failed: usize,
}

enum FeedOutcome {
    Skipped,
    Late,
    Fetched(Vec<RawItem>),
}

/// Stable sort by effective timestamp, newest first. Undated items count as
/// `now`, so they lead; ties keep their input order.
pub fn rank(items: Vec<RawItem>, tz: Tz, now: DateTime<Utc>) -> Vec<RawItem> {
    let mut keyed: Vec<(DateTime<Utc>, RawItem)> = items
        .into_iter()
        .map(|it| (effective_timestamp(&it, tz).unwrap_or(now), it))
        .collect();
    keyed.sort_by(|a, b| b.0.cmp(&a.0));
    keyed.into_iter().map(|(_, it)| it).collect()
}

pub struct Pipeline {
    feeds: Vec<FeedSource>,
    concurrency: usize,
    fetcher: Arc<dyn FetchFeed>,
    filter: RelevanceFilter,
    store: FingerprintStore,
    composer: Composer,
    publisher: Arc<dyn Publisher>,
    run: RunSettings,
}

impl Pipeline {
    /// Loads the fingerprint store from `settings.run.cache_path`.
    pub fn new(
        settings: &Settings,
        fetcher: Arc<dyn FetchFeed>,
        composer: Composer,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            feeds: settings.feeds.iter().map(FeedSource::new).collect(),
            concurrency: settings.fetch.concurrency.max(1),
            fetcher,
            filter: RelevanceFilter::new(&settings.filter),
            store: FingerprintStore::load(&settings.run.cache_path),
            composer,
            publisher,
            run: settings.run.clone(),
        }
    }

    pub fn store(&self) -> &FingerprintStore {
        &self.store
    }

    /// Run with a deadline of `now + RUN_BUDGET_SECS`.
    pub async fn run(&mut self) -> RunReport {
        let deadline = RunDeadline::new(self.run.budget);
        self.run_until(deadline).await
    }

    pub async fn run_until(&mut self, deadline: RunDeadline) -> RunReport {
        m::ensure_metrics_described();
        let mut report = RunReport::default();

        let collected = self.collect(deadline, &mut report).await;
        let ranked = rank(collected, self.run.timezone, Utc::now());
        debug!(candidates = ranked.len(), "ranking done");
        self.publish_all(ranked, deadline, &mut report).await;

        gauge!(m::LAST_RUN_TS).set(Utc::now().timestamp() as f64);
        info!(
            feeds_attempted = report.feeds_attempted,
            feeds_skipped = report.feeds_skipped,
            feeds_discarded = report.feeds_discarded,
            fetched = report.items_fetched,
            kept = report.items_kept,
            new = report.items_new,
            failed = report.failed,
            "Run complete. Posted {} items.",
            report.published
        );
        report
    }

    async fn collect(&self, deadline: RunDeadline, report: &mut RunReport) -> Vec<RawItem> {
        let fetcher = self.fetcher.clone();
        let mut outcomes = stream::iter(self.feeds.clone())
            .map(move |feed| {
                let fetcher = fetcher.clone();
                async move {
                    if deadline.is_expired() {
                        return (feed, FeedOutcome::Skipped);
                    }
                    let items = fetcher.fetch(&feed).await;
                    if deadline.is_expired() {
                        return (feed, FeedOutcome::Late);
                    }
                    (feed, FeedOutcome::Fetched(items))
                }
            })
            .buffered(self.concurrency);

        let mut seen_this_run: HashSet<Fingerprint> = HashSet::new();
        let mut accepted = Vec::new();

        while let Some((feed, outcome)) = outcomes.next().await {
            let items = match outcome {
                FeedOutcome::Skipped => {
                    warn!(feed = %feed, "run deadline passed, feed skipped");
                    report.feeds_skipped += 1;
                    counter!(m::FEEDS_SKIPPED).increment(1);
                    continue;
                }
                FeedOutcome::Late => {
                    warn!(feed = %feed, "feed completed after the deadline, result discarded");
                    report.feeds_attempted += 1;
                    report.feeds_discarded += 1;
                    counter!(m::FEEDS_FETCHED).increment(1);
                    counter!(m::FEEDS_DISCARDED).increment(1);
                    continue;
                }
                FeedOutcome::Fetched(items) => items,
            };
            report.feeds_attempted += 1;
            report.items_fetched += items.len();
            counter!(m::FEEDS_FETCHED).increment(1);
            counter!(m::ITEMS_FETCHED).increment(items.len() as u64);

            let kept = self.filter.filter(items, Utc::now());
            report.items_kept += kept.len();
            counter!(m::ITEMS_KEPT).increment(kept.len() as u64);

            let mut new_here = 0usize;
            for item in kept {
                let fp = Fingerprint::of(&item);
                if self.store.contains(&fp) || !seen_this_run.insert(fp) {
                    continue;
                }
                new_here += 1;
                accepted.push(item);
            }
            report.items_new += new_here;
            counter!(m::ITEMS_NEW).increment(new_here as u64);
            debug!(feed = %feed, new = new_here, "feed collected");
        }
        accepted
    }

    async fn publish_all(&mut self, ranked: Vec<RawItem>, deadline: RunDeadline, report: &mut RunReport) {
        for item in ranked {
            if report.published >= self.run.post_limit {
                debug!(limit = self.run.post_limit, "post limit reached");
                break;
            }
            if deadline.is_expired() {
                warn!("run deadline passed, stopping publish loop");
                break;
            }

            let post = self.composer.compose(&item).await;
            let text = post.render();
            match self.publisher.publish(&text).await {
                Ok(()) => {
                    self.store.mark(&item);
                    report.published += 1;
                    counter!(m::ITEMS_PUBLISHED).increment(1);
                    info!(title = %post.headline, domain = %post.domain, "item published");

                    if report.published < self.run.post_limit && !self.run.post_delay.is_zero() {
                        tokio::time::sleep(self.run.post_delay.min(deadline.remaining())).await;
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    counter!(m::PUBLISH_FAILURES).increment(1);
                    error!(error = %e, title = %post.headline, "publish failed");
                }
            }
        }
    }
}
