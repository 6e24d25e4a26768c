// src/metrics.rs
//! Counter names and one-time descriptions. No exporter is installed here; an
//! embedding process may install any `metrics` recorder before `run`.

use metrics::{describe_counter, describe_gauge};
use once_cell::sync::OnceCell;

pub const FEEDS_FETCHED: &str = "relay_feeds_fetched_total";
pub const FEEDS_SKIPPED: &str = "relay_feeds_skipped_total";
pub const FEEDS_DISCARDED: &str = "relay_feeds_discarded_total";
pub const ITEMS_FETCHED: &str = "relay_items_fetched_total";
pub const ITEMS_KEPT: &str = "relay_items_kept_total";
pub const ITEMS_NEW: &str = "relay_items_new_total";
pub const ITEMS_PUBLISHED: &str = "relay_items_published_total";
pub const PUBLISH_FAILURES: &str = "relay_publish_failures_total";
pub const RELEVANCE_REJECTED: &str = "relevance_rejected_total";
pub const LAST_RUN_TS: &str = "relay_last_run_ts";

/// One-time metrics registration.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(FEEDS_FETCHED, "Feed fetches started before the deadline.");
        describe_counter!(FEEDS_SKIPPED, "Feeds skipped because the run deadline had passed.");
        describe_counter!(
            FEEDS_DISCARDED,
            "Feed results dropped because they completed after the deadline."
        );
        describe_counter!(ITEMS_FETCHED, "Items parsed from feeds.");
        describe_counter!(ITEMS_KEPT, "Items that passed the relevance filter.");
        describe_counter!(ITEMS_NEW, "Relevant items not seen in earlier runs.");
        describe_counter!(ITEMS_PUBLISHED, "Items published (or simulated in dry-run).");
        describe_counter!(PUBLISH_FAILURES, "Publish attempts that failed.");
        describe_counter!(RELEVANCE_REJECTED, "Items rejected by the relevance filter, by reason.");
        describe_gauge!(LAST_RUN_TS, "Unix ts when the last run finished.");
    });
}
