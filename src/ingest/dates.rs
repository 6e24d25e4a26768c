// src/ingest/dates.rs
//! Lenient timestamp parsing for feed dates.
//!
//! Feeds publish dates in every format imaginable. We try, in order:
//! RFC 2822, RFC 3339, a handful of layouts carrying an offset, then naive
//! layouts (localized in the configured zone), then bare dates (midnight local).

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::ingest::types::RawItem;

const OFFSET_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%a, %d %b %Y %H:%M %z",
    "%d %b %Y %H:%M:%S %z",
    "%a %b %d %H:%M:%S %z %Y",
];

const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%a, %d %b %Y %H:%M:%S",
    "%a, %d %b %Y %H:%M",
    "%d %b %Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%a, %d %b %Y", "%d %b %Y", "%B %d, %Y", "%d/%m/%Y"];

/// Parse a free-form feed timestamp. Values without an offset are read as local
/// time in `tz`. Returns `None` when nothing matches.
pub fn parse_lenient(raw: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    // RFC 2822 reads unknown zone names ("CEST", "IST", ...) as UTC; treat them
    // as local time in `tz` instead.
    if let Some(head) = strip_unknown_zone(s) {
        return parse_naive(head, tz);
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in OFFSET_LAYOUTS {
        if let Ok(dt) = DateTime::parse_from_str(s, layout) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    parse_naive(s, tz)
}

fn parse_naive(s: &str, tz: Tz) -> Option<DateTime<Utc>> {
    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return localize(naive, tz);
        }
    }
    for layout in DATE_LAYOUTS {
        if let Ok(date) = NaiveDate::parse_from_str(s, layout) {
            return date.and_hms_opt(0, 0, 0).and_then(|n| localize(n, tz));
        }
    }
    None
}

/// First of `published`, `updated`, `created` that parses.
pub fn effective_timestamp(item: &RawItem, tz: Tz) -> Option<DateTime<Utc>> {
    [&item.published, &item.updated, &item.created]
        .into_iter()
        .flatten()
        .find_map(|raw| parse_lenient(raw, tz))
}

fn localize(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        // Inside a DST gap: the wall-clock time does not exist, shift forward.
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

const KNOWN_ZONES: &[&str] = &[
    "GMT", "UT", "UTC", "Z", "EST", "EDT", "CST", "CDT", "MST", "MDT", "PST", "PDT",
];

fn strip_unknown_zone(s: &str) -> Option<&str> {
    let (head, last) = s.rsplit_once(' ')?;
    let is_zone_word =
        (2..=5).contains(&last.len()) && last.chars().all(|c| c.is_ascii_alphabetic());
    if is_zone_word && !KNOWN_ZONES.iter().any(|z| z.eq_ignore_ascii_case(last)) {
        Some(head.trim_end())
    } else {
        None
    }
}
