#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Snapshot bucketing and display range selection.
//!
//! Samples are grouped into fixed five-minute buckets keyed by window start;
//! buckets are derived on demand and never persisted. Range selection turns
//! a preset (or custom bounds) into an effective window clamped to the data
//! that actually exists, so the dashboard can never scroll past its own
//! timeline or show an inverted range.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use traffic_map_sample_models::EnrichedSample;

/// Width of a snapshot bucket in seconds.
pub const BUCKET_SECONDS: i64 = 300;

/// Floors a timestamp to the start of its five-minute bucket.
///
/// Seconds and sub-seconds are zeroed and the minute is rounded down to the
/// nearest multiple of five; two timestamps in the same calendar window
/// always produce the same key, including before the Unix epoch.
#[must_use]
pub fn bucket_key(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    let secs = timestamp.timestamp();
    let floored = secs - secs.rem_euclid(BUCKET_SECONDS);
    // Out of range only within five minutes of DateTime::MIN_UTC.
    DateTime::from_timestamp(floored, 0).unwrap_or(timestamp)
}

/// Groups samples into buckets, keyed by bucket start, keys ascending.
///
/// Samples within one bucket keep their slice order, so chronologically
/// appended input stays chronological inside each group.
#[must_use]
pub fn group_by_bucket(
    samples: &[EnrichedSample],
) -> BTreeMap<DateTime<Utc>, Vec<&EnrichedSample>> {
    let mut buckets: BTreeMap<DateTime<Utc>, Vec<&EnrichedSample>> = BTreeMap::new();
    for sample in samples {
        buckets
            .entry(bucket_key(sample.requested_at))
            .or_default()
            .push(sample);
    }
    buckets
}

/// Display range preset for the snapshot timeline.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum RangePreset {
    #[default]
    #[serde(rename = "last24h")]
    #[strum(serialize = "last24h")]
    Last24Hours,
    #[serde(rename = "last48h")]
    #[strum(serialize = "last48h")]
    Last48Hours,
    #[serde(rename = "last7d")]
    #[strum(serialize = "last7d")]
    Last7Days,
    #[serde(rename = "full")]
    #[strum(serialize = "full")]
    Full,
    #[serde(rename = "custom")]
    #[strum(serialize = "custom")]
    Custom,
}

/// An effective, clamped display window over bucket keys. Both bounds are
/// inclusive and `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Resolves a preset (plus optional custom bounds) to an effective window.
///
/// `keys` is the full ascending list of bucket keys; returns `None` when it
/// is empty. Relative presets anchor to the latest key; custom bounds each
/// default independently to the dataset edge they replace. The result is
/// clamped into `[earliest, latest]`, and an inverted request collapses to
/// a zero-width window at its start rather than going backwards.
#[must_use]
pub fn resolve_range(
    keys: &[DateTime<Utc>],
    preset: RangePreset,
    custom_start: Option<DateTime<Utc>>,
    custom_end: Option<DateTime<Utc>>,
) -> Option<RangeWindow> {
    let earliest = *keys.first()?;
    let latest = *keys.last()?;

    let (start, end) = match preset {
        RangePreset::Last24Hours => (anchor_back(latest, Duration::hours(24), earliest), latest),
        RangePreset::Last48Hours => (anchor_back(latest, Duration::hours(48), earliest), latest),
        RangePreset::Last7Days => (anchor_back(latest, Duration::days(7), earliest), latest),
        RangePreset::Full => (earliest, latest),
        RangePreset::Custom => (custom_start.unwrap_or(earliest), custom_end.unwrap_or(latest)),
    };

    let start = start.clamp(earliest, latest);
    let mut end = end.clamp(earliest, latest);
    if start > end {
        end = start;
    }
    Some(RangeWindow { start, end })
}

fn anchor_back(latest: DateTime<Utc>, span: Duration, earliest: DateTime<Utc>) -> DateTime<Utc> {
    latest.checked_sub_signed(span).unwrap_or(earliest)
}

/// Bucket keys visible inside a window, bounds inclusive.
#[must_use]
pub fn visible_buckets(keys: &[DateTime<Utc>], window: RangeWindow) -> Vec<DateTime<Utc>> {
    keys.iter()
        .copied()
        .filter(|key| *key >= window.start && *key <= window.end)
        .collect()
}

/// Picks the bucket to display from the visible set.
///
/// A requested key is honored only while it is still visible; otherwise the
/// selection falls back to the most recent visible bucket, so a stale pick
/// from before a range change is never shown. Returns `None` when nothing
/// is visible.
#[must_use]
pub fn select_bucket(
    visible: &[DateTime<Utc>],
    requested: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    if let Some(key) = requested
        && visible.contains(&key)
    {
        return Some(key);
    }
    visible.last().copied()
}
