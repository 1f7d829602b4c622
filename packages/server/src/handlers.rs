//! HTTP handler functions for the traffic map API.

use std::collections::BTreeMap;
use std::sync::Arc;

use actix_web::{HttpResponse, web};
use chrono::{DateTime, Utc};
use traffic_map_sample_models::EnrichedSample;
use traffic_map_segment::{SegmentIndex, load_config};
use traffic_map_segment_models::Direction;
use traffic_map_server_models::{
    ApiBucket, ApiHealth, ApiSegment, ReloadResponse, SnapshotQueryParams, SnapshotResponse,
    TimelineQueryParams, TimelineResponse,
};
use traffic_map_store::StoreError;
use traffic_map_timeline::{
    RangePreset, group_by_bucket, resolve_range, select_bucket, visible_buckets,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/segments`
///
/// Returns the resolved segment configuration for the map layer.
pub async fn segments(state: web::Data<AppState>) -> HttpResponse {
    let index = current_index(&state);

    let mut list: Vec<ApiSegment> = index.iter().map(ApiSegment::from).collect();
    list.sort_by(|a, b| a.id.cmp(&b.id));

    HttpResponse::Ok().json(list)
}

/// `GET /api/timeline`
///
/// Resolves the requested display range against the stored history and
/// returns the effective window plus the visible bucket keys with their
/// sample counts.
pub async fn timeline(
    state: web::Data<AppState>,
    params: web::Query<TimelineQueryParams>,
) -> HttpResponse {
    let samples = match read_samples(&state) {
        Ok(samples) => samples,
        Err(e) => return store_error(&e),
    };

    let preset = parse_range(params.range.as_deref());
    let buckets = group_by_bucket(&samples);
    let keys: Vec<DateTime<Utc>> = buckets.keys().copied().collect();

    let window = resolve_range(&keys, preset, params.from, params.to);
    let visible = window.map_or_else(Vec::new, |window| visible_buckets(&keys, window));

    let api_buckets: Vec<ApiBucket> = visible
        .iter()
        .map(|key| ApiBucket {
            key: *key,
            sample_count: buckets.get(key).map_or(0, Vec::len),
        })
        .collect();

    HttpResponse::Ok().json(TimelineResponse {
        window,
        buckets: api_buckets,
    })
}

/// `GET /api/snapshot`
///
/// Returns the selected bucket key and its samples, merged down to the
/// latest reading per segment and direction.
pub async fn snapshot(
    state: web::Data<AppState>,
    params: web::Query<SnapshotQueryParams>,
) -> HttpResponse {
    let samples = match read_samples(&state) {
        Ok(samples) => samples,
        Err(e) => return store_error(&e),
    };

    let preset = parse_range(params.range.as_deref());
    let buckets = group_by_bucket(&samples);
    let keys: Vec<DateTime<Utc>> = buckets.keys().copied().collect();

    let window = resolve_range(&keys, preset, params.from, params.to);
    let visible = window.map_or_else(Vec::new, |window| visible_buckets(&keys, window));
    let selected = select_bucket(&visible, params.bucket);

    let merged = selected
        .and_then(|key| buckets.get(&key))
        .map_or_else(Vec::new, |bucket| merge_latest(bucket));

    HttpResponse::Ok().json(SnapshotResponse {
        window,
        bucket: selected,
        samples: merged,
    })
}

/// `POST /api/reload`
///
/// Reloads the segment configuration and swaps the index wholesale.
/// In-flight requests keep the snapshot they already cloned.
pub async fn reload(state: web::Data<AppState>) -> HttpResponse {
    match load_config(&state.config_path) {
        Ok(config) => {
            let index = Arc::new(SegmentIndex::build(&config.segments));
            let segments = index.len();
            *state.index.write().expect("segment index lock poisoned") = index;
            log::info!("Reloaded segment configuration: {segments} segments");
            HttpResponse::Ok().json(ReloadResponse { segments })
        }
        Err(e) => {
            log::error!("Failed to reload segment configuration: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to reload segment configuration"
            }))
        }
    }
}

/// Clones the current segment index snapshot out of the state.
///
/// # Panics
///
/// Panics if the index lock is poisoned.
fn current_index(state: &AppState) -> Arc<SegmentIndex> {
    Arc::clone(&state.index.read().expect("segment index lock poisoned"))
}

/// Reads the sample history through the state's cache.
fn read_samples(state: &AppState) -> Result<Arc<Vec<EnrichedSample>>, StoreError> {
    state
        .cache
        .lock()
        .expect("sample cache lock poisoned")
        .samples()
}

fn store_error(e: &StoreError) -> HttpResponse {
    log::error!("Failed to read sample store: {e}");
    HttpResponse::InternalServerError().json(serde_json::json!({
        "error": "Failed to read sample store"
    }))
}

/// Parses the `range` query value.
///
/// Unknown values fall back to the default preset with a warning rather
/// than failing the request; a stale frontend should still get a
/// sensible timeline.
fn parse_range(range: Option<&str>) -> RangePreset {
    range.map_or_else(RangePreset::default, |raw| {
        raw.parse().unwrap_or_else(|_| {
            log::warn!("Unknown range {raw:?}, defaulting to {}", RangePreset::default());
            RangePreset::default()
        })
    })
}

/// Collapses a bucket to one sample per (segment, direction), keeping
/// the latest capture (ties go to the later line in the file).
///
/// A bucket holds every poll that landed in its five minutes; the map
/// draws one reading per segment per direction, so only the freshest
/// counts. Results come out sorted by segment id and direction.
fn merge_latest(bucket: &[&EnrichedSample]) -> Vec<EnrichedSample> {
    let mut latest: BTreeMap<(&str, Direction), &EnrichedSample> = BTreeMap::new();
    for &sample in bucket {
        latest
            .entry((sample.segment_id.as_str(), sample.direction))
            .and_modify(|current| {
                if sample.requested_at >= current.requested_at {
                    *current = sample;
                }
            })
            .or_insert(sample);
    }
    latest.into_values().cloned().collect()
}
