#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the traffic map server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the configuration and storage types to allow independent evolution
//! of the API contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use traffic_map_geo::LatLon;
use traffic_map_sample_models::EnrichedSample;
use traffic_map_segment::ResolvedSegment;
use traffic_map_segment_models::{BprCoefficients, Direction};
use traffic_map_timeline::RangeWindow;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// A watched segment as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSegment {
    /// Unique segment ID.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Ordered coordinate path for the map layer.
    pub path: Vec<LatLon>,
    /// Lane count per direction.
    pub lanes: u32,
    /// Per-lane capacity in vehicles per hour.
    pub lane_capacity_vph: f64,
    /// Total capacity in vehicles per hour.
    pub capacity_vph: f64,
    /// Geodesic path length in meters, absent without usable geometry.
    pub length_meters: Option<f64>,
    /// Posted speed limit in km/h, if configured.
    pub speed_limit_kph: Option<f64>,
    /// Directions this segment is polled in.
    pub directions: Vec<Direction>,
    /// BPR coefficients applied to this segment.
    pub bpr: BprCoefficients,
}

impl From<&ResolvedSegment> for ApiSegment {
    fn from(segment: &ResolvedSegment) -> Self {
        Self {
            id: segment.id.clone(),
            name: segment.name.clone(),
            path: segment.path.clone(),
            lanes: segment.lanes,
            lane_capacity_vph: segment.lane_capacity_vph,
            capacity_vph: segment.capacity_vph,
            length_meters: segment.length_meters,
            speed_limit_kph: segment.speed_limit_kph,
            directions: segment.directions.clone(),
            bpr: segment.coefficients,
        }
    }
}

/// Query parameters for the timeline endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineQueryParams {
    /// Range preset name (`last24h`, `last48h`, `last7d`, `full`, `custom`).
    pub range: Option<String>,
    /// Custom window start (ISO 8601), used with the `custom` preset.
    pub from: Option<DateTime<Utc>>,
    /// Custom window end (ISO 8601), used with the `custom` preset.
    pub to: Option<DateTime<Utc>>,
}

/// Query parameters for the snapshot endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotQueryParams {
    /// Range preset name (`last24h`, `last48h`, `last7d`, `full`, `custom`).
    pub range: Option<String>,
    /// Custom window start (ISO 8601), used with the `custom` preset.
    pub from: Option<DateTime<Utc>>,
    /// Custom window end (ISO 8601), used with the `custom` preset.
    pub to: Option<DateTime<Utc>>,
    /// Explicitly selected bucket key (ISO 8601).
    pub bucket: Option<DateTime<Utc>>,
}

/// One bucket entry in the timeline response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiBucket {
    /// Bucket key (five-minute window start).
    pub key: DateTime<Utc>,
    /// Number of raw samples captured in the window.
    pub sample_count: usize,
}

/// Response from the timeline endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineResponse {
    /// Effective clamped display window, absent when there is no data.
    pub window: Option<RangeWindow>,
    /// Visible buckets, keys ascending.
    pub buckets: Vec<ApiBucket>,
}

/// Response from the snapshot endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    /// Effective clamped display window, absent when there is no data.
    pub window: Option<RangeWindow>,
    /// Selected bucket key, absent when nothing is visible.
    pub bucket: Option<DateTime<Utc>>,
    /// Bucket samples merged last-write-wins per segment and direction.
    pub samples: Vec<EnrichedSample>,
}

/// Response from the reload endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReloadResponse {
    /// Number of segments in the rebuilt index.
    pub segments: usize,
}

#[cfg(test)]
mod tests {
    use traffic_map_segment::SegmentIndex;
    use traffic_map_segment_models::SegmentDefinition;

    use super::*;

    #[test]
    fn api_segment_mirrors_resolved_configuration() {
        let definition = SegmentDefinition {
            id: "via-pontida".to_string(),
            name: "Via Pontida".to_string(),
            path: vec![LatLon::new(45.6972, 9.6620), LatLon::new(45.6965, 9.6685)],
            lanes: Some(2),
            lane_capacity_vph: Some(750.0),
            speed_limit_kph: Some(50.0),
            bpr: None,
            directions: Some(vec![Direction::Forward]),
        };
        let index = SegmentIndex::build(&[definition]);
        let segment = ApiSegment::from(index.lookup("via-pontida").unwrap());

        assert_eq!(segment.id, "via-pontida");
        assert_eq!(segment.lanes, 2);
        assert!((segment.capacity_vph - 1500.0).abs() < f64::EPSILON);
        assert_eq!(segment.directions, vec![Direction::Forward]);

        let value = serde_json::to_value(&segment).unwrap();
        assert_eq!(value["laneCapacityVph"], 750.0);
        assert_eq!(value["capacityVph"], 1500.0);
        assert_eq!(value["bpr"]["alpha"], 0.15);
        assert!(value["speedLimitKph"].is_number());
    }

    #[test]
    fn timeline_response_uses_camel_case_keys() {
        let response = TimelineResponse {
            window: None,
            buckets: vec![ApiBucket {
                key: DateTime::parse_from_rfc3339("2024-03-12T10:00:00Z")
                    .unwrap()
                    .with_timezone(&Utc),
                sample_count: 4,
            }],
        };

        let value = serde_json::to_value(&response).unwrap();
        assert!(value["window"].is_null());
        assert_eq!(value["buckets"][0]["key"], "2024-03-12T10:00:00Z");
        assert_eq!(value["buckets"][0]["sampleCount"], 4);
    }
}
