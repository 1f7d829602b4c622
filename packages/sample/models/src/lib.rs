#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Travel time sample records and the derived flow metrics attached to them.
//!
//! Samples are the unit of storage: one record per segment per direction per
//! poll, serialized as a single JSON line. Field names on the wire are
//! camelCase. Measurement fields that could not be obtained are explicit
//! `null`s rather than absent keys, so a record always shows which
//! measurements were attempted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use traffic_map_geo::LatLon;
use traffic_map_segment_models::{BprCoefficients, Direction};

/// A constant-speed stretch within a routed leg, as reported by the
/// routing provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedInterval {
    /// Start of the stretch, meters from the leg origin.
    pub from_meters: f64,
    /// End of the stretch, meters from the leg origin.
    pub to_meters: f64,
    /// Reported speed over the stretch in km/h.
    pub speed_kph: f64,
}

/// Corridor weather at poll time, from the weather provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    /// Air temperature in degrees Celsius.
    pub temperature_c: Option<f64>,
    /// Precipitation over the last hour in millimeters.
    pub precipitation_mm: Option<f64>,
    /// Wind speed in km/h.
    pub wind_speed_kph: Option<f64>,
    /// WMO weather interpretation code.
    pub weather_code: Option<i64>,
}

/// One travel time measurement for a segment in one direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelTimeSample {
    /// Identifier of the watched segment.
    pub segment_id: String,
    /// Traversal direction the route was requested in.
    pub direction: Direction,
    /// When the poll cycle issued the request. All samples from one cycle
    /// share this timestamp so they land in the same snapshot bucket.
    pub requested_at: DateTime<Utc>,
    /// Route origin (first or last path coordinate, per direction).
    pub origin: LatLon,
    /// Route destination.
    pub destination: LatLon,
    /// Routed distance in meters, `null` when the provider omitted it.
    pub distance_meters: Option<f64>,
    /// Live travel time in seconds.
    pub duration_seconds: Option<f64>,
    /// Free-flow travel time in seconds for the same route.
    pub static_duration_seconds: Option<f64>,
    /// Live minus free-flow travel time in seconds.
    pub delay_seconds: Option<f64>,
    /// Per-stretch speed breakdown, when the provider returned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_intervals: Option<Vec<SpeedInterval>>,
    /// Street names the routed leg runs along.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_labels: Option<Vec<String>>,
    /// Corridor weather at poll time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherSnapshot>,
}

/// How much trust to place in a derived flow figure.
///
/// Ordering of the checks that produce this value lives in the flow crate;
/// the rough meaning is: `High` for near-free-flow readings where the BPR
/// inversion is well conditioned, `Low` for heavy congestion or missing
/// inputs, `Medium` in between.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FlowConfidence {
    High,
    Medium,
    #[default]
    Low,
}

/// Derived flow figures attached to a sample at enrichment time.
///
/// Every numeric field is `null` when its inputs were unavailable; a `null`
/// never means zero. `confidence` is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowMetrics {
    /// Geodesic segment length in meters, from the configured path.
    pub length_meters: Option<f64>,
    /// Free-flow speed in km/h (`length / staticDuration`).
    pub free_flow_speed_kph: Option<f64>,
    /// Segment capacity in vehicles per hour (`lanes * laneCapacity`).
    pub capacity_vph: Option<f64>,
    /// Volume/capacity ratio from the inverted BPR function.
    pub volume_capacity_ratio: Option<f64>,
    /// Estimated flow in vehicles per hour (`ratio * capacity`).
    pub derived_flow_vph: Option<f64>,
    /// Trust level for the derived figures.
    #[serde(rename = "flowConfidence")]
    pub confidence: FlowConfidence,
    /// BPR coefficients the derivation used, `null` when the segment was
    /// unknown and no model could be applied.
    #[serde(rename = "flowEstimationModel")]
    pub model: Option<BprCoefficients>,
}

impl FlowMetrics {
    /// Metrics for a sample whose segment is not in the index: every field
    /// `null` and confidence `Low`.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self {
            length_meters: None,
            free_flow_speed_kph: None,
            capacity_vph: None,
            volume_capacity_ratio: None,
            derived_flow_vph: None,
            confidence: FlowConfidence::Low,
            model: None,
        }
    }
}

/// A stored sample: the raw measurement plus its derived metrics, as one
/// flat record.
///
/// Metric fields default when absent so that records written before
/// enrichment existed still parse (they surface as all-`null` metrics with
/// `Low` confidence).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedSample {
    pub segment_id: String,
    pub direction: Direction,
    pub requested_at: DateTime<Utc>,
    pub origin: LatLon,
    pub destination: LatLon,
    pub distance_meters: Option<f64>,
    pub duration_seconds: Option<f64>,
    pub static_duration_seconds: Option<f64>,
    pub delay_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_intervals: Option<Vec<SpeedInterval>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherSnapshot>,
    #[serde(default)]
    pub length_meters: Option<f64>,
    #[serde(default)]
    pub free_flow_speed_kph: Option<f64>,
    #[serde(default)]
    pub capacity_vph: Option<f64>,
    #[serde(default)]
    pub volume_capacity_ratio: Option<f64>,
    #[serde(default)]
    pub derived_flow_vph: Option<f64>,
    #[serde(default, rename = "flowConfidence")]
    pub confidence: FlowConfidence,
    #[serde(default, rename = "flowEstimationModel")]
    pub model: Option<BprCoefficients>,
}

impl EnrichedSample {
    #[must_use]
    pub fn new(sample: TravelTimeSample, metrics: FlowMetrics) -> Self {
        Self {
            segment_id: sample.segment_id,
            direction: sample.direction,
            requested_at: sample.requested_at,
            origin: sample.origin,
            destination: sample.destination,
            distance_meters: sample.distance_meters,
            duration_seconds: sample.duration_seconds,
            static_duration_seconds: sample.static_duration_seconds,
            delay_seconds: sample.delay_seconds,
            speed_intervals: sample.speed_intervals,
            route_labels: sample.route_labels,
            weather: sample.weather,
            length_meters: metrics.length_meters,
            free_flow_speed_kph: metrics.free_flow_speed_kph,
            capacity_vph: metrics.capacity_vph,
            volume_capacity_ratio: metrics.volume_capacity_ratio,
            derived_flow_vph: metrics.derived_flow_vph,
            confidence: metrics.confidence,
            model: metrics.model,
        }
    }

    /// Serializes the record as a single JSON line.
    ///
    /// # Errors
    ///
    /// * If the record fails to serialize
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<EnrichedSample> for TravelTimeSample {
    /// Strips the derived metrics back off, leaving the raw measurement.
    /// Re-enrichment recomputes metrics from this plus current
    /// configuration.
    fn from(enriched: EnrichedSample) -> Self {
        Self {
            segment_id: enriched.segment_id,
            direction: enriched.direction,
            requested_at: enriched.requested_at,
            origin: enriched.origin,
            destination: enriched.destination,
            distance_meters: enriched.distance_meters,
            duration_seconds: enriched.duration_seconds,
            static_duration_seconds: enriched.static_duration_seconds,
            delay_seconds: enriched.delay_seconds,
            speed_intervals: enriched.speed_intervals,
            route_labels: enriched.route_labels,
            weather: enriched.weather,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TravelTimeSample {
        TravelTimeSample {
            segment_id: "via-pontida".to_string(),
            direction: Direction::Forward,
            requested_at: DateTime::parse_from_rfc3339("2024-03-12T10:02:13Z")
                .unwrap()
                .with_timezone(&Utc),
            origin: LatLon::new(45.697_2, 9.662_0),
            destination: LatLon::new(45.696_5, 9.668_5),
            distance_meters: Some(540.0),
            duration_seconds: Some(90.0),
            static_duration_seconds: Some(60.0),
            delay_seconds: Some(30.0),
            speed_intervals: None,
            route_labels: Some(vec!["Via Pontida".to_string()]),
            weather: None,
        }
    }

    fn metrics() -> FlowMetrics {
        FlowMetrics {
            length_meters: Some(512.0),
            free_flow_speed_kph: Some(30.7),
            capacity_vph: Some(750.0),
            volume_capacity_ratio: Some(1.351_2),
            derived_flow_vph: Some(1_013.4),
            confidence: FlowConfidence::Low,
            model: Some(BprCoefficients::default()),
        }
    }

    #[test]
    fn sample_keys_are_camel_case() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["segmentId"], "via-pontida");
        assert_eq!(value["direction"], "forward");
        assert_eq!(value["requestedAt"], "2024-03-12T10:02:13Z");
        assert_eq!(value["durationSeconds"], 90.0);
        assert_eq!(value["staticDurationSeconds"], 60.0);
        assert_eq!(value["origin"]["lat"], 45.697_2);
    }

    #[test]
    fn missing_measurements_serialize_as_explicit_nulls() {
        let mut sample = sample();
        sample.duration_seconds = None;
        sample.delay_seconds = None;
        let value = serde_json::to_value(sample).unwrap();

        let object = value.as_object().unwrap();
        assert!(object.contains_key("durationSeconds"));
        assert!(value["durationSeconds"].is_null());
        assert!(value["delaySeconds"].is_null());
    }

    #[test]
    fn absent_extras_are_omitted_entirely() {
        let value = serde_json::to_value(sample()).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("speedIntervals"));
        assert!(!object.contains_key("weather"));
        assert!(object.contains_key("routeLabels"));
    }

    #[test]
    fn confidence_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&FlowConfidence::High).unwrap(),
            "\"high\""
        );
        assert_eq!(FlowConfidence::Medium.to_string(), "medium");
        assert_eq!("low".parse::<FlowConfidence>().unwrap(), FlowConfidence::Low);
    }

    #[test]
    fn enriched_sample_carries_metric_fields() {
        let enriched = EnrichedSample::new(sample(), metrics());
        let value = serde_json::to_value(&enriched).unwrap();

        assert_eq!(value["segmentId"], "via-pontida");
        assert_eq!(value["lengthMeters"], 512.0);
        assert_eq!(value["capacityVph"], 750.0);
        assert_eq!(value["volumeCapacityRatio"], 1.351_2);
        assert_eq!(value["derivedFlowVph"], 1_013.4);
        assert_eq!(value["flowConfidence"], "low");
        assert_eq!(value["flowEstimationModel"]["alpha"], 0.15);
        assert_eq!(value["flowEstimationModel"]["beta"], 4.0);
    }

    #[test]
    fn unavailable_metrics_are_all_null_low() {
        let enriched = EnrichedSample::new(sample(), FlowMetrics::unavailable());
        let value = serde_json::to_value(&enriched).unwrap();

        assert!(value["lengthMeters"].is_null());
        assert!(value["volumeCapacityRatio"].is_null());
        assert!(value["derivedFlowVph"].is_null());
        assert!(value["flowEstimationModel"].is_null());
        assert_eq!(value["flowConfidence"], "low");
    }

    #[test]
    fn enriched_sample_round_trips() {
        let enriched = EnrichedSample::new(sample(), metrics());
        let line = enriched.to_json_line().unwrap();
        let parsed: EnrichedSample = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, enriched);
    }

    #[test]
    fn json_line_has_no_interior_newlines() {
        let line = EnrichedSample::new(sample(), metrics())
            .to_json_line()
            .unwrap();
        assert!(!line.contains('\n'));
    }

    #[test]
    fn record_without_metric_keys_still_parses() {
        let line = serde_json::to_string(&sample()).unwrap();
        let parsed: EnrichedSample = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.segment_id, "via-pontida");
        assert!(parsed.derived_flow_vph.is_none());
        assert_eq!(parsed.confidence, FlowConfidence::Low);
    }

    #[test]
    fn record_missing_required_field_is_rejected() {
        let line = r#"{"direction":"forward","requestedAt":"2024-03-12T10:02:13Z"}"#;
        assert!(serde_json::from_str::<TravelTimeSample>(line).is_err());
    }

    #[test]
    fn stripping_metrics_recovers_the_raw_sample() {
        let original = sample();
        let enriched = EnrichedSample::new(original.clone(), metrics());
        let stripped = TravelTimeSample::from(enriched);
        assert_eq!(stripped, original);
    }
}
