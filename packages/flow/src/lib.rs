#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Flow derivation: from one travel time sample to an estimated vehicular
//! flow.
//!
//! The model is the Bureau of Public Roads travel-time function
//! `t = t0 * (1 + alpha * (v/c)^beta)`, inverted for the volume/capacity
//! ratio. Observed delay over the free-flow baseline is attributed entirely
//! to congestion; travel at or below baseline reads as a ratio of zero,
//! never a negative one.
//!
//! Derivation is pure and total: any combination of missing, zero, negative,
//! or non-finite inputs produces `null` fields and a `Low` confidence label,
//! never an error. One bad sample must not abort enrichment of a batch.

use traffic_map_sample_models::{EnrichedSample, FlowConfidence, FlowMetrics, TravelTimeSample};
use traffic_map_segment::SegmentIndex;
use traffic_map_segment_models::BprCoefficients;

/// Derives flow metrics for one sample's duration readings.
///
/// An unknown `segment_id` yields the all-`null`, `Low`-confidence record.
/// For a known segment, `length_meters`, `capacity_vph` and the model
/// coefficients come straight from the resolved configuration regardless of
/// whether a flow figure can be computed from the durations.
#[must_use]
pub fn derive_flow_metrics(
    index: &SegmentIndex,
    segment_id: &str,
    duration_seconds: Option<f64>,
    static_duration_seconds: Option<f64>,
) -> FlowMetrics {
    let Some(segment) = index.lookup(segment_id) else {
        return FlowMetrics::unavailable();
    };

    let free_flow_speed_kph = free_flow_speed(segment.length_meters, static_duration_seconds);

    let live = positive_finite(duration_seconds);
    let baseline = positive_finite(static_duration_seconds);
    let capacity = finite_or_none(segment.capacity_vph).filter(|capacity| *capacity > 0.0);

    let volume_capacity_ratio = match (live, baseline, capacity) {
        (Some(live), Some(baseline), Some(_)) => {
            invert_bpr(live / baseline, segment.coefficients)
        }
        _ => None,
    };
    let derived_flow_vph = match (volume_capacity_ratio, capacity) {
        (Some(ratio), Some(capacity)) => finite_or_none(ratio * capacity),
        _ => None,
    };

    FlowMetrics {
        length_meters: segment.length_meters,
        free_flow_speed_kph,
        capacity_vph: finite_or_none(segment.capacity_vph),
        volume_capacity_ratio,
        derived_flow_vph,
        confidence: classify_confidence(volume_capacity_ratio, derived_flow_vph),
        model: Some(segment.coefficients),
    }
}

/// Derives metrics for a sample and returns the flat enriched record.
#[must_use]
pub fn enrich_sample(index: &SegmentIndex, sample: TravelTimeSample) -> EnrichedSample {
    let metrics = derive_flow_metrics(
        index,
        &sample.segment_id,
        sample.duration_seconds,
        sample.static_duration_seconds,
    );
    EnrichedSample::new(sample, metrics)
}

/// Free-flow speed in km/h from segment length and the free-flow duration.
///
/// Populated whenever length and a positive baseline are available, even
/// when the live duration is missing and no flow can be derived.
fn free_flow_speed(
    length_meters: Option<f64>,
    static_duration_seconds: Option<f64>,
) -> Option<f64> {
    let length = length_meters?;
    let baseline = positive_finite(static_duration_seconds)?;
    finite_or_none(length / baseline * 3.6)
}

/// Inverts the BPR function for v/c given the live/baseline time ratio.
///
/// At or below baseline the ratio is exactly zero. Above it,
/// `v/c = ((ratio - 1) / alpha)^(1/beta)`, clamped non-negative and coerced
/// to `None` when the arithmetic degenerates (alpha of zero, extreme
/// ratios).
fn invert_bpr(time_ratio: f64, coefficients: BprCoefficients) -> Option<f64> {
    if time_ratio <= 1.0 {
        return Some(0.0);
    }
    let excess = ((time_ratio - 1.0) / coefficients.alpha).max(0.0);
    finite_or_none(excess.powf(1.0 / coefficients.beta)).map(|ratio| ratio.max(0.0))
}

/// Confidence label for a derived flow figure, checked in order: missing
/// figures are `Low`, light congestion (v/c at or below 0.8) is `High`,
/// heavy congestion (v/c above 1.2, where the BPR inversion becomes
/// ill-conditioned) is `Low`, the band between is `Medium`.
const fn classify_confidence(
    volume_capacity_ratio: Option<f64>,
    derived_flow_vph: Option<f64>,
) -> FlowConfidence {
    match (volume_capacity_ratio, derived_flow_vph) {
        (Some(ratio), Some(_)) => {
            if ratio <= 0.8 {
                FlowConfidence::High
            } else if ratio > 1.2 {
                FlowConfidence::Low
            } else {
                FlowConfidence::Medium
            }
        }
        _ => FlowConfidence::Low,
    }
}

fn positive_finite(value: Option<f64>) -> Option<f64> {
    value.filter(|value| value.is_finite() && *value > 0.0)
}

fn finite_or_none(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
