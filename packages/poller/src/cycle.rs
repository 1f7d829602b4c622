//! One poll cycle over the configured segments.

use chrono::Utc;
use traffic_map_flow::enrich_sample;
use traffic_map_sample_models::{EnrichedSample, TravelTimeSample, WeatherSnapshot};
use traffic_map_segment::{ResolvedSegment, SegmentIndex};
use traffic_map_segment_models::Direction;
use traffic_map_store::SampleStore;

use crate::{PollError, tomtom::TravelTimeProvider};

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Enriched samples appended to the store.
    pub appended: usize,
    /// Segment/direction polls that failed.
    pub failed: usize,
}

/// Polls every segment in the index once, in each allowed direction.
///
/// All samples from one cycle share a single `requested_at` timestamp
/// so they land in the same snapshot bucket. Per-route provider
/// failures are logged and counted without aborting the cycle, and the
/// store append happens once at the end so a cycle's lines stay
/// contiguous.
///
/// # Errors
///
/// Returns [`PollError`] only if appending to the store fails.
#[allow(clippy::future_not_send)]
pub async fn run_cycle(
    provider: &dyn TravelTimeProvider,
    index: &SegmentIndex,
    weather: Option<WeatherSnapshot>,
    store: &SampleStore,
) -> Result<CycleOutcome, PollError> {
    let requested_at = Utc::now();

    // HashMap iteration order is arbitrary; poll in id order so runs
    // are comparable and the store stays diffable.
    let mut segments: Vec<&ResolvedSegment> = index.iter().collect();
    segments.sort_by(|a, b| a.id.cmp(&b.id));

    let mut enriched: Vec<EnrichedSample> = Vec::new();
    let mut failed = 0;

    for segment in segments {
        let (Some(&first), Some(&last)) = (segment.path.first(), segment.path.last()) else {
            log::warn!("Skipping {}: path has no endpoints", segment.id);
            continue;
        };

        for &direction in &segment.directions {
            let (origin, destination) = match direction {
                Direction::Forward => (first, last),
                Direction::Reverse => (last, first),
            };

            match provider.route(origin, destination).await {
                Ok(timing) => {
                    let sample = TravelTimeSample {
                        segment_id: segment.id.clone(),
                        direction,
                        requested_at,
                        origin,
                        destination,
                        distance_meters: timing.distance_meters,
                        duration_seconds: timing.duration_seconds,
                        static_duration_seconds: timing.static_duration_seconds,
                        delay_seconds: timing.delay_seconds,
                        speed_intervals: None,
                        route_labels: timing.route_labels,
                        weather,
                    };
                    enriched.push(enrich_sample(index, sample));
                }
                Err(e) => {
                    log::warn!("Routing {} {direction} failed: {e}", segment.id);
                    failed += 1;
                }
            }
        }
    }

    let appended = store.append_all(&enriched)?;
    log::debug!("Poll cycle appended {appended} samples ({failed} routes failed)");
    Ok(CycleOutcome { appended, failed })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use async_trait::async_trait;
    use traffic_map_geo::LatLon;
    use traffic_map_sample_models::FlowConfidence;
    use traffic_map_segment_models::SegmentDefinition;

    use super::*;
    use crate::tomtom::RouteTiming;

    /// Provider that answers every route with fixed timings, except for
    /// endpoints on a poisoned latitude.
    struct ScriptedProvider {
        fail_lat: Option<f64>,
    }

    #[async_trait]
    impl TravelTimeProvider for ScriptedProvider {
        async fn route(
            &self,
            origin: LatLon,
            destination: LatLon,
        ) -> Result<RouteTiming, PollError> {
            if let Some(fail_lat) = self.fail_lat
                && ((origin.lat - fail_lat).abs() < 1e-9
                    || (destination.lat - fail_lat).abs() < 1e-9)
            {
                return Err(PollError::Api {
                    message: "scripted failure".to_string(),
                });
            }
            Ok(RouteTiming {
                distance_meters: Some(540.0),
                duration_seconds: Some(90.0),
                static_duration_seconds: Some(60.0),
                delay_seconds: Some(30.0),
                route_labels: Some(vec!["Via Pontida".to_string()]),
            })
        }
    }

    fn temp_store(name: &str) -> SampleStore {
        let path = std::env::temp_dir().join(format!("traffic_map_cycle_{name}.jsonl"));
        let _ = fs::remove_file(&path);
        SampleStore::new(path)
    }

    fn definition(id: &str, lat: f64) -> SegmentDefinition {
        SegmentDefinition {
            id: id.to_string(),
            name: id.to_uppercase(),
            path: vec![LatLon::new(lat, 9.6620), LatLon::new(lat + 0.0007, 9.6685)],
            lanes: None,
            lane_capacity_vph: Some(750.0),
            speed_limit_kph: None,
            bpr: None,
            directions: None,
        }
    }

    #[tokio::test]
    async fn polls_every_segment_in_both_directions() {
        let index = SegmentIndex::build(&[definition("a", 45.69), definition("b", 45.70)]);
        let store = temp_store("both_directions");
        let provider = ScriptedProvider { fail_lat: None };

        let outcome = run_cycle(&provider, &index, None, &store).await.unwrap();
        assert_eq!(outcome, CycleOutcome {
            appended: 4,
            failed: 0
        });

        let records = store.read_all().unwrap();
        assert_eq!(records.len(), 4);

        // One shared timestamp for the whole cycle.
        assert!(records.iter().all(|r| r.requested_at == records[0].requested_at));

        // Reverse swaps the endpoints.
        let forward = records
            .iter()
            .find(|r| r.segment_id == "a" && r.direction == Direction::Forward)
            .unwrap();
        let reverse = records
            .iter()
            .find(|r| r.segment_id == "a" && r.direction == Direction::Reverse)
            .unwrap();
        assert_eq!(forward.origin, reverse.destination);
        assert_eq!(forward.destination, reverse.origin);
    }

    #[tokio::test]
    async fn samples_are_enriched_before_landing_in_the_store() {
        let index = SegmentIndex::build(&[definition("a", 45.69)]);
        let store = temp_store("enriched");
        let provider = ScriptedProvider { fail_lat: None };

        run_cycle(&provider, &index, None, &store).await.unwrap();

        let records = store.read_all().unwrap();
        // 90s live against a 60s baseline at capacity 750: congested.
        assert!(records[0].capacity_vph.is_some());
        assert!(records[0].volume_capacity_ratio.unwrap() > 1.0);
        assert_eq!(records[0].confidence, FlowConfidence::Low);
        assert_eq!(
            records[0].route_labels,
            Some(vec!["Via Pontida".to_string()])
        );
    }

    #[tokio::test]
    async fn route_failures_are_counted_not_fatal() {
        let index = SegmentIndex::build(&[definition("a", 45.69), definition("b", 45.70)]);
        let store = temp_store("failures");
        let provider = ScriptedProvider {
            fail_lat: Some(45.70),
        };

        let outcome = run_cycle(&provider, &index, None, &store).await.unwrap();
        assert_eq!(outcome, CycleOutcome {
            appended: 2,
            failed: 2
        });

        let records = store.read_all().unwrap();
        assert!(records.iter().all(|r| r.segment_id == "a"));
    }

    #[tokio::test]
    async fn weather_snapshot_is_attached_to_every_sample() {
        let index = SegmentIndex::build(&[definition("a", 45.69)]);
        let store = temp_store("weather");
        let provider = ScriptedProvider { fail_lat: None };
        let weather = WeatherSnapshot {
            temperature_c: Some(11.4),
            precipitation_mm: Some(0.2),
            wind_speed_kph: Some(7.9),
            weather_code: Some(61),
        };

        run_cycle(&provider, &index, Some(weather), &store)
            .await
            .unwrap();

        let records = store.read_all().unwrap();
        assert!(records.iter().all(|r| r.weather == Some(weather)));
    }

    #[tokio::test]
    async fn empty_index_appends_nothing() {
        let index = SegmentIndex::build(&[]);
        let store = temp_store("empty");
        let provider = ScriptedProvider { fail_lat: None };

        let outcome = run_cycle(&provider, &index, None, &store).await.unwrap();
        assert_eq!(outcome, CycleOutcome {
            appended: 0,
            failed: 0
        });
        assert!(store.read_all().unwrap().is_empty());
    }
}
