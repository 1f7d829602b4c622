//! Per-segment capacity and coefficient resolution.
//!
//! [`SegmentIndex::build`] is a pure function from a definition list to a
//! lookup structure; it is invoked once at startup and again on every
//! configuration reload. Hosts that reload while lookups are in flight swap
//! an `Arc<SegmentIndex>`, so a reader keeps whichever index version it
//! started with and never observes a partial rebuild.

use std::collections::HashMap;

use traffic_map_geo::{LatLon, path_length_meters};
use traffic_map_segment_models::{BprCoefficients, Direction, SegmentDefinition};

/// Lane count assumed when configuration omits one.
pub const DEFAULT_LANES: u32 = 1;

/// Single-lane capacity in vehicles per hour assumed when configuration
/// omits one. 900 veh/h is a conservative urban arterial figure.
pub const DEFAULT_LANE_CAPACITY_VPH: f64 = 900.0;

/// A segment definition with every modeling input resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSegment {
    /// Unique identifier.
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Ordered coordinate path from configuration.
    pub path: Vec<LatLon>,
    /// Lane count (default applied).
    pub lanes: u32,
    /// Per-lane capacity in vehicles per hour (default applied).
    pub lane_capacity_vph: f64,
    /// Total capacity: `lanes * lane_capacity_vph`.
    pub capacity_vph: f64,
    /// BPR coefficients (segment override or the global defaults).
    pub coefficients: BprCoefficients,
    /// Geodesic path length; `None` when the path has fewer than two points.
    pub length_meters: Option<f64>,
    /// Posted speed limit in km/h, if configured.
    pub speed_limit_kph: Option<f64>,
    /// Directions this segment is polled in.
    pub directions: Vec<Direction>,
}

/// Lookup index from segment id to its resolved record.
///
/// Built wholesale from a definition list; never mutated in place. Lookups
/// are O(1). Iteration order is unspecified, so anything user-facing should
/// sort at the edge.
#[derive(Debug, Default)]
pub struct SegmentIndex {
    segments: HashMap<String, ResolvedSegment>,
}

impl SegmentIndex {
    /// Resolves every definition and builds a fresh index.
    ///
    /// Duplicate ids are rejected at configuration load; if handed
    /// duplicates anyway, the later definition wins.
    #[must_use]
    pub fn build(definitions: &[SegmentDefinition]) -> Self {
        let mut segments = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            let resolved = resolve(definition);
            segments.insert(resolved.id.clone(), resolved);
        }
        log::debug!("Built segment index with {} entries", segments.len());
        Self { segments }
    }

    /// Looks up a segment by id.
    #[must_use]
    pub fn lookup(&self, segment_id: &str) -> Option<&ResolvedSegment> {
        self.segments.get(segment_id)
    }

    /// Number of indexed segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the index holds no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Iterates over resolved segments in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedSegment> {
        self.segments.values()
    }
}

fn resolve(definition: &SegmentDefinition) -> ResolvedSegment {
    let lanes = definition.lanes.unwrap_or(DEFAULT_LANES);
    let lane_capacity_vph = definition
        .lane_capacity_vph
        .unwrap_or(DEFAULT_LANE_CAPACITY_VPH);

    ResolvedSegment {
        id: definition.id.clone(),
        name: definition.name.clone(),
        path: definition.path.clone(),
        lanes,
        lane_capacity_vph,
        capacity_vph: f64::from(lanes) * lane_capacity_vph,
        coefficients: definition.bpr.unwrap_or_default(),
        length_meters: path_length_meters(&definition.path),
        speed_limit_kph: definition.speed_limit_kph,
        directions: definition.allowed_directions(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(id: &str) -> SegmentDefinition {
        SegmentDefinition {
            id: id.to_string(),
            name: id.to_uppercase(),
            path: vec![LatLon::new(45.6972, 9.6620), LatLon::new(45.6965, 9.6685)],
            lanes: None,
            lane_capacity_vph: None,
            speed_limit_kph: None,
            bpr: None,
            directions: None,
        }
    }

    #[test]
    fn applies_defaults_when_fields_absent() {
        let index = SegmentIndex::build(&[definition("via-pontida")]);
        let resolved = index.lookup("via-pontida").unwrap();

        assert_eq!(resolved.lanes, DEFAULT_LANES);
        assert!((resolved.lane_capacity_vph - DEFAULT_LANE_CAPACITY_VPH).abs() < f64::EPSILON);
        assert!((resolved.capacity_vph - 900.0).abs() < f64::EPSILON);
        assert_eq!(resolved.coefficients, BprCoefficients::default());
        assert_eq!(
            resolved.directions,
            vec![Direction::Forward, Direction::Reverse]
        );
    }

    #[test]
    fn capacity_is_lanes_times_lane_capacity() {
        let mut wide = definition("via-broseta");
        wide.lanes = Some(3);
        wide.lane_capacity_vph = Some(750.0);

        let index = SegmentIndex::build(&[wide]);
        let resolved = index.lookup("via-broseta").unwrap();
        assert_eq!(resolved.lanes, 3);
        assert!((resolved.capacity_vph - 2250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn segment_override_beats_global_coefficients() {
        let mut custom = definition("via-san-bernardino");
        custom.bpr = Some(BprCoefficients {
            alpha: 0.2,
            beta: 4.5,
        });

        let index = SegmentIndex::build(&[custom]);
        let coefficients = index.lookup("via-san-bernardino").unwrap().coefficients;
        assert!((coefficients.alpha - 0.2).abs() < f64::EPSILON);
        assert!((coefficients.beta - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn precomputes_path_length() {
        let index = SegmentIndex::build(&[definition("via-pontida")]);
        let length = index.lookup("via-pontida").unwrap().length_meters.unwrap();
        // ~510 m between the two Via Pontida endpoints.
        assert!(length > 450.0 && length < 600.0, "got {length}");
    }

    #[test]
    fn degenerate_path_has_no_length() {
        let mut stub = definition("stub");
        stub.path = vec![LatLon::new(45.0, 9.0)];

        let index = SegmentIndex::build(&[stub]);
        assert!(index.lookup("stub").unwrap().length_meters.is_none());
    }

    #[test]
    fn unknown_id_is_none() {
        let index = SegmentIndex::build(&[definition("via-pontida")]);
        assert!(index.lookup("via-tiraboschi").is_none());
    }

    #[test]
    fn rebuild_drops_removed_segments() {
        let index = SegmentIndex::build(&[definition("keep"), definition("remove")]);
        assert!(index.lookup("remove").is_some());

        // Reload with "remove" gone: the rebuilt index must not retain it.
        let index = SegmentIndex::build(&[definition("keep")]);
        assert!(index.lookup("keep").is_some());
        assert!(index.lookup("remove").is_none());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn empty_configuration_builds_empty_index() {
        let index = SegmentIndex::build(&[]);
        assert!(index.is_empty());
        assert!(index.lookup("anything").is_none());
    }
}
