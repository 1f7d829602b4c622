#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Street segment configuration types and BPR model coefficients.
//!
//! A segment is a fixed stretch of street the poller watches: an ordered
//! coordinate path plus the capacity figures the flow model needs. Segments
//! are defined in a TOML file, immutable during a run, and rebuilt into a
//! lookup index on every configuration (re)load.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use traffic_map_geo::LatLon;

/// Traversal direction along a segment's coordinate path.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    /// First path coordinate to last.
    Forward,
    /// Last path coordinate to first.
    Reverse,
}

impl Direction {
    /// Returns both traversal directions.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Forward, Self::Reverse]
    }

    /// Returns the opposite traversal direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }
}

/// Coefficients of the BPR travel-time function
/// `t = t0 * (1 + alpha * (v/c)^beta)`.
///
/// The global defaults are the standard Bureau of Public Roads values;
/// segments may override them in configuration. They are fixed inputs,
/// never fitted from data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BprCoefficients {
    /// Multiplier on the congestion term.
    pub alpha: f64,
    /// Exponent on the volume/capacity ratio.
    pub beta: f64,
}

impl Default for BprCoefficients {
    fn default() -> Self {
        Self {
            alpha: 0.15,
            beta: 4.0,
        }
    }
}

/// One street segment as defined in the TOML configuration file.
///
/// Optional fields fall back to the resolver defaults (one lane at
/// 900 veh/h, standard BPR coefficients, both directions allowed).
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentDefinition {
    /// Unique identifier (e.g., `"via-pontida"`).
    pub id: String,
    /// Human-readable display name.
    pub name: String,
    /// Ordered coordinate path; at least two points for usable geometry.
    pub path: Vec<LatLon>,
    /// Number of lanes per direction.
    #[serde(default)]
    pub lanes: Option<u32>,
    /// Capacity of a single lane in vehicles per hour.
    #[serde(default)]
    pub lane_capacity_vph: Option<f64>,
    /// Posted speed limit in km/h, if known.
    #[serde(default)]
    pub speed_limit_kph: Option<f64>,
    /// Per-segment override of the BPR coefficients.
    #[serde(default)]
    pub bpr: Option<BprCoefficients>,
    /// Allowed traversal directions; absent means both.
    #[serde(default)]
    pub directions: Option<Vec<Direction>>,
}

impl SegmentDefinition {
    /// Returns the directions this segment is polled in.
    ///
    /// An absent list means both directions; a present list is taken as-is
    /// (so an explicit empty list disables the segment).
    #[must_use]
    pub fn allowed_directions(&self) -> Vec<Direction> {
        self.directions
            .clone()
            .unwrap_or_else(|| Direction::all().to_vec())
    }
}

/// The whole segment configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentsConfig {
    /// Representative point for corridor weather snapshots, if any.
    #[serde(default)]
    pub weather: Option<LatLon>,
    /// Watched segments.
    #[serde(default)]
    pub segments: Vec<SegmentDefinition>,
}
