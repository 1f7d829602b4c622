#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Segment configuration loading and the per-segment capacity index.
//!
//! Configuration is a TOML file of [`SegmentDefinition`]s. Loading validates
//! the file, and [`SegmentIndex::build`] resolves every definition into the
//! record the flow engine consumes (capacity, BPR coefficients, precomputed
//! path length). The index is immutable: a configuration reload builds a
//! fresh index and replaces the old one wholesale, so a removed segment can
//! never linger as a stale entry.
//!
//! [`SegmentDefinition`]: traffic_map_segment_models::SegmentDefinition

pub mod config;
pub mod index;

pub use config::{load_config, parse_config};
pub use index::{DEFAULT_LANES, DEFAULT_LANE_CAPACITY_VPH, ResolvedSegment, SegmentIndex};

/// Errors that can occur while loading segment configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading the configuration file failed.
    #[error("failed to read segment config: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML or is missing required fields.
    #[error("failed to parse segment config: {0}")]
    Toml(#[from] toml::de::Error),

    /// The file parsed but violates a configuration invariant.
    #[error("invalid segment config: {message}")]
    Invalid {
        /// Description of the violated invariant.
        message: String,
    },
}
