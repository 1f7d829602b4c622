//! Segment configuration file loading and validation.
//!
//! Hard errors are reserved for contract violations (unreadable file, bad
//! TOML, duplicate ids). Degenerate but well-formed entries, such as a
//! one-point path or a zero lane count, are logged and kept: they degrade
//! that segment's derivations to null fields instead of blocking the rest
//! of the corridor from loading.

use std::collections::HashSet;
use std::path::Path;

use traffic_map_segment_models::SegmentsConfig;

use crate::ConfigError;

/// Loads and validates the segment configuration file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read, is not valid TOML,
/// or contains duplicate or empty segment ids.
pub fn load_config(path: &Path) -> Result<SegmentsConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)?;
    let config = parse_config(&raw)?;
    log::info!(
        "Loaded {} segments from {}",
        config.segments.len(),
        path.display()
    );
    Ok(config)
}

/// Parses and validates segment configuration from a TOML string.
///
/// # Errors
///
/// Returns [`ConfigError`] if the TOML is malformed or ids are duplicated
/// or empty.
pub fn parse_config(raw: &str) -> Result<SegmentsConfig, ConfigError> {
    let config: SegmentsConfig = toml::de::from_str(raw)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &SegmentsConfig) -> Result<(), ConfigError> {
    let mut seen_ids: HashSet<&str> = HashSet::with_capacity(config.segments.len());

    for segment in &config.segments {
        if segment.id.is_empty() {
            return Err(ConfigError::Invalid {
                message: format!("segment \"{}\" has an empty id", segment.name),
            });
        }
        if !seen_ids.insert(segment.id.as_str()) {
            return Err(ConfigError::Invalid {
                message: format!("duplicate segment id: {}", segment.id),
            });
        }

        if segment.path.len() < 2 {
            log::warn!(
                "Segment {} has {} path point(s); its length will be unavailable",
                segment.id,
                segment.path.len()
            );
        }
        if segment.lanes == Some(0) {
            log::warn!("Segment {} has 0 lanes; flow cannot be derived for it", segment.id);
        }
        if let Some(capacity) = segment.lane_capacity_vph
            && capacity <= 0.0
        {
            log::warn!(
                "Segment {} has non-positive lane capacity {capacity}; \
                 flow cannot be derived for it",
                segment.id
            );
        }
        if let Some(bpr) = &segment.bpr
            && (bpr.alpha <= 0.0 || bpr.beta <= 0.0)
        {
            log::warn!(
                "Segment {} overrides BPR coefficients with alpha={} beta={}; \
                 the inversion will yield null ratios",
                segment.id,
                bpr.alpha,
                bpr.beta
            );
        }
    }

    Ok(())
}
