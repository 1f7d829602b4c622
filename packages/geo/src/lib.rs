#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic coordinate primitives and geodesic path length.
//!
//! Segment geometry is an ordered polyline of WGS84 coordinates; the length
//! of a segment is the sum of great-circle distances between consecutive
//! points. Distances use the half-angle haversine form, which stays
//! numerically stable for the short hops (tens to hundreds of meters)
//! between polyline vertices where the law-of-cosines form loses precision.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters used for all great-circle distances.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in decimal degrees (positive north).
    pub lat: f64,
    /// Longitude in decimal degrees (positive east).
    pub lon: f64,
}

impl LatLon {
    /// Creates a coordinate from latitude and longitude in decimal degrees.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Great-circle distance between two coordinates in meters (haversine).
#[must_use]
pub fn haversine_meters(a: LatLon, b: LatLon) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();

    EARTH_RADIUS_METERS * c
}

/// Total length in meters of an ordered coordinate path.
///
/// Returns `None` for paths with fewer than two points: a segment without
/// usable geometry is "length unavailable", which downstream flow
/// derivation treats differently from an actual zero-length path.
#[must_use]
pub fn path_length_meters(path: &[LatLon]) -> Option<f64> {
    if path.len() < 2 {
        return None;
    }
    Some(path.windows(2).map(|pair| haversine_meters(pair[0], pair[1])).sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Meters per degree of latitude along a meridian on a 6,371 km sphere.
    const METERS_PER_DEGREE: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

    #[test]
    fn one_degree_of_latitude() {
        let d = haversine_meters(LatLon::new(0.0, 0.0), LatLon::new(1.0, 0.0));
        assert!((d - METERS_PER_DEGREE).abs() < 0.01, "got {d}");
    }

    #[test]
    fn quarter_circumference_along_equator() {
        let d = haversine_meters(LatLon::new(0.0, 0.0), LatLon::new(0.0, 90.0));
        let expected = EARTH_RADIUS_METERS * std::f64::consts::FRAC_PI_2;
        assert!((d - expected).abs() < 0.01, "got {d}");
    }

    #[test]
    fn antipodal_points() {
        let d = haversine_meters(LatLon::new(0.0, 0.0), LatLon::new(0.0, 180.0));
        let expected = EARTH_RADIUS_METERS * std::f64::consts::PI;
        assert!((d - expected).abs() < 0.01, "got {d}");
    }

    #[test]
    fn stable_at_meter_scale() {
        // ~1 m of latitude; the half-angle form must not collapse to 0.
        let a = LatLon::new(45.697_2, 9.669_8);
        let b = LatLon::new(45.697_2 + 1.0 / METERS_PER_DEGREE, 9.669_8);
        let d = haversine_meters(a, b);
        assert!((d - 1.0).abs() < 0.001, "got {d}");
    }

    #[test]
    fn identical_points_are_zero() {
        let p = LatLon::new(45.0, 9.0);
        assert!(haversine_meters(p, p).abs() < f64::EPSILON);
    }

    #[test]
    fn path_length_sums_consecutive_legs() {
        let path = [
            LatLon::new(0.0, 0.0),
            LatLon::new(1.0, 0.0),
            LatLon::new(2.0, 0.0),
        ];
        let total = path_length_meters(&path).unwrap();
        assert!((total - 2.0 * METERS_PER_DEGREE).abs() < 0.01, "got {total}");
    }

    #[test]
    fn short_paths_are_unavailable_not_zero() {
        assert!(path_length_meters(&[]).is_none());
        assert!(path_length_meters(&[LatLon::new(45.0, 9.0)]).is_none());
    }

    #[test]
    fn two_identical_points_are_zero_length() {
        let p = LatLon::new(45.0, 9.0);
        let total = path_length_meters(&[p, p]).unwrap();
        assert!(total.abs() < f64::EPSILON);
    }
}
