//! Geographic primitives.
//!
//! Distances use a flat-earth approximation of 111,320 m per degree on both
//! axes. This is what the sampler uses to turn a radius in meters into
//! degrees, so the two stay consistent. It is only accurate for the small
//! radii (a few kilometers) a local rank scan covers, and it overstates
//! east-west distances away from the equator.

use serde::{Deserialize, Serialize};

/// Meters per degree used by the planar approximation.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// `true` when both components are finite and inside WGS84 bounds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Planar distance in meters to `other`.
    #[must_use]
    pub fn planar_distance_meters(&self, other: &GeoPoint) -> f64 {
        let d_lat = self.lat - other.lat;
        let d_lng = self.lng - other.lng;
        d_lat.hypot(d_lng) * METERS_PER_DEGREE
    }

    /// Shift by whole degrees on both axes.
    #[must_use]
    pub fn shifted(&self, d_lat: f64, d_lng: f64) -> Self {
        Self {
            lat: self.lat + d_lat,
            lng: self.lng + d_lng,
        }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_provider_location_format() {
        let p = GeoPoint::new(52.23, 21.01);
        assert_eq!(p.to_string(), "52.23,21.01");
    }

    #[test]
    fn rejects_out_of_range_and_non_finite() {
        assert!(GeoPoint::new(52.23, 21.01).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, -180.5).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn one_degree_north_is_one_degree_of_meters() {
        let a = GeoPoint::new(10.0, 10.0);
        let b = a.shifted(1.0, 0.0);
        assert!((a.planar_distance_meters(&b) - METERS_PER_DEGREE).abs() < 1e-6);
    }
}
