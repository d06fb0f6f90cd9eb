//! # Geographic Utilities
//!
//! Small helpers shared by sessions and the spatial index.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`polyline_length`] | Total length of a recorded path in meters |
//! | [`meters_to_degrees`] | Convert meters to approximate degrees at a latitude |
//!
//! All functions expect WGS84 degrees.

use geo::{Distance, Haversine, Point};

use crate::projection::METERS_PER_DEGREE;
use crate::GpsPoint;

/// Great-circle distance in meters (spherical Earth, radius 6,371 km).
///
/// ```rust
/// use visit_grid::{GpsPoint, geo_utils};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0);
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Length of a path in meters. Empty or single-point paths are 0.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Convert meters to approximate degrees at a given latitude.
///
/// Uses the longitude scale, which is the larger of the two in degrees, so a
/// square search box built from it always covers the requested radius. The
/// cosine is clamped so the result stays finite near the poles.
#[inline]
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let meters_per_degree = METERS_PER_DEGREE * latitude.to_radians().cos().max(0.1);
    meters / meters_per_degree
}
