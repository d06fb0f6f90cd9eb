//! # Coordinate Projection
//!
//! Equirectangular approximation converting WGS84 degrees to local planar meters.
//!
//! - North meters scale is constant: 1 degree of latitude ≈ 111,320 m.
//! - East meters scale shrinks with `cos(latitude)`, so it is evaluated per
//!   coordinate and never cached across latitudes.
//!
//! Positions are only comparable near the latitude band they were computed at.
//! At ±90° the east scale collapses to zero; polar cells are not supported.

use crate::GpsPoint;

/// Meters per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Approximate local position in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarPosition {
    pub north_meters: f64,
    pub east_meters: f64,
}

/// Meters per degree of longitude at the given latitude.
#[inline]
pub fn east_meters_per_degree(latitude: f64) -> f64 {
    METERS_PER_DEGREE * latitude.to_radians().cos()
}

/// Project a GPS point to planar meters.
///
/// ```rust
/// use visit_grid::{GpsPoint, projection};
///
/// let p = projection::to_planar(&GpsPoint::new(0.0, 1.0));
/// assert_eq!(p.north_meters, 0.0);
/// assert!((p.east_meters - 111_320.0).abs() < 1e-6);
/// ```
#[inline]
pub fn to_planar(point: &GpsPoint) -> PlanarPosition {
    PlanarPosition {
        north_meters: point.latitude * METERS_PER_DEGREE,
        east_meters: point.longitude * east_meters_per_degree(point.latitude),
    }
}

/// Inverse of [`to_planar`], using the longitude scale at `reference_lat`.
///
/// Exact for latitude. For longitude it is exact only when `reference_lat`
/// equals the latitude the position was projected at.
#[inline]
pub fn from_planar(position: &PlanarPosition, reference_lat: f64) -> GpsPoint {
    GpsPoint::new(
        position.north_meters / METERS_PER_DEGREE,
        position.east_meters / east_meters_per_degree(reference_lat),
    )
}
