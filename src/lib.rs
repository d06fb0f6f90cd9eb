//! # Visit Grid
//!
//! Session-based GPS visit tracking, aggregated into a 100m grid.
//!
//! This library provides:
//! - Projection of GPS fixes onto a planar grid of fixed-size cells
//! - Per-cell visit counts measured in *sessions*, not samples
//! - Session recording with injectable location, clock and storage
//! - Immutable snapshots for map layers running on other threads
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel aggregation with rayon
//! - **`persistence`** - Enable the SQLite session store
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use visit_grid::{cell_bounds, compute_grid_counts, tier_of, GpsPoint, Session, Tier};
//!
//! let walk = vec![
//!     GpsPoint::new(51.50740, -0.12780),
//!     GpsPoint::new(51.50741, -0.12781),
//!     GpsPoint::new(51.50742, -0.12782),
//! ];
//! let sessions = vec![
//!     Session::new("monday", 0, 60_000, walk.clone()),
//!     Session::new("tuesday", 86_400_000, 86_460_000, walk),
//! ];
//!
//! let counts = compute_grid_counts(&sessions, &[]);
//! for (cell, count) in &counts {
//!     let outline = cell_bounds(*cell);
//!     println!("{:?}: {} visits, {} corners", cell, count, outline.len());
//!     assert_eq!(tier_of(*count), Tier::Medium);
//! }
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, TrackingError};

// Degrees <-> planar meters
pub mod projection;
pub use projection::PlanarPosition;

// Cell ids and outlines
pub mod grid;
pub use grid::{cell_bounds, cell_center, cell_id_of, CellId, Grid, CELL_SIZE_METERS};

// Count -> tier classification
pub mod tiers;
pub use tiers::{tier_of, Tier, TierThresholds};

// Geographic utilities (distance, path length)
pub mod geo_utils;

// Sealed session records
pub mod session;
pub use session::Session;

// Session counts per cell
pub mod aggregate;
#[cfg(feature = "parallel")]
pub use aggregate::compute_grid_counts_parallel;
pub use aggregate::{
    compute_grid_counts, compute_grid_counts_with_config, sorted_counts, CellCount, GridConfig,
    GridCounts, IncrementalGridCounts,
};

// Per-cell detail for the map layer
pub mod visits;
pub use visits::{build_visit_map, query_cell, CellQueryResult, VisitMap, VisitedCell};

// Viewport queries over visited cells
pub mod spatial;
pub use spatial::CellIndex;

// Recording lifecycle
pub mod recorder;
pub use recorder::{Clock, LocationProvider, RecorderState, SessionRecorder, SystemClock};

// Session storage
pub mod store;
#[cfg(feature = "persistence")]
pub use store::SqliteSessionStore;
pub use store::{JsonFileStore, MemorySessionStore, SessionStore};

// Snapshot publishing and the tracker thread
pub mod tracker;
pub use tracker::{spawn_tracker, GridSnapshot, TrackerHandle, VisitTracker};

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("VisitGridRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use visit_grid::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    ///
    /// The grid does not call this; out-of-range fixes are the location
    /// source's problem. Useful for callers that want to filter first.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Latitude/longitude bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Inclusive containment check.
    pub fn contains(&self, point: &GpsPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }
}

// ============================================================================
// FFI Exports (only when feature enabled)
// ============================================================================

#[cfg(feature = "ffi")]
mod ffi {
    use super::*;
    use log::info;

    /// Cell containing a point on the default grid.
    #[uniffi::export]
    pub fn ffi_cell_id_of(point: GpsPoint) -> CellId {
        cell_id_of(&point)
    }

    /// Closed outline of a cell (SW, SE, NE, NW, SW).
    #[uniffi::export]
    pub fn ffi_cell_bounds(cell: CellId) -> Vec<GpsPoint> {
        cell_bounds(cell).to_vec()
    }

    /// Tier for a visit count with default thresholds.
    #[uniffi::export]
    pub fn ffi_tier_of(count: u32) -> Tier {
        tier_of(count)
    }

    /// Session counts per cell, as a flat list sorted by (row, col).
    #[uniffi::export]
    pub fn ffi_compute_grid_counts(
        sessions: Vec<Session>,
        active: Vec<GpsPoint>,
        config: GridConfig,
    ) -> Vec<CellCount> {
        init_logging();
        info!(
            "[VisitGridRust] compute_grid_counts: {} sessions, {} active points",
            sessions.len(),
            active.len()
        );

        let start = std::time::Instant::now();
        let counts = compute_grid_counts_parallel(&sessions, &active, &config);
        let result = sorted_counts(&counts);

        info!(
            "[VisitGridRust] {} cells in {:?}",
            result.len(),
            start.elapsed()
        );
        result
    }

    /// Full visit map for rendering.
    #[uniffi::export]
    pub fn ffi_build_visit_map(
        sessions: Vec<Session>,
        active: Vec<GpsPoint>,
        config: GridConfig,
        thresholds: TierThresholds,
    ) -> VisitMap {
        init_logging();
        build_visit_map(&sessions, &active, &config, &thresholds)
    }

    /// Look up the visited cell under a tapped location.
    #[uniffi::export]
    pub fn ffi_query_visit_map(map: VisitMap, point: GpsPoint) -> Option<CellQueryResult> {
        query_cell(&map, &point)
    }

    /// Load sessions from a JSON store file.
    #[uniffi::export]
    pub fn ffi_load_sessions(path: String) -> std::result::Result<Vec<Session>, TrackingError> {
        init_logging();
        JsonFileStore::new(path).load()
    }

    /// Append a sealed session to a JSON store file.
    #[uniffi::export]
    pub fn ffi_append_session(
        path: String,
        session: Session,
    ) -> std::result::Result<(), TrackingError> {
        init_logging();
        JsonFileStore::new(path).append(&session)
    }

    /// Get default grid configuration.
    #[uniffi::export]
    pub fn default_grid_config() -> GridConfig {
        GridConfig::default()
    }

    /// Get default tier thresholds.
    #[uniffi::export]
    pub fn default_tier_thresholds() -> TierThresholds {
        TierThresholds::default()
    }
}

// ============================================================================
// Tests
// ============================================================================
