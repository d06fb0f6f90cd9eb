//! # Grid Indexer
//!
//! Maps GPS points to fixed-size square cells in the planar projection and
//! reconstructs a cell's geographic outline for rendering.
//!
//! A point belongs to cell `(row, col)` when its projected position falls in
//! the half-open square `[row*S, (row+1)*S) × [col*S, (col+1)*S)`. `floor` is
//! used, not truncation, so negative coordinates land in the cell below/left
//! of zero rather than collapsing onto row/col 0.
//!
//! ## Floating point at boundaries
//!
//! A sample within a fraction of a millimeter of a cell edge may be assigned to
//! the neighbouring cell depending on rounding. This is accepted; no exact
//! arithmetic is attempted.
//!
//! ## Outline accuracy
//!
//! [`Grid::cell_bounds`] evaluates the longitude scale once, at the cell's
//! vertical midpoint. Points near the top or bottom edge of a cell see a
//! different scale, so the drawn outline is shifted east/west from the cells
//! [`Grid::cell_id_of`] actually assigns. The offset at the top and bottom
//! edges is roughly `east_meters × tan(lat) × (S/2) / R`, with R ≈ 6378 km:
//!
//! - London (-0.13°): under 10 cm
//! - San Francisco (-122.4°, 37.8°N): about 65 m, most of a cell
//!
//! So away from the prime meridian an outline and its cell only overlap
//! partly, and a sample drawn inside one outline can be counted in the
//! neighbouring column. Fine for drawing a heat layer, not for geodesy.

use geo::{LineString, Polygon};
use serde::{Deserialize, Serialize};

use crate::projection::{east_meters_per_degree, to_planar, METERS_PER_DEGREE};
use crate::GpsPoint;

/// Default cell edge length in meters.
pub const CELL_SIZE_METERS: f64 = 100.0;

/// Identifier of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct CellId {
    /// Grid row (northward)
    pub row: i32,
    /// Grid column (eastward)
    pub col: i32,
}

impl CellId {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

/// Square grid over the planar projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    cell_size_meters: f64,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            cell_size_meters: CELL_SIZE_METERS,
        }
    }
}

impl Grid {
    /// Create a grid with a custom cell edge length.
    pub fn new(cell_size_meters: f64) -> Self {
        Self { cell_size_meters }
    }

    pub fn cell_size_meters(&self) -> f64 {
        self.cell_size_meters
    }

    /// Cell containing the given point.
    #[inline]
    pub fn cell_id_of(&self, point: &GpsPoint) -> CellId {
        let planar = to_planar(point);
        CellId {
            row: (planar.north_meters / self.cell_size_meters).floor() as i32,
            col: (planar.east_meters / self.cell_size_meters).floor() as i32,
        }
    }

    /// Closed outline of a cell: SW, SE, NE, NW, SW.
    pub fn cell_bounds(&self, id: CellId) -> [GpsPoint; 5] {
        let (lat_min, lat_max, lng_min, lng_max) = self.cell_extent(id);

        let sw = GpsPoint::new(lat_min, lng_min);
        [
            sw,
            GpsPoint::new(lat_min, lng_max),
            GpsPoint::new(lat_max, lng_max),
            GpsPoint::new(lat_max, lng_min),
            sw,
        ]
    }

    /// Geographic center of a cell.
    pub fn cell_center(&self, id: CellId) -> GpsPoint {
        let (lat_min, lat_max, lng_min, lng_max) = self.cell_extent(id);
        GpsPoint::new((lat_min + lat_max) / 2.0, (lng_min + lng_max) / 2.0)
    }

    /// Cell outline as a `geo` polygon (x = longitude, y = latitude).
    pub fn cell_polygon(&self, id: CellId) -> Polygon<f64> {
        let ring: Vec<(f64, f64)> = self
            .cell_bounds(id)
            .iter()
            .map(|p| (p.longitude, p.latitude))
            .collect();
        Polygon::new(LineString::from(ring), vec![])
    }

    /// (lat_min, lat_max, lng_min, lng_max) of a cell.
    fn cell_extent(&self, id: CellId) -> (f64, f64, f64, f64) {
        let size = self.cell_size_meters;

        let lat_min = id.row as f64 * size / METERS_PER_DEGREE;
        let lat_max = (id.row as f64 + 1.0) * size / METERS_PER_DEGREE;

        // One longitude scale per cell, taken at the vertical midpoint
        let lng_scale = east_meters_per_degree((lat_min + lat_max) / 2.0);
        let lng_min = id.col as f64 * size / lng_scale;
        let lng_max = (id.col as f64 + 1.0) * size / lng_scale;

        (lat_min, lat_max, lng_min, lng_max)
    }
}

/// Cell containing `point` on the default 100m grid.
#[inline]
pub fn cell_id_of(point: &GpsPoint) -> CellId {
    Grid::default().cell_id_of(point)
}

/// Closed outline of a cell on the default 100m grid.
///
/// ```rust
/// use visit_grid::{cell_bounds, cell_id_of, GpsPoint};
///
/// let id = cell_id_of(&GpsPoint::new(51.5074, -0.1278));
/// let ring = cell_bounds(id);
/// assert_eq!(ring.len(), 5);
/// assert_eq!(ring[0], ring[4]);
/// ```
pub fn cell_bounds(id: CellId) -> [GpsPoint; 5] {
    Grid::default().cell_bounds(id)
}

/// Center of a cell on the default 100m grid.
pub fn cell_center(id: CellId) -> GpsPoint {
    Grid::default().cell_center(id)
}
