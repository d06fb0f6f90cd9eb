//! R-tree over visited cells for viewport queries.
//!
//! The map layer only draws what is on screen. Cells are indexed by their
//! lat/lng envelope so a pan or zoom only touches the cells it needs.

use rstar::{RTree, RTreeObject, AABB};

use crate::aggregate::{CellCount, GridCounts};
use crate::geo_utils::meters_to_degrees;
use crate::grid::{CellId, Grid};
use crate::{Bounds, GpsPoint};

#[derive(Debug, Clone)]
struct IndexedCell {
    id: CellId,
    count: u32,
    sw: [f64; 2],
    ne: [f64; 2],
}

impl RTreeObject for IndexedCell {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.sw, self.ne)
    }
}

/// Spatial index of visited cells.
pub struct CellIndex {
    tree: RTree<IndexedCell>,
}

impl CellIndex {
    /// Bulk-load an index from grid counts.
    pub fn from_counts(counts: &GridCounts, grid: &Grid) -> Self {
        let cells: Vec<IndexedCell> = counts
            .iter()
            .map(|(&id, &count)| {
                let ring = grid.cell_bounds(id);
                IndexedCell {
                    id,
                    count,
                    sw: [ring[0].longitude, ring[0].latitude],
                    ne: [ring[2].longitude, ring[2].latitude],
                }
            })
            .collect();

        Self {
            tree: RTree::bulk_load(cells),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Cells whose outline intersects the viewport, sorted by (row, col).
    pub fn cells_in_viewport(&self, viewport: &Bounds) -> Vec<CellCount> {
        let envelope = AABB::from_corners(
            [viewport.min_lng, viewport.min_lat],
            [viewport.max_lng, viewport.max_lat],
        );
        self.collect(&envelope)
    }

    /// Cells within roughly `radius_meters` of a point (square search box).
    pub fn cells_near(&self, point: &GpsPoint, radius_meters: f64) -> Vec<CellCount> {
        let delta = meters_to_degrees(radius_meters, point.latitude);
        let envelope = AABB::from_corners(
            [point.longitude - delta, point.latitude - delta],
            [point.longitude + delta, point.latitude + delta],
        );
        self.collect(&envelope)
    }

    fn collect(&self, envelope: &AABB<[f64; 2]>) -> Vec<CellCount> {
        let mut hits: Vec<CellCount> = self
            .tree
            .locate_in_envelope_intersecting(envelope)
            .map(|c| CellCount {
                cell: c.id,
                count: c.count,
            })
            .collect();
        hits.sort_by_key(|c| c.cell);
        hits
    }
}
