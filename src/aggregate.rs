//! # Visit Aggregation
//!
//! Turns recorded sessions into per-cell visit counts.
//!
//! A cell's count is the number of distinct *sessions* that touched it, not
//! the number of samples: a session that lingers in one cell for 50 fixes
//! still adds exactly 1. The in-progress buffer counts as one more session
//! when it is non-empty.
//!
//! [`compute_grid_counts`] is the reference: it always rebuilds from the full
//! input. [`IncrementalGridCounts`] keeps a running tally for callers that add
//! sessions one at a time, and must agree with a full rebuild at every step.

use std::collections::{HashMap, HashSet};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::grid::{CellId, Grid, CELL_SIZE_METERS};
use crate::{Bounds, GpsPoint, Session};

/// Session count per visited cell. Cells never visited are absent.
pub type GridCounts = HashMap<CellId, u32>;

/// Configuration for grid aggregation
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GridConfig {
    /// Grid cell size in meters (default: 100m)
    pub cell_size_meters: f64,
    /// Optional bounds; samples outside are ignored
    pub bounds: Option<Bounds>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size_meters: CELL_SIZE_METERS,
            bounds: None,
        }
    }
}

impl GridConfig {
    pub fn grid(&self) -> Grid {
        Grid::new(self.cell_size_meters)
    }
}

/// A single (cell, count) pair, for callers that need a flat list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct CellCount {
    pub cell: CellId,
    pub count: u32,
}

/// Distinct cells touched by one session's points.
pub fn distinct_cells(points: &[GpsPoint], config: &GridConfig) -> HashSet<CellId> {
    let grid = config.grid();
    points
        .iter()
        .filter(|p| config.bounds.as_ref().map_or(true, |b| b.contains(p)))
        .map(|p| grid.cell_id_of(p))
        .collect()
}

fn add_cells(counts: &mut GridCounts, cells: HashSet<CellId>) {
    for cell in cells {
        *counts.entry(cell).or_insert(0) += 1;
    }
}

/// Count, for every cell, how many sessions touched it (default 100m grid).
///
/// `active` is the buffer of the session currently being recorded; pass an
/// empty slice when idle.
///
/// ```rust
/// use visit_grid::{compute_grid_counts, GpsPoint, Session};
///
/// let here = vec![GpsPoint::new(51.50740, -0.12780); 3];
/// let sessions = vec![
///     Session::new("a", 0, 10, here.clone()),
///     Session::new("b", 20, 30, here),
/// ];
///
/// let counts = compute_grid_counts(&sessions, &[]);
/// assert_eq!(counts.len(), 1);
/// assert_eq!(counts.values().next(), Some(&2));
/// ```
pub fn compute_grid_counts(sessions: &[Session], active: &[GpsPoint]) -> GridCounts {
    compute_grid_counts_with_config(sessions, active, &GridConfig::default())
}

/// [`compute_grid_counts`] with a custom cell size or bounds filter.
pub fn compute_grid_counts_with_config(
    sessions: &[Session],
    active: &[GpsPoint],
    config: &GridConfig,
) -> GridCounts {
    let mut counts = GridCounts::new();

    for session in sessions {
        add_cells(&mut counts, distinct_cells(&session.points, config));
    }

    if !active.is_empty() {
        add_cells(&mut counts, distinct_cells(active, config));
    }

    debug!(
        "[VisitGrid] Aggregated {} sessions (+{} active points) into {} cells",
        sessions.len(),
        active.len(),
        counts.len()
    );

    counts
}

/// Parallel version of [`compute_grid_counts_with_config`].
///
/// Per-session cell sets are computed with rayon, then merged sequentially.
/// Produces exactly the same mapping as the sequential version.
#[cfg(feature = "parallel")]
pub fn compute_grid_counts_parallel(
    sessions: &[Session],
    active: &[GpsPoint],
    config: &GridConfig,
) -> GridCounts {
    use rayon::prelude::*;

    let per_session: Vec<HashSet<CellId>> = sessions
        .par_iter()
        .map(|s| distinct_cells(&s.points, config))
        .collect();

    let mut counts = GridCounts::new();
    for cells in per_session {
        add_cells(&mut counts, cells);
    }

    if !active.is_empty() {
        add_cells(&mut counts, distinct_cells(active, config));
    }

    counts
}

/// Flatten counts into a list sorted by (row, col).
pub fn sorted_counts(counts: &GridCounts) -> Vec<CellCount> {
    let mut list: Vec<CellCount> = counts
        .iter()
        .map(|(&cell, &count)| CellCount { cell, count })
        .collect();
    list.sort_by_key(|c| c.cell);
    list
}

/// Running tally of sealed sessions plus a replaceable active buffer.
///
/// Sealed sessions are folded in once. The active buffer is tracked as its own
/// cell set so it can grow sample by sample and be dropped or sealed without
/// double counting.
#[derive(Debug, Clone)]
pub struct IncrementalGridCounts {
    config: GridConfig,
    sealed: GridCounts,
    active_cells: HashSet<CellId>,
}

impl Default for IncrementalGridCounts {
    fn default() -> Self {
        Self::new(GridConfig::default())
    }
}

impl IncrementalGridCounts {
    pub fn new(config: GridConfig) -> Self {
        Self {
            config,
            sealed: GridCounts::new(),
            active_cells: HashSet::new(),
        }
    }

    /// Seed from already-stored sessions.
    pub fn from_sessions(sessions: &[Session], config: GridConfig) -> Self {
        let mut tally = Self::new(config);
        for session in sessions {
            tally.add_session(session);
        }
        tally
    }

    /// Fold in one sealed session.
    pub fn add_session(&mut self, session: &Session) {
        add_cells(&mut self.sealed, distinct_cells(&session.points, &self.config));
    }

    /// Add one sample to the active buffer's cell set.
    pub fn push_active(&mut self, point: &GpsPoint) {
        if self.config.bounds.as_ref().map_or(true, |b| b.contains(point)) {
            self.active_cells.insert(self.config.grid().cell_id_of(point));
        }
    }

    /// Replace the active buffer wholesale.
    pub fn set_active(&mut self, points: &[GpsPoint]) {
        self.active_cells = distinct_cells(points, &self.config);
    }

    pub fn clear_active(&mut self) {
        self.active_cells.clear();
    }

    /// Current counts, sealed sessions plus the active buffer.
    pub fn counts(&self) -> GridCounts {
        let mut counts = self.sealed.clone();
        for cell in &self.active_cells {
            *counts.entry(*cell).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{cell_bounds, cell_id_of};

    /// `n` distinct points inside the cell containing `anchor`.
    fn points_in_cell(anchor: GpsPoint, n: usize) -> Vec<GpsPoint> {
        let ring = cell_bounds(cell_id_of(&anchor));
        let (sw, ne) = (ring[0], ring[2]);
        (0..n)
            .map(|i| {
                let f = 0.1 + 0.8 * (i as f64 / n.max(1) as f64);
                GpsPoint::new(
                    sw.latitude + f * (ne.latitude - sw.latitude),
                    sw.longitude + f * (ne.longitude - sw.longitude),
                )
            })
            .collect()
    }

    /// Walk north in ~10m steps, crossing several cells.
    fn walk_north(start: GpsPoint, steps: usize) -> Vec<GpsPoint> {
        (0..steps)
            .map(|i| GpsPoint::new(start.latitude + i as f64 * 0.00009, start.longitude))
            .collect()
    }

    fn session(id: &str, points: Vec<GpsPoint>) -> Session {
        Session::new(id, 0, 1, points)
    }

    #[test]
    fn test_empty_inputs() {
        assert!(compute_grid_counts(&[], &[]).is_empty());
    }

    #[test]
    fn test_session_dedup() {
        let london = GpsPoint::new(51.5074, -0.1278);
        let s = session("s1", points_in_cell(london, 50));

        let counts = compute_grid_counts(&[s], &[]);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[&cell_id_of(&london)], 1);
    }

    #[test]
    fn test_two_sessions_same_cell() {
        let london = GpsPoint::new(51.5074, -0.1278);
        let a = session("a", points_in_cell(london, 3));
        let b = session("b", points_in_cell(london, 3));

        let counts = compute_grid_counts(&[a, b], &[]);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[&cell_id_of(&london)], 2);
    }

    #[test]
    fn test_active_buffer_counts_as_session() {
        let london = GpsPoint::new(51.5074, -0.1278);
        let sealed = session("a", points_in_cell(london, 3));
        let active = points_in_cell(london, 5);

        let counts = compute_grid_counts(&[sealed], &active);
        assert_eq!(counts[&cell_id_of(&london)], 2);
    }

    #[test]
    fn test_additivity_disjoint() {
        let a: Vec<Session> = vec![
            session("a1", walk_north(GpsPoint::new(51.5074, -0.1278), 40)),
            session("a2", walk_north(GpsPoint::new(51.5080, -0.1278), 20)),
        ];
        let b: Vec<Session> = vec![session("b1", walk_north(GpsPoint::new(40.7128, -74.0060), 40))];

        let counts_a = compute_grid_counts(&a, &[]);
        let counts_b = compute_grid_counts(&b, &[]);
        let all: Vec<Session> = a.iter().chain(b.iter()).cloned().collect();
        let counts_all = compute_grid_counts(&all, &[]);

        for (cell, count) in &counts_all {
            let expected = counts_a.get(cell).copied().unwrap_or(0)
                + counts_b.get(cell).copied().unwrap_or(0);
            assert_eq!(*count, expected);
        }
        assert_eq!(counts_all.len(), counts_a.len() + counts_b.len());
    }

    #[test]
    fn test_overlapping_sessions_add_per_session() {
        let path = walk_north(GpsPoint::new(51.5074, -0.1278), 30);
        let sessions: Vec<Session> = (0..4)
            .map(|i| session(&format!("s{}", i), path.clone()))
            .collect();

        let single = compute_grid_counts(&sessions[..1], &[]);
        let all = compute_grid_counts(&sessions, &[]);
        assert_eq!(single.len(), all.len());
        for (cell, count) in &all {
            assert_eq!(*count, single[cell] * 4);
        }
    }

    #[test]
    fn test_recomputation_is_stable() {
        let sessions = vec![
            session("a", walk_north(GpsPoint::new(51.5074, -0.1278), 25)),
            session("b", walk_north(GpsPoint::new(51.5090, -0.1278), 25)),
        ];
        let first = compute_grid_counts(&sessions, &[]);
        let second = compute_grid_counts(&sessions, &[]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_bounds_filter() {
        let config = GridConfig {
            bounds: Some(Bounds {
                min_lat: 51.0,
                max_lat: 52.0,
                min_lng: -1.0,
                max_lng: 1.0,
            }),
            ..GridConfig::default()
        };
        let s = session(
            "mixed",
            vec![GpsPoint::new(51.5074, -0.1278), GpsPoint::new(40.7128, -74.0060)],
        );
        let counts = compute_grid_counts_with_config(&[s], &[], &config);
        assert_eq!(counts.len(), 1);
        assert!(counts.contains_key(&cell_id_of(&GpsPoint::new(51.5074, -0.1278))));
    }

    #[test]
    fn test_incremental_matches_full_recompute() {
        let sessions = vec![
            session("a", walk_north(GpsPoint::new(51.5074, -0.1278), 25)),
            session("b", walk_north(GpsPoint::new(51.5085, -0.1278), 25)),
            session("c", points_in_cell(GpsPoint::new(51.5074, -0.1278), 10)),
        ];
        let active = walk_north(GpsPoint::new(51.5070, -0.1278), 15);

        let mut tally = IncrementalGridCounts::default();
        for (i, s) in sessions.iter().enumerate() {
            tally.add_session(s);
            assert_eq!(tally.counts(), compute_grid_counts(&sessions[..=i], &[]));
        }

        for (i, p) in active.iter().enumerate() {
            tally.push_active(p);
            assert_eq!(tally.counts(), compute_grid_counts(&sessions, &active[..=i]));
        }

        tally.clear_active();
        assert_eq!(tally.counts(), compute_grid_counts(&sessions, &[]));

        tally.set_active(&active);
        assert_eq!(tally.counts(), compute_grid_counts(&sessions, &active));
    }

    #[test]
    fn test_incremental_from_sessions() {
        let sessions = vec![
            session("a", walk_north(GpsPoint::new(-33.8688, 151.2093), 25)),
            session("b", walk_north(GpsPoint::new(-33.8690, 151.2093), 25)),
        ];
        let tally = IncrementalGridCounts::from_sessions(&sessions, GridConfig::default());
        assert_eq!(tally.counts(), compute_grid_counts(&sessions, &[]));
    }

    #[test]
    fn test_sorted_counts() {
        let sessions = vec![session("a", walk_north(GpsPoint::new(51.5074, -0.1278), 40))];
        let list = sorted_counts(&compute_grid_counts(&sessions, &[]));
        assert!(list.len() > 1);
        assert!(list.windows(2).all(|w| w[0].cell < w[1].cell));
        assert!(list.iter().all(|c| c.count == 1));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let sessions: Vec<Session> = (0..20)
            .map(|i| {
                session(
                    &format!("s{}", i),
                    walk_north(GpsPoint::new(51.5 + i as f64 * 0.0005, -0.1278), 30),
                )
            })
            .collect();
        let active = walk_north(GpsPoint::new(51.5, -0.1278), 10);
        let config = GridConfig::default();

        assert_eq!(
            compute_grid_counts_parallel(&sessions, &active, &config),
            compute_grid_counts_with_config(&sessions, &active, &config)
        );
    }
}
