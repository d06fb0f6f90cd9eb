//! Visit map: everything the map layer needs per visited cell.
//!
//! Built from the same inputs as [`crate::compute_grid_counts`] and always
//! agrees with it on counts. Each cell also carries its tier, outline, the
//! sessions that touched it and when it was first and last visited, so a tap
//! on the map can be answered without another pass over the sessions.

use std::collections::HashMap;

use log::info;

use crate::aggregate::{distinct_cells, GridConfig};
use crate::grid::CellId;
use crate::tiers::{Tier, TierThresholds};
use crate::{GpsPoint, Session};

/// Pseudo-session id used for the in-progress buffer.
pub const ACTIVE_SESSION_ID: &str = "active";

/// A single visited cell
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct VisitedCell {
    pub id: CellId,
    /// Number of distinct sessions that touched this cell
    pub count: u32,
    pub tier: Tier,
    /// Cell center for labels and tap targets
    pub center: GpsPoint,
    /// Closed outline: SW, SE, NE, NW, SW
    pub outline: Vec<GpsPoint>,
    /// Sessions that touched this cell, in input order
    pub session_ids: Vec<String>,
    /// Earliest session start among visits (Unix ms)
    pub first_visit: Option<i64>,
    /// Latest session end among visits (Unix ms)
    pub last_visit: Option<i64>,
}

/// Complete visit map
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct VisitMap {
    /// Visited cells sorted by (row, col)
    pub cells: Vec<VisitedCell>,
    /// Cell size used
    pub cell_size_meters: f64,
    /// Highest count in the map, 0 when empty
    pub max_count: u32,
    /// Sessions that contributed at least one cell
    pub total_sessions: u32,
}

/// Result of tapping the map
#[derive(Debug, Clone)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct CellQueryResult {
    pub cell: VisitedCell,
    pub label: String,
}

#[derive(Debug, Default)]
struct CellBuilder {
    session_ids: Vec<String>,
    first_visit: Option<i64>,
    last_visit: Option<i64>,
}

impl CellBuilder {
    fn record(&mut self, session_id: &str, start: Option<i64>, end: Option<i64>) {
        self.session_ids.push(session_id.to_string());
        if let Some(ts) = start {
            self.first_visit = Some(self.first_visit.map_or(ts, |v| v.min(ts)));
        }
        if let Some(ts) = end {
            self.last_visit = Some(self.last_visit.map_or(ts, |v| v.max(ts)));
        }
    }
}

/// Build the visit map from sealed sessions and the active buffer.
pub fn build_visit_map(
    sessions: &[Session],
    active: &[GpsPoint],
    config: &GridConfig,
    thresholds: &TierThresholds,
) -> VisitMap {
    let mut builders: HashMap<CellId, CellBuilder> = HashMap::new();
    // Sessions are counted by position, not id; ids may repeat
    let mut contributing = 0u32;

    for session in sessions {
        let cells = distinct_cells(&session.points, config);
        if !cells.is_empty() {
            contributing += 1;
        }
        for cell in cells {
            builders.entry(cell).or_default().record(
                &session.id,
                Some(session.start_time),
                Some(session.end_time),
            );
        }
    }

    let active_cells = distinct_cells(active, config);
    if !active_cells.is_empty() {
        contributing += 1;
    }
    for cell in active_cells {
        builders
            .entry(cell)
            .or_default()
            .record(ACTIVE_SESSION_ID, None, None);
    }

    let grid = config.grid();
    let mut cells: Vec<VisitedCell> = builders
        .into_iter()
        .map(|(id, builder)| {
            let count = builder.session_ids.len() as u32;
            VisitedCell {
                id,
                count,
                tier: thresholds.classify(count),
                center: grid.cell_center(id),
                outline: grid.cell_bounds(id).to_vec(),
                session_ids: builder.session_ids,
                first_visit: builder.first_visit,
                last_visit: builder.last_visit,
            }
        })
        .collect();
    cells.sort_by_key(|c| c.id);

    let max_count = cells.iter().map(|c| c.count).max().unwrap_or(0);

    info!(
        "[VisitGrid] Visit map: {} cells from {} sessions (max count {})",
        cells.len(),
        contributing,
        max_count
    );

    VisitMap {
        cells,
        cell_size_meters: config.cell_size_meters,
        max_count,
        total_sessions: contributing,
    }
}

/// Find the visited cell under a tapped location.
pub fn query_cell(map: &VisitMap, point: &GpsPoint) -> Option<CellQueryResult> {
    let target = crate::grid::Grid::new(map.cell_size_meters).cell_id_of(point);
    let index = map.cells.binary_search_by_key(&target, |c| c.id).ok()?;
    let cell = map.cells[index].clone();

    let label = match cell.count {
        1 => "Visited once".to_string(),
        n => format!("Visited {} times", n),
    };

    Some(CellQueryResult { cell, label })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::compute_grid_counts;
    use crate::grid::cell_id_of;

    fn path(start: GpsPoint, steps: usize) -> Vec<GpsPoint> {
        (0..steps)
            .map(|i| GpsPoint::new(start.latitude + i as f64 * 0.00009, start.longitude))
            .collect()
    }

    fn default_map(sessions: &[Session], active: &[GpsPoint]) -> VisitMap {
        build_visit_map(sessions, active, &GridConfig::default(), &TierThresholds::default())
    }

    fn sample_sessions() -> Vec<Session> {
        let london = GpsPoint::new(51.5074, -0.1278);
        vec![
            Session::new("morning", 1_000, 2_000, path(london, 30)),
            Session::new("evening", 5_000, 9_000, path(london, 10)),
            Session::new("later", 10_000, 12_000, vec![london]),
        ]
    }

    #[test]
    fn test_empty_map() {
        let map = default_map(&[], &[]);
        assert!(map.cells.is_empty());
        assert_eq!(map.max_count, 0);
        assert_eq!(map.total_sessions, 0);
    }

    #[test]
    fn test_counts_agree_with_aggregator() {
        let sessions = sample_sessions();
        let active = path(GpsPoint::new(51.5080, -0.1278), 5);
        let map = default_map(&sessions, &active);
        let counts = compute_grid_counts(&sessions, &active);

        assert_eq!(map.cells.len(), counts.len());
        for cell in &map.cells {
            assert_eq!(cell.count, counts[&cell.id]);
            assert_eq!(cell.tier, crate::tier_of(cell.count));
            assert_eq!(cell.outline.len(), 5);
        }
        assert_eq!(map.total_sessions, 4);
    }

    #[test]
    fn test_visit_timestamps() {
        let map = default_map(&sample_sessions(), &[]);
        let start_cell = cell_id_of(&GpsPoint::new(51.5074, -0.1278));
        let cell = map.cells.iter().find(|c| c.id == start_cell).unwrap();

        assert_eq!(cell.count, 3);
        assert_eq!(cell.first_visit, Some(1_000));
        assert_eq!(cell.last_visit, Some(12_000));
        assert_eq!(cell.session_ids, vec!["morning", "evening", "later"]);
    }

    #[test]
    fn test_query_cell() {
        let map = default_map(&sample_sessions(), &[]);

        let hit = query_cell(&map, &GpsPoint::new(51.5074, -0.1278)).unwrap();
        assert_eq!(hit.label, "Visited 3 times");
        assert_eq!(hit.cell.tier, Tier::Medium);

        assert!(query_cell(&map, &GpsPoint::new(40.7128, -74.0060)).is_none());
    }

    #[test]
    fn test_query_single_visit_label() {
        let paris = GpsPoint::new(48.8566, 2.3522);
        let sessions = vec![Session::new("only", 0, 1, vec![paris])];
        let map = default_map(&sessions, &[]);
        let hit = query_cell(&map, &paris).unwrap();
        assert_eq!(hit.label, "Visited once");
    }

    #[test]
    fn test_total_sessions_ignores_id_collisions() {
        let p = GpsPoint::new(51.5074, -0.1278);
        let sessions = vec![
            Session::new(ACTIVE_SESSION_ID, 0, 1, vec![p]),
            Session::new("repeat", 2, 3, vec![p]),
            Session::new("repeat", 4, 5, vec![p]),
        ];
        let map = default_map(&sessions, &[p]);

        assert_eq!(map.cells.len(), 1);
        assert_eq!(map.cells[0].count, 4);
        assert_eq!(map.total_sessions, 4);
    }

    #[test]
    fn test_empty_session_does_not_contribute() {
        let p = GpsPoint::new(51.5074, -0.1278);
        let sessions = vec![
            Session::new("empty", 0, 1, Vec::new()),
            Session::new("real", 2, 3, vec![p]),
        ];
        assert_eq!(default_map(&sessions, &[]).total_sessions, 1);
    }
}
