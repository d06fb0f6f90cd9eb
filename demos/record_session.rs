//! Recording sessions on a tracker thread and watching snapshots arrive.
//!
//! Run with: cargo run --example record_session

use visit_grid::{
    spawn_tracker, GpsPoint, GridConfig, JsonFileStore, LocationProvider, Result,
    SessionRecorder, TierThresholds, VisitTracker,
};

/// Pretends to be a phone parked in central London.
struct DemoLocation;

impl LocationProvider for DemoLocation {
    fn permission_granted(&mut self) -> bool {
        true
    }

    fn current_fix(&mut self) -> Result<GpsPoint> {
        Ok(GpsPoint::new(51.5074, -0.1278))
    }
}

fn main() -> Result<()> {
    let path = std::env::temp_dir().join("visit_grid_demo.json");
    let store = JsonFileStore::new(&path);
    let recorder = SessionRecorder::new(DemoLocation);
    let tracker = VisitTracker::open(recorder, store, GridConfig::default());

    let handle = spawn_tracker(tracker)?;
    let updates = handle.subscribe()?;

    handle.start()?;
    for i in 1..=20 {
        handle.sample(GpsPoint::new(51.5074 + i as f64 * 0.0002, -0.1278))?;
    }
    let session = handle.stop()?;

    if let Some(session) = session {
        println!(
            "Recorded {} ({} points, {:.0}m)",
            session.id,
            session.points.len(),
            session.distance_meters()
        );
    }
    println!("{} snapshots published", updates.try_iter().count());

    let snapshot = handle.snapshot()?;
    let map = snapshot.visit_map(&TierThresholds::default());
    println!(
        "{} sessions on disk at {}, {} cells visited, busiest cell seen {} times",
        snapshot.sessions.len(),
        path.display(),
        map.cells.len(),
        map.max_count
    );

    handle.shutdown();
    Ok(())
}
