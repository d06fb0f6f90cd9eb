//! Aggregating sessions into grid counts and tiers.
//!
//! Run with: cargo run --example grid_counts

use visit_grid::{
    cell_bounds, compute_grid_counts, sorted_counts, tier_of, GpsPoint, Session,
};

/// Walk north from `start` in ~10m steps.
fn walk(start: GpsPoint, steps: usize) -> Vec<GpsPoint> {
    (0..steps)
        .map(|i| GpsPoint::new(start.latitude + i as f64 * 0.00009, start.longitude))
        .collect()
}

fn main() {
    let home = GpsPoint::new(51.5074, -0.1278);
    let park = GpsPoint::new(51.5120, -0.1278);

    // Commute every weekday, the park twice
    let mut sessions: Vec<Session> = (0..5)
        .map(|day| {
            Session::new(
                format!("commute-{}", day),
                day * 86_400_000,
                day * 86_400_000 + 1_800_000,
                walk(home, 30),
            )
        })
        .collect();
    sessions.push(Session::new("park-1", 0, 1, walk(park, 10)));
    sessions.push(Session::new("park-2", 2, 3, walk(park, 10)));

    // Something in progress right now
    let active = walk(home, 5);

    println!("Grid Counts Example\n");
    println!("{} sealed sessions, {} active points\n", sessions.len(), active.len());

    let counts = compute_grid_counts(&sessions, &active);
    for entry in sorted_counts(&counts) {
        let sw = cell_bounds(entry.cell)[0];
        println!(
            "  cell ({:>6}, {:>4})  sw=({:.5}, {:.5})  sessions={:<2} tier={:?} {}",
            entry.cell.row,
            entry.cell.col,
            sw.latitude,
            sw.longitude,
            entry.count,
            tier_of(entry.count),
            tier_of(entry.count).color_hex()
        );
    }
}
