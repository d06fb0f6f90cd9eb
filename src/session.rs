//! Sealed tracking sessions.

use serde::{Deserialize, Serialize};

use crate::{geo_utils, Bounds, GpsPoint};

/// One continuous recording interval, from start to stop.
///
/// Sessions are produced by [`crate::SessionRecorder::stop`] and never mutated
/// afterwards. Timestamps are Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Session {
    /// Unique session identifier (UUID v4 for recorded sessions)
    pub id: String,
    /// When recording started
    pub start_time: i64,
    /// When recording stopped
    pub end_time: i64,
    /// Recorded fixes in arrival order, beginning with the initial fix
    pub points: Vec<GpsPoint>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        start_time: i64,
        end_time: i64,
        points: Vec<GpsPoint>,
    ) -> Self {
        Self {
            id: id.into(),
            start_time,
            end_time,
            points,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_time - self.start_time
    }

    /// Path length along the recorded points (haversine, meters).
    pub fn distance_meters(&self) -> f64 {
        geo_utils::polyline_length(&self.points)
    }

    /// Bounding box of the recorded points, `None` for an empty session.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.points)
    }
}
