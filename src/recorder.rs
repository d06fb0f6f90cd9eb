//! # Session Recorder
//!
//! Lifecycle of the one session being recorded:
//!
//! ```text
//!   Idle --start()--> Recording --stop()--> Idle
//!                      |    ^
//!                      +----+ on_sample()
//! ```
//!
//! The recorder owns the in-progress buffer exclusively. `stop()` hands back a
//! sealed [`Session`]; storing it is the caller's job (see
//! [`crate::VisitTracker`]).
//!
//! State transitions are not synchronized. Callers serialize `start`,
//! `on_sample` and `stop`, either through `&mut self` on one thread or through
//! the tracker's event loop.

use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, TrackingError};
use crate::{GpsPoint, Session};

/// Source of permission and position fixes.
pub trait LocationProvider {
    /// Whether the user has granted location access.
    fn permission_granted(&mut self) -> bool;

    /// One immediate position fix.
    fn current_fix(&mut self) -> Result<GpsPoint>;

    /// Begin delivering samples until [`unsubscribe`](Self::unsubscribe).
    fn subscribe(&mut self) -> Result<()> {
        Ok(())
    }

    /// Cancel the sample subscription. Called once per successful `subscribe`.
    fn unsubscribe(&mut self) {}
}

/// Wall clock in Unix milliseconds.
pub trait Clock {
    fn now_ms(&self) -> i64;
}

/// [`Clock`] backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
}

#[derive(Debug)]
struct ActiveSession {
    id: String,
    start_time: Option<i64>,
    points: Vec<GpsPoint>,
}

/// Records one session at a time.
pub struct SessionRecorder<L, C = SystemClock> {
    location: L,
    clock: C,
    active: Option<ActiveSession>,
}

impl<L: LocationProvider> SessionRecorder<L, SystemClock> {
    pub fn new(location: L) -> Self {
        Self::with_clock(location, SystemClock)
    }
}

impl<L: LocationProvider, C: Clock> SessionRecorder<L, C> {
    pub fn with_clock(location: L, clock: C) -> Self {
        Self {
            location,
            clock,
            active: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        if self.active.is_some() {
            RecorderState::Recording
        } else {
            RecorderState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Points buffered so far; empty while Idle.
    pub fn buffer(&self) -> &[GpsPoint] {
        match &self.active {
            Some(active) => active.points.as_slice(),
            None => &[],
        }
    }

    /// Id of the in-progress session, if any.
    pub fn active_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.id.as_str())
    }

    /// Begin recording.
    ///
    /// Fails with `AlreadyRecording` (leaving the current buffer untouched),
    /// `PermissionDenied` or `LocationUnavailable`. On any failure the
    /// recorder state is unchanged.
    pub fn start(&mut self) -> Result<()> {
        if self.active.is_some() {
            debug!("[VisitGrid] start ignored, already recording");
            return Err(TrackingError::AlreadyRecording);
        }

        if !self.location.permission_granted() {
            warn!("[VisitGrid] start aborted: location permission denied");
            return Err(TrackingError::PermissionDenied);
        }

        let fix = self.location.current_fix().map_err(|e| {
            warn!("[VisitGrid] start aborted: {}", e);
            match e {
                TrackingError::LocationUnavailable { .. } | TrackingError::PermissionDenied => e,
                other => TrackingError::location_unavailable(other.to_string()),
            }
        })?;

        self.location.subscribe().map_err(|e| {
            warn!("[VisitGrid] start aborted, subscription failed: {}", e);
            match e {
                TrackingError::LocationUnavailable { .. } => e,
                other => TrackingError::location_unavailable(other.to_string()),
            }
        })?;

        let id = Uuid::new_v4().to_string();
        let start_time = self.clock.now_ms();
        info!("[VisitGrid] Recording session {}", id);

        self.active = Some(ActiveSession {
            id,
            start_time: Some(start_time),
            points: vec![fix],
        });
        Ok(())
    }

    /// Append a sample. Returns `false` (and drops the sample) while Idle.
    pub fn on_sample(&mut self, point: GpsPoint) -> bool {
        match self.active.as_mut() {
            Some(active) => {
                active.points.push(point);
                true
            }
            None => false,
        }
    }

    /// Seal the buffer into a session and return to Idle.
    ///
    /// Returns `None` when Idle, or when there is nothing to seal.
    pub fn stop(&mut self) -> Option<Session> {
        let active = self.active.take()?;
        self.location.unsubscribe();
        let end_time = self.clock.now_ms();

        let start_time = match active.start_time {
            Some(t) if !active.points.is_empty() => t,
            _ => {
                warn!("[VisitGrid] stop with nothing to seal for {}", active.id);
                return None;
            }
        };

        info!(
            "[VisitGrid] Sealed session {} with {} points",
            active.id,
            active.points.len()
        );

        Some(Session {
            id: active.id,
            start_time,
            end_time: end_time.max(start_time),
            points: active.points,
        })
    }
}
