//! # Visit Tracker
//!
//! Ties the recorder, the session store and the aggregator together.
//!
//! Every change (start, sample, stop) rebuilds [`GridCounts`] from the full
//! session list plus the live buffer and publishes a new immutable
//! [`GridSnapshot`]. Observers get `Arc` snapshots over a channel and never see
//! the recorder's buffer itself, so a snapshot can be aggregated or rendered on
//! any thread while recording carries on.
//!
//! [`VisitTracker`] is single-owner: all mutation goes through `&mut self`.
//! [`spawn_tracker`] moves it onto a dedicated thread and feeds it events in
//! arrival order, which is how a location callback and a UI "stop" button are
//! kept from racing each other.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{info, warn};

use crate::aggregate::{compute_grid_counts_with_config, GridConfig, GridCounts};
use crate::error::{Result, TrackingError};
use crate::grid::CellId;
use crate::recorder::{Clock, LocationProvider, SessionRecorder, SystemClock};
use crate::store::SessionStore;
use crate::tiers::{Tier, TierThresholds};
use crate::visits::{build_visit_map, VisitMap};
use crate::{GpsPoint, Session};

/// Consistent view of all tracking state at one instant.
#[derive(Debug, Clone)]
pub struct GridSnapshot {
    /// Increases by one with every published change
    pub version: u64,
    /// Sealed sessions, oldest first
    pub sessions: Arc<Vec<Session>>,
    /// Copy of the in-progress buffer (empty when idle)
    pub active: Arc<[GpsPoint]>,
    /// Session counts per cell, including the active buffer
    pub counts: Arc<GridCounts>,
    /// Config `counts` was computed with
    pub config: GridConfig,
}

impl GridSnapshot {
    pub fn count(&self, cell: &CellId) -> u32 {
        self.counts.get(cell).copied().unwrap_or(0)
    }

    /// Tier of a visited cell, `None` for cells never visited.
    pub fn tier(&self, cell: &CellId, thresholds: &TierThresholds) -> Option<Tier> {
        self.counts.get(cell).map(|&c| thresholds.classify(c))
    }

    /// Per-cell detail built with the same config as `counts`.
    pub fn visit_map(&self, thresholds: &TierThresholds) -> VisitMap {
        build_visit_map(&self.sessions, &self.active, &self.config, thresholds)
    }
}

/// Recorder + store + derived grid counts.
pub struct VisitTracker<L, S, C = SystemClock> {
    recorder: SessionRecorder<L, C>,
    store: S,
    config: GridConfig,
    sessions: Arc<Vec<Session>>,
    snapshot: Arc<GridSnapshot>,
    subscribers: Vec<Sender<Arc<GridSnapshot>>>,
}

impl<L, S, C> VisitTracker<L, S, C>
where
    L: LocationProvider,
    S: SessionStore,
    C: Clock,
{
    /// Load stored sessions and build the initial snapshot.
    ///
    /// A store that fails to load is logged and treated as empty; the tracker
    /// still opens.
    pub fn open(recorder: SessionRecorder<L, C>, store: S, config: GridConfig) -> Self {
        let sessions = match store.load() {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!("[VisitGrid] Could not load stored sessions, starting empty: {}", e);
                Vec::new()
            }
        };
        info!("[VisitGrid] Tracker opened with {} stored sessions", sessions.len());

        let sessions = Arc::new(sessions);
        let counts = compute_grid_counts_with_config(&sessions, recorder.buffer(), &config);
        let snapshot = Arc::new(GridSnapshot {
            version: 0,
            sessions: Arc::clone(&sessions),
            active: Arc::from(recorder.buffer()),
            counts: Arc::new(counts),
            config: config.clone(),
        });

        Self {
            recorder,
            store,
            config,
            sessions,
            snapshot,
            subscribers: Vec::new(),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<GridSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Receive every future snapshot. The current one is sent immediately.
    pub fn subscribe(&mut self) -> Receiver<Arc<GridSnapshot>> {
        let (tx, rx) = mpsc::channel();
        // Receiver is alive, the send cannot fail
        let _ = tx.send(self.snapshot());
        self.subscribers.push(tx);
        rx
    }

    pub fn start(&mut self) -> Result<()> {
        self.recorder.start()?;
        self.publish();
        Ok(())
    }

    /// Feed one location update. Ignored while idle.
    pub fn on_sample(&mut self, point: GpsPoint) -> bool {
        let appended = self.recorder.on_sample(point);
        if appended {
            self.publish();
        }
        appended
    }

    /// Seal the active session and hand it to the store.
    ///
    /// The sealed session joins the in-memory history before the store is
    /// written, so it shows up in the grid even if persisting fails. In that
    /// case the `PersistenceFailure` is returned and the session may be missing
    /// after the next restart.
    pub fn stop(&mut self) -> Result<Option<Session>> {
        let session = match self.recorder.stop() {
            Some(session) => session,
            None => return Ok(None),
        };

        Arc::make_mut(&mut self.sessions).push(session.clone());
        let persisted = self.store.append(&session);
        self.publish();

        match persisted {
            Ok(()) => Ok(Some(session)),
            Err(e) => {
                warn!("[VisitGrid] Session {} not persisted: {}", session.id, e);
                Err(e)
            }
        }
    }

    fn publish(&mut self) {
        let counts =
            compute_grid_counts_with_config(&self.sessions, self.recorder.buffer(), &self.config);

        self.snapshot = Arc::new(GridSnapshot {
            version: self.snapshot.version + 1,
            sessions: Arc::clone(&self.sessions),
            active: Arc::from(self.recorder.buffer()),
            counts: Arc::new(counts),
            config: self.config.clone(),
        });

        let snapshot = &self.snapshot;
        self.subscribers
            .retain(|tx| tx.send(Arc::clone(snapshot)).is_ok());
    }
}

// ============================================================================
// Threaded event loop
// ============================================================================

enum Command {
    Start(Sender<Result<()>>),
    Sample(GpsPoint),
    Stop(Sender<Result<Option<Session>>>),
    Snapshot(Sender<Arc<GridSnapshot>>),
    Subscribe(Sender<Receiver<Arc<GridSnapshot>>>),
    Shutdown,
}

/// Handle to a tracker running on its own thread.
///
/// Dropping the handle shuts the thread down.
pub struct TrackerHandle {
    tx: Sender<Command>,
    thread: Option<JoinHandle<()>>,
}

/// Move a tracker onto a dedicated thread.
pub fn spawn_tracker<L, S, C>(mut tracker: VisitTracker<L, S, C>) -> Result<TrackerHandle>
where
    L: LocationProvider + Send + 'static,
    S: SessionStore + Send + 'static,
    C: Clock + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Command>();

    let thread = thread::Builder::new()
        .name("visit-tracker".to_string())
        .spawn(move || {
            for command in rx {
                match command {
                    Command::Start(reply) => {
                        let _ = reply.send(tracker.start());
                    }
                    Command::Sample(point) => {
                        tracker.on_sample(point);
                    }
                    Command::Stop(reply) => {
                        let _ = reply.send(tracker.stop());
                    }
                    Command::Snapshot(reply) => {
                        let _ = reply.send(tracker.snapshot());
                    }
                    Command::Subscribe(reply) => {
                        let _ = reply.send(tracker.subscribe());
                    }
                    Command::Shutdown => break,
                }
            }
            info!("[VisitGrid] Tracker thread exiting");
        })
        .map_err(|e| {
            warn!("[VisitGrid] Failed to spawn tracker thread: {}", e);
            TrackingError::TrackerClosed
        })?;

    Ok(TrackerHandle {
        tx,
        thread: Some(thread),
    })
}

impl TrackerHandle {
    fn request<T>(&self, make: impl FnOnce(Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(make(reply_tx))
            .map_err(|_| TrackingError::TrackerClosed)?;
        reply_rx.recv().map_err(|_| TrackingError::TrackerClosed)
    }

    pub fn start(&self) -> Result<()> {
        self.request(Command::Start)?
    }

    /// Queue a location update. Does not wait for it to be applied.
    pub fn sample(&self, point: GpsPoint) -> Result<()> {
        self.tx
            .send(Command::Sample(point))
            .map_err(|_| TrackingError::TrackerClosed)
    }

    pub fn stop(&self) -> Result<Option<Session>> {
        self.request(Command::Stop)?
    }

    /// Snapshot after every previously queued event has been applied.
    pub fn snapshot(&self) -> Result<Arc<GridSnapshot>> {
        self.request(Command::Snapshot)
    }

    pub fn subscribe(&self) -> Result<Receiver<Arc<GridSnapshot>>> {
        self.request(Command::Subscribe)
    }

    /// Stop the thread and wait for it to exit.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("[VisitGrid] Tracker thread panicked");
            }
        }
    }
}

impl Drop for TrackerHandle {
    fn drop(&mut self) {
        self.close();
    }
}
