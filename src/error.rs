//! Unified error handling for visit tracking.
//!
//! Every failure the tracking core can surface is a [`TrackingError`]. None of
//! them are fatal: the recorder is left Idle (or unchanged) and the caller
//! decides whether to retry.

use std::fmt;

/// Unified error type for visit-grid operations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
pub enum TrackingError {
    /// The location permission collaborator refused access
    PermissionDenied,
    /// The initial fix or the update subscription could not be obtained
    LocationUnavailable { message: String },
    /// `start` was called while a session is already being recorded
    AlreadyRecording,
    /// Writing or reading stored sessions failed
    PersistenceFailure { message: String },
    /// The tracker thread has shut down and no longer accepts events
    TrackerClosed,
}

impl TrackingError {
    pub fn persistence(message: impl Into<String>) -> Self {
        TrackingError::PersistenceFailure {
            message: message.into(),
        }
    }

    pub fn location_unavailable(message: impl Into<String>) -> Self {
        TrackingError::LocationUnavailable {
            message: message.into(),
        }
    }
}

impl fmt::Display for TrackingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingError::PermissionDenied => {
                write!(f, "Location permission denied")
            }
            TrackingError::LocationUnavailable { message } => {
                write!(f, "Location unavailable: {}", message)
            }
            TrackingError::AlreadyRecording => {
                write!(f, "A session is already being recorded")
            }
            TrackingError::PersistenceFailure { message } => {
                write!(f, "Persistence failure: {}", message)
            }
            TrackingError::TrackerClosed => {
                write!(f, "Tracker has shut down")
            }
        }
    }
}

impl std::error::Error for TrackingError {}

impl From<serde_json::Error> for TrackingError {
    fn from(err: serde_json::Error) -> Self {
        TrackingError::persistence(format!("malformed session data: {}", err))
    }
}

impl From<std::io::Error> for TrackingError {
    fn from(err: std::io::Error) -> Self {
        TrackingError::persistence(err.to_string())
    }
}

#[cfg(feature = "persistence")]
impl From<rusqlite::Error> for TrackingError {
    fn from(err: rusqlite::Error) -> Self {
        TrackingError::persistence(format!("sqlite: {}", err))
    }
}

/// Result type alias for visit-grid operations.
pub type Result<T> = std::result::Result<T, TrackingError>;
