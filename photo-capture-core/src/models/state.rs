use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::capture_artifact::CaptureArtifact;
use super::capture_record::CaptureRecord;
use super::error::SessionError;

/// Capture trigger mode.
///
/// State transitions (only via `CaptureSessionManager::set_mode`):
/// ```text
/// manual ⇄ automatic(interval)
/// ```
/// Initial state is `Manual`; there is no terminal state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode")]
pub enum SessionMode {
    #[default]
    Manual,
    Automatic { interval_secs: f64 },
}

impl SessionMode {
    pub fn is_automatic(&self) -> bool {
        matches!(self, Self::Automatic { .. })
    }

    pub fn interval_secs(&self) -> Option<f64> {
        match self {
            Self::Automatic { interval_secs } => Some(*interval_secs),
            Self::Manual => None,
        }
    }

    /// Manual → automatic(`default_interval_secs`) → manual.
    pub fn next(&self, default_interval_secs: f64) -> Self {
        match self {
            Self::Manual => Self::Automatic {
                interval_secs: default_interval_secs,
            },
            Self::Automatic { .. } => Self::Manual,
        }
    }
}

/// Point-in-time view of everything the UI renders.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub session_dir: Option<PathBuf>,
    pub records: Vec<CaptureRecord>,
    pub last_capture: Option<Arc<CaptureArtifact>>,
    pub camera_available: bool,
    pub high_quality_mode: bool,
    pub depth_enabled: bool,
    pub motion_enabled: bool,
    pub mode: SessionMode,
    pub seconds_until_capture: f64,
    pub auto_capture_active: bool,
    pub in_flight: usize,
}

/// A change to the published session state.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A new session directory became active, or none is set.
    SessionChanged(Option<PathBuf>),
    /// The reconciled record list of the active session was republished.
    RecordsChanged(Vec<CaptureRecord>),
    LastCaptureChanged(Option<Arc<CaptureArtifact>>),
    ModeChanged(SessionMode),
    AutoCaptureActiveChanged(bool),
    /// Countdown until the next automatic capture, at the timer cadence.
    TimeUntilCapture(f64),
    /// A capture was admitted and handed to the provider.
    CaptureStarted(u32),
    CaptureFailed { id: u32, error: SessionError },
}
