//! # photo-capture-core
//!
//! Platform-agnostic photo capture session core.
//!
//! Provides capture admission control, sequence numbering, session folder
//! management, on-disk reconciliation and interval-driven automatic capture.
//! Platform camera backends implement the `CaptureProvider` trait and plug
//! into the generic `CaptureSessionManager`.
//!
//! ## Architecture
//!
//! ```text
//! photo-capture-core (this crate)
//! ├── traits/       ← CaptureProvider, SessionDelegate
//! ├── models/       ← SessionError, SessionConfig, CaptureRecord, CaptureArtifact, SessionMode, etc.
//! ├── processing/   ← IntervalTimer, WorkQueue, Completion
//! ├── session/      ← CaptureSessionManager (generic orchestrator)
//! └── storage/      ← SessionDirectory, atomic writes, session listing
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::capture_artifact::{CaptureArtifact, PersistReport};
pub use models::capture_models::{
    AcquiredCapture, ArtifactKind, CaptureCapabilities, CaptureRequest, CaptureSettings, FileExistence, Gravity,
};
pub use models::capture_record::{CaptureRecord, DeletionFailure};
pub use models::config::SessionConfig;
pub use models::error::SessionError;
pub use models::state::{SessionEvent, SessionMode, SessionSnapshot};
pub use processing::completion::Completion;
pub use processing::interval_timer::IntervalTimer;
pub use session::manager::CaptureSessionManager;
pub use storage::session_directory::SessionDirectory;
pub use traits::capture_provider::{CaptureCallback, CaptureProvider};
pub use traits::session_delegate::SessionDelegate;
