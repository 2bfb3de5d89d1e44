use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while running a photo capture session.
///
/// Every variant is scoped to the operation that produced it; none of them
/// represent a global failure state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The captures root or a session directory is missing or unreadable.
    #[error("directory unavailable: {}: {reason}", .path.display())]
    DirectoryUnavailable { path: PathBuf, reason: String },

    /// A file name does not follow the `IMG_NNNN` naming scheme.
    #[error("parse failed: {0}")]
    ParseFailed(String),

    /// The mandatory image write of a capture failed.
    #[error("persistence failed: {}: {reason}", .path.display())]
    PersistenceFailed { path: PathBuf, reason: String },

    /// The capture provider could not deliver a photo.
    #[error("capture acquisition failed: {0}")]
    AcquisitionFailed(String),

    /// A new session directory could not be created.
    #[error("session creation failed: {0}")]
    SessionCreationFailed(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),
}

impl SessionError {
    pub(crate) fn directory_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::DirectoryUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn persistence_failed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::PersistenceFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
