use std::path::Path;

use super::capture_models::{AcquiredCapture, ArtifactKind, Gravity};
use super::capture_record::{self, CaptureRecord};
use super::error::SessionError;
use crate::storage::atomic_write::write_atomic;

/// In-memory result of one fulfilled capture request.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureArtifact {
    pub id: u32,
    pub image: Vec<u8>,
    pub depth: Option<Vec<u8>>,
    pub gravity: Option<Gravity>,
}

/// Outcome of writing an artifact whose image made it to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistReport {
    pub record: CaptureRecord,
    /// Optional sidecars that were present but could not be written.
    pub sidecar_failures: Vec<(ArtifactKind, SessionError)>,
}

impl CaptureArtifact {
    pub fn new(id: u32, acquired: AcquiredCapture) -> Self {
        Self {
            id,
            image: acquired.image,
            depth: acquired.depth,
            gravity: acquired.gravity,
        }
    }

    /// Write image, gravity and depth files into `directory`.
    ///
    /// Each file is written atomically and independently. A failed image
    /// write fails the whole operation; failed sidecars are reported and
    /// logged but the image is kept.
    pub fn write_all_files(&self, directory: &Path) -> Result<PersistReport, SessionError> {
        write_atomic(&capture_record::image_path(directory, self.id), &self.image)?;

        let mut sidecar_failures = Vec::new();

        if let Some(gravity) = self.gravity {
            let path = capture_record::gravity_path(directory, self.id);
            if let Err(e) = write_atomic(&path, gravity.to_string().as_bytes()) {
                log::warn!("Failed to write gravity for capture {}: {}", self.id, e);
                sidecar_failures.push((ArtifactKind::Gravity, e));
            }
        }

        if let Some(ref depth) = self.depth {
            let path = capture_record::depth_path(directory, self.id);
            if let Err(e) = write_atomic(&path, depth) {
                log::warn!("Failed to write depth for capture {}: {}", self.id, e);
                sidecar_failures.push((ArtifactKind::Depth, e));
            }
        }

        Ok(PersistReport {
            record: CaptureRecord::new(self.id, directory),
            sidecar_failures,
        })
    }
}
