use crate::models::capture_models::{AcquiredCapture, CaptureCapabilities, CaptureRequest};
use crate::models::error::SessionError;

/// Continuation invoked exactly once when a capture request finishes.
///
/// May run on any thread, including synchronously inside `acquire`.
pub type CaptureCallback =
    Box<dyn FnOnce(Result<AcquiredCapture, SessionError>) + Send + 'static>;

/// Interface for platform-specific photo capture hardware.
///
/// Given a request, eventually yields image bytes plus optional depth map
/// and gravity vector, or fails with `SessionError::AcquisitionFailed`.
/// A provider that never calls back leaves the request in flight forever.
pub trait CaptureProvider: Send + Sync {
    /// What the camera and motion sensors can currently deliver.
    fn capabilities(&self) -> CaptureCapabilities;

    /// Start acquiring one photo. Must not block the caller.
    fn acquire(&self, request: CaptureRequest, on_complete: CaptureCallback);
}
