//! Capture backend seam and the scoped camera session guard.

use crate::camera::types::{CalibrationThresholds, CameraError, CaptureHandle, GazeSample};
use crossbeam_channel::Sender;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// The camera/vision capability the agent consumes.
///
/// Implementations deliver samples on their own thread; they must never block
/// the caller of `stop_capture`.
pub trait CaptureBackend: Send + Sync {
    /// Whether camera hardware is present at all.
    fn is_available(&self) -> bool;

    /// Open a capture session and stream samples into `samples`.
    ///
    /// Every sample must carry the returned handle. May block on a
    /// permission prompt.
    fn start_capture(
        &self,
        thresholds: CalibrationThresholds,
        samples: Sender<GazeSample>,
    ) -> Result<CaptureHandle, CameraError>;

    /// Close a session previously returned by `start_capture`.
    fn stop_capture(&self, handle: CaptureHandle);
}

/// Shared handle to a capture backend.
pub type SharedCaptureBackend = Arc<dyn CaptureBackend>;

/// An open capture session. Dropping the guard closes the session.
pub struct CaptureGuard {
    backend: SharedCaptureBackend,
    handle: CaptureHandle,
}

impl CaptureGuard {
    /// Acquire a session from `backend`.
    pub fn acquire(
        backend: SharedCaptureBackend,
        thresholds: CalibrationThresholds,
        samples: Sender<GazeSample>,
    ) -> Result<Self, CameraError> {
        if !backend.is_available() {
            return Err(CameraError::CameraUnavailable);
        }
        let handle = backend.start_capture(thresholds, samples)?;
        info!(handle = handle.0, "camera session opened");
        Ok(Self { backend, handle })
    }

    pub fn handle(&self) -> CaptureHandle {
        self.handle
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.backend.stop_capture(self.handle);
        info!(handle = self.handle.0, "camera session closed");
    }
}

impl fmt::Debug for CaptureGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureGuard")
            .field("handle", &self.handle)
            .finish()
    }
}
