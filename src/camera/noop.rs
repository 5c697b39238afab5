//! Camera backend for hosts without camera support.
//!
//! This exists so the agent runs everywhere; enforcement simply stays off
//! because every start attempt reports `CameraUnavailable`.

use crate::camera::capture::CaptureBackend;
use crate::camera::types::{CalibrationThresholds, CameraError, CaptureHandle, GazeSample};
use crossbeam_channel::Sender;

/// A backend that never finds a camera.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCapture;

impl NoopCapture {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureBackend for NoopCapture {
    fn is_available(&self) -> bool {
        false
    }

    fn start_capture(
        &self,
        _thresholds: CalibrationThresholds,
        _samples: Sender<GazeSample>,
    ) -> Result<CaptureHandle, CameraError> {
        Err(CameraError::CameraUnavailable)
    }

    fn stop_capture(&self, _handle: CaptureHandle) {}
}
