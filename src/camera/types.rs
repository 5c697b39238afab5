//! Privacy-preserving camera signal types.
//!
//! The capture subsystem never hands frames to the agent. Each sample carries
//! only two booleans derived by the vision layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One classification result from the vision layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazeSample {
    /// Session whose frame produced this sample
    pub session: CaptureHandle,
    /// Timestamp when the frame was classified
    pub timestamp: DateTime<Utc>,
    /// Whether a face was found in the frame
    pub face_detected: bool,
    /// Whether the detected face is looking at the screen
    pub is_looking_at_screen: bool,
}

impl GazeSample {
    pub fn new(session: CaptureHandle, face_detected: bool, is_looking_at_screen: bool) -> Self {
        Self {
            session,
            timestamp: Utc::now(),
            face_detected,
            // Gaze is meaningless without a face.
            is_looking_at_screen: face_detected && is_looking_at_screen,
        }
    }

    pub fn looking_away(session: CaptureHandle) -> Self {
        Self::new(session, true, false)
    }

    pub fn looking_at_screen(session: CaptureHandle) -> Self {
        Self::new(session, true, true)
    }

    pub fn no_face(session: CaptureHandle) -> Self {
        Self::new(session, false, false)
    }
}

/// Lifecycle of the camera as seen by its controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraActivationState {
    Inactive,
    /// Start requested for a reminder cycle, or session open ahead of the reminder
    PreActivating,
    /// Session open while a reminder is being enforced
    Active,
    /// Session requested or open for calibration preview
    TestMode,
}

/// Opaque identifier for an open capture session.
///
/// Presenters use it to attach a camera preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureHandle(pub u64);

/// Per-user bounds consumed by the gaze classifier. Never modified here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationThresholds {
    /// Maximum head yaw (degrees) still counted as facing the screen
    pub max_yaw_degrees: f64,
    /// Maximum head pitch (degrees) still counted as facing the screen
    pub max_pitch_degrees: f64,
    /// Horizontal pupil ratio bounds for "looking at screen"
    pub pupil_ratio_min: f64,
    pub pupil_ratio_max: f64,
}

impl Default for CalibrationThresholds {
    fn default() -> Self {
        Self {
            max_yaw_degrees: 20.0,
            max_pitch_degrees: 15.0,
            pupil_ratio_min: 0.35,
            pupil_ratio_max: 0.65,
        }
    }
}

/// Errors that can occur while acquiring the camera.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("No camera is available on this system")]
    CameraUnavailable,
    #[error("Camera access was denied")]
    PermissionDenied,
    #[error("Camera capture failed: {0}")]
    CaptureFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaze_requires_face() {
        let sample = GazeSample::new(CaptureHandle(1), false, true);
        assert!(!sample.face_detected);
        assert!(!sample.is_looking_at_screen);
    }

    #[test]
    fn test_default_thresholds_are_ordered() {
        let thresholds = CalibrationThresholds::default();
        assert!(thresholds.pupil_ratio_min < thresholds.pupil_ratio_max);
    }
}
