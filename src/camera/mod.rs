//! Camera capture for gaze verification.
//!
//! The vision layer is opaque: a backend turns frames into
//! [`GazeSample`]s and the agent never sees image data.

pub mod capture;
pub mod controller;
pub mod noop;
pub mod simulated;
pub mod types;

// Re-export commonly used types
pub use capture::{CaptureBackend, CaptureGuard, SharedCaptureBackend};
pub use controller::{
    CameraController, SessionPurpose, StartOutcome, StartResolution,
    DEFAULT_FACE_DETECTION_TIMEOUT,
};
pub use noop::NoopCapture;
pub use simulated::SimulatedCapture;
pub use types::{
    CalibrationThresholds, CameraActivationState, CameraError, CaptureHandle, GazeSample,
};
