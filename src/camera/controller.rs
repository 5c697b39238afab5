//! Camera lifecycle controller.
//!
//! Owns at most one capture session, opens it off the control thread, and
//! runs the face-detection watchdog. All methods are meant to be called from
//! the single control thread; the capture backend only ever talks to the
//! controller through channels.

use crate::camera::capture::{CaptureGuard, SharedCaptureBackend};
use crate::camera::types::{
    CalibrationThresholds, CameraActivationState, CameraError, CaptureHandle, GazeSample,
};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default time without a detected face before the watchdog fires.
pub const DEFAULT_FACE_DETECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a capture session is being opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPurpose {
    /// Gaze verification for a look-away reminder
    Enforcement,
    /// Calibration preview, independent of reminders
    Test,
}

/// Result of an asynchronous camera start, delivered on the control thread.
#[derive(Debug)]
pub struct StartOutcome {
    request_id: u64,
    purpose: SessionPurpose,
    result: Result<CaptureGuard, CameraError>,
}

/// What applying a start outcome changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartResolution {
    Opened {
        purpose: SessionPurpose,
        handle: CaptureHandle,
    },
    Failed {
        purpose: SessionPurpose,
        error: CameraError,
    },
    /// The request was cancelled before it finished; the session was released.
    Discarded,
}

pub struct CameraController {
    backend: SharedCaptureBackend,
    thresholds: CalibrationThresholds,
    face_detection_timeout: Duration,
    state: CameraActivationState,
    purpose: Option<SessionPurpose>,
    session: Option<CaptureGuard>,
    pending_request: Option<u64>,
    next_request: u64,
    last_face_detection: Option<Instant>,
    timeout_reported: bool,
    samples_tx: Sender<GazeSample>,
    samples_rx: Receiver<GazeSample>,
    outcomes_tx: Sender<StartOutcome>,
    outcomes_rx: Receiver<StartOutcome>,
}

impl CameraController {
    pub fn new(
        backend: SharedCaptureBackend,
        thresholds: CalibrationThresholds,
        face_detection_timeout: Duration,
    ) -> Self {
        // Bounded so a stalled control thread cannot grow memory without limit.
        let (samples_tx, samples_rx) = bounded(1_024);
        let (outcomes_tx, outcomes_rx) = unbounded();
        Self {
            backend,
            thresholds,
            face_detection_timeout,
            state: CameraActivationState::Inactive,
            purpose: None,
            session: None,
            pending_request: None,
            next_request: 1,
            last_face_detection: None,
            timeout_reported: false,
            samples_tx,
            samples_rx,
            outcomes_tx,
            outcomes_rx,
        }
    }

    pub fn state(&self) -> CameraActivationState {
        self.state
    }

    pub fn purpose(&self) -> Option<SessionPurpose> {
        self.purpose
    }

    pub fn is_camera_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_starting(&self) -> bool {
        self.pending_request.is_some()
    }

    pub fn handle(&self) -> Option<CaptureHandle> {
        self.session.as_ref().map(CaptureGuard::handle)
    }

    pub fn face_detection_timeout(&self) -> Duration {
        self.face_detection_timeout
    }

    /// Gaze samples delivered by the capture backend.
    pub fn samples(&self) -> &Receiver<GazeSample> {
        &self.samples_rx
    }

    /// Outcomes of in-flight `start_camera` requests.
    pub fn start_outcomes(&self) -> &Receiver<StartOutcome> {
        &self.outcomes_rx
    }

    /// Begin opening the camera on a worker thread.
    ///
    /// Returns `Ok(false)` when a session is already open or being opened.
    /// Missing hardware is reported immediately.
    pub fn start_camera(&mut self, purpose: SessionPurpose) -> Result<bool, CameraError> {
        if self.session.is_some() || self.pending_request.is_some() {
            debug!(?purpose, "camera already active, start ignored");
            return Ok(false);
        }
        if !self.backend.is_available() {
            warn!("camera start requested but no camera is available");
            return Err(CameraError::CameraUnavailable);
        }

        let request_id = self.next_request;
        self.next_request += 1;
        self.pending_request = Some(request_id);
        self.purpose = Some(purpose);
        self.state = match purpose {
            SessionPurpose::Enforcement => CameraActivationState::PreActivating,
            SessionPurpose::Test => CameraActivationState::TestMode,
        };

        let backend = self.backend.clone();
        let thresholds = self.thresholds;
        let samples = self.samples_tx.clone();
        let outcomes = self.outcomes_tx.clone();
        thread::spawn(move || {
            let result = CaptureGuard::acquire(backend, thresholds, samples);
            // If the controller is gone the outcome drops here, releasing the session.
            let _ = outcomes.send(StartOutcome {
                request_id,
                purpose,
                result,
            });
        });

        info!(?purpose, request_id, "camera start requested");
        Ok(true)
    }

    /// Apply a start outcome received from `start_outcomes()`.
    pub fn complete_start(&mut self, outcome: StartOutcome, now: Instant) -> StartResolution {
        if self.pending_request != Some(outcome.request_id) {
            debug!(request_id = outcome.request_id, "discarding cancelled camera start");
            return StartResolution::Discarded;
        }
        self.pending_request = None;

        match outcome.result {
            Ok(guard) => {
                let handle = guard.handle();
                self.session = Some(guard);
                self.last_face_detection = Some(now);
                self.timeout_reported = false;
                if outcome.purpose == SessionPurpose::Enforcement {
                    self.state = CameraActivationState::Active;
                }
                StartResolution::Opened {
                    purpose: outcome.purpose,
                    handle,
                }
            }
            Err(error) => {
                warn!(%error, "camera start failed");
                self.state = CameraActivationState::Inactive;
                self.purpose = None;
                StartResolution::Failed {
                    purpose: outcome.purpose,
                    error,
                }
            }
        }
    }

    /// Release the camera and cancel any in-flight start. Safe when inactive.
    pub fn stop_camera(&mut self) {
        self.pending_request = None;
        self.session = None;
        self.purpose = None;
        self.state = CameraActivationState::Inactive;
        self.last_face_detection = None;
        self.timeout_reported = false;
    }

    pub fn reset_face_detection_timer(&mut self, now: Instant) {
        self.last_face_detection = Some(now);
        self.timeout_reported = false;
    }

    /// Accept a sample from the backend.
    ///
    /// Only samples from the open session are forwarded, regardless of its
    /// purpose. Anything still queued from an earlier session is dropped.
    pub fn accept_sample(&mut self, sample: GazeSample, now: Instant) -> Option<GazeSample> {
        let current = self.handle()?;
        if sample.session != current {
            debug!(
                sample_session = sample.session.0,
                current_session = current.0,
                "dropping sample from a closed session"
            );
            return None;
        }
        if sample.face_detected {
            self.reset_face_detection_timer(now);
        }
        Some(sample)
    }

    /// Once-per-second liveness check. Returns `true` the first time the
    /// face has been missing for longer than the timeout.
    ///
    /// A start that has not resolved counts as no face: the clock is armed on
    /// the first pass after the request, so a permission prompt that never
    /// answers still times out.
    pub fn check_watchdog(&mut self, now: Instant) -> bool {
        if self.timeout_reported || (self.session.is_none() && self.pending_request.is_none()) {
            return false;
        }
        let last = *self.last_face_detection.get_or_insert(now);
        if now.saturating_duration_since(last) > self.face_detection_timeout {
            self.timeout_reported = true;
            warn!(
                timeout_secs = self.face_detection_timeout.as_secs(),
                "no face detected within timeout"
            );
            return true;
        }
        false
    }
}

impl Drop for CameraController {
    fn drop(&mut self) {
        self.stop_camera();
    }
}
