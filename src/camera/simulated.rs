//! In-process camera backend.
//!
//! Used by `eyebreak start --simulate-camera`, by calibration previews on
//! machines without a camera, and by tests. It counts session starts and
//! stops so callers can verify the camera is always released.

use crate::camera::capture::CaptureBackend;
use crate::camera::types::{CalibrationThresholds, CameraError, CaptureHandle, GazeSample};
use crossbeam_channel::{Sender, TrySendError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// A scriptable capture backend.
pub struct SimulatedCapture {
    available: bool,
    permission_granted: AtomicBool,
    /// (face_detected, looking_at_screen) pairs emitted in a loop
    pattern: Vec<(bool, bool)>,
    sample_interval: Duration,
    next_handle: AtomicU64,
    starts: AtomicU64,
    stops: AtomicU64,
    sessions: Mutex<HashMap<u64, Arc<AtomicBool>>>,
    next_failure: Mutex<Option<String>>,
}

impl SimulatedCapture {
    /// A camera that opens successfully and emits nothing on its own.
    pub fn new() -> Self {
        Self {
            available: true,
            permission_granted: AtomicBool::new(true),
            pattern: Vec::new(),
            sample_interval: Duration::from_millis(500),
            next_handle: AtomicU64::new(1),
            starts: AtomicU64::new(0),
            stops: AtomicU64::new(0),
            sessions: Mutex::new(HashMap::new()),
            next_failure: Mutex::new(None),
        }
    }

    /// A host with no camera hardware.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// A camera whose permission prompt is always declined.
    pub fn permission_denied() -> Self {
        let sim = Self::new();
        sim.permission_granted.store(false, Ordering::SeqCst);
        sim
    }

    /// Emit `pattern` repeatedly, one sample every `interval`.
    pub fn with_pattern(mut self, pattern: Vec<(bool, bool)>, interval: Duration) -> Self {
        self.pattern = pattern;
        self.sample_interval = interval;
        self
    }

    /// A user who looks at the screen for a few seconds, then looks away.
    pub fn demo() -> Self {
        Self::new().with_pattern(
            vec![
                (true, true),
                (true, true),
                (true, true),
                (true, false),
                (true, false),
                (false, false),
            ],
            Duration::from_secs(1),
        )
    }

    pub fn set_permission_granted(&self, granted: bool) {
        self.permission_granted.store(granted, Ordering::SeqCst);
    }

    /// Make the next `start_capture` fail with `CaptureFailed`.
    pub fn fail_next_start(&self, reason: impl Into<String>) {
        if let Ok(mut failure) = self.next_failure.lock() {
            *failure = Some(reason.into());
        }
    }

    pub fn start_count(&self) -> u64 {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> u64 {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl Default for SimulatedCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for SimulatedCapture {
    fn is_available(&self) -> bool {
        self.available
    }

    fn start_capture(
        &self,
        _thresholds: CalibrationThresholds,
        samples: Sender<GazeSample>,
    ) -> Result<CaptureHandle, CameraError> {
        if !self.available {
            return Err(CameraError::CameraUnavailable);
        }
        if !self.permission_granted.load(Ordering::SeqCst) {
            return Err(CameraError::PermissionDenied);
        }
        if let Some(reason) = self.next_failure.lock().ok().and_then(|mut f| f.take()) {
            return Err(CameraError::CaptureFailed(reason));
        }

        let handle = CaptureHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        let running = Arc::new(AtomicBool::new(true));
        self.sessions
            .lock()
            .map_err(|_| CameraError::CaptureFailed("session table poisoned".to_string()))?
            .insert(handle.0, running.clone());
        self.starts.fetch_add(1, Ordering::SeqCst);

        if !self.pattern.is_empty() {
            let pattern = self.pattern.clone();
            let interval = self.sample_interval;
            thread::spawn(move || {
                for (face, looking) in pattern.iter().cycle() {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    // Drop samples when the owner lags; stop once it is gone.
                    if let Err(TrySendError::Disconnected(_)) =
                        samples.try_send(GazeSample::new(handle, *face, *looking))
                    {
                        break;
                    }
                    thread::sleep(interval);
                }
            });
        }

        Ok(handle)
    }

    fn stop_capture(&self, handle: CaptureHandle) {
        let removed = self
            .sessions
            .lock()
            .ok()
            .and_then(|mut sessions| sessions.remove(&handle.0));
        if let Some(running) = removed {
            running.store(false, Ordering::SeqCst);
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_permission_denied() {
        let sim = SimulatedCapture::permission_denied();
        let (tx, _rx) = unbounded();
        let result = sim.start_capture(CalibrationThresholds::default(), tx);
        assert_eq!(result, Err(CameraError::PermissionDenied));
        assert_eq!(sim.open_sessions(), 0);

        sim.set_permission_granted(true);
        let (tx, _rx) = unbounded();
        assert!(sim.start_capture(CalibrationThresholds::default(), tx).is_ok());
        assert_eq!(sim.open_sessions(), 1);
    }

    #[test]
    fn test_injected_failure_is_one_shot() {
        let sim = SimulatedCapture::new();
        sim.fail_next_start("device busy");

        let (tx, _rx) = unbounded();
        let result = sim.start_capture(CalibrationThresholds::default(), tx.clone());
        assert_eq!(result, Err(CameraError::CaptureFailed("device busy".to_string())));
        assert!(sim.start_capture(CalibrationThresholds::default(), tx).is_ok());
    }

    #[test]
    fn test_pattern_emits_samples_until_stopped() {
        let sim = SimulatedCapture::new()
            .with_pattern(vec![(true, false)], Duration::from_millis(5));
        let (tx, rx) = unbounded();

        let handle = sim.start_capture(CalibrationThresholds::default(), tx).unwrap();
        let sample = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(sample.session, handle);
        assert!(sample.face_detected);
        assert!(!sample.is_looking_at_screen);

        sim.stop_capture(handle);
        sim.stop_capture(handle);
        assert_eq!(sim.stop_count(), 1);
        assert_eq!(sim.open_sessions(), 0);
    }
}
