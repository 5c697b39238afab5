//! Enforcement orchestrator.
//!
//! Connects the look-away timer to the camera controller and decides whether
//! the look-away reminder may be dismissed.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> PreActivated -> Enforcing -> Idle
//!              |              |
//!              +--> TimedOut -+--> Idle
//! ```
//!
//! Every method returns the events the owner should forward; the orchestrator
//! never talks to the presenter directly.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::camera::{
    CameraActivationState, CameraController, CameraError, CaptureHandle, GazeSample,
    SessionPurpose, StartOutcome, StartResolution,
};
use crate::enforcement::policy::{
    evaluate_compliance, CompliancePolicy, ComplianceResult, PRE_ACTIVATION_LEAD_SECONDS,
};
use crate::timer::TimerIdentifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementState {
    Idle,
    /// Camera warming up ahead of the look-away reminder
    PreActivated,
    /// Look-away reminder on screen, dismissal waits for compliance
    Enforcing,
    /// No face seen for too long; dismissal allowed without verification
    TimedOut,
}

/// Notifications for the owner of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnforcementEvent {
    CameraRequested,
    /// Enforcement session open
    CameraReady(CaptureHandle),
    /// Test-mode session open; the presenter may show a preview
    PreviewAvailable(CaptureHandle),
    ComplianceChanged(ComplianceResult),
    FaceDetectionTimeout,
    /// The look-away timer moved away from the reminder before it fired
    PreActivationCancelled,
    CameraFailed(CameraError),
    /// Enforcement was switched off after a permission failure; the settings
    /// owner should persist the toggle
    EnforcementReverted,
}

pub struct EnforcementOrchestrator {
    policy: CompliancePolicy,
    camera: CameraController,
    state: EnforcementState,
    latest_compliance: Option<ComplianceResult>,
    look_away_reminder_active: bool,
    test_mode: bool,
}

impl EnforcementOrchestrator {
    pub fn new(policy: CompliancePolicy, camera: CameraController) -> Self {
        Self {
            policy,
            camera,
            state: EnforcementState::Idle,
            latest_compliance: None,
            look_away_reminder_active: false,
            test_mode: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> EnforcementState {
        self.state
    }

    pub fn policy(&self) -> &CompliancePolicy {
        &self.policy
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn latest_compliance(&self) -> Option<ComplianceResult> {
        self.latest_compliance
    }

    pub fn is_test_mode(&self) -> bool {
        self.test_mode
    }

    /// Whether the look-away reminder may be dismissed right now.
    pub fn can_dismiss(&self) -> bool {
        match self.state {
            EnforcementState::Enforcing => {
                self.latest_compliance == Some(ComplianceResult::Compliant)
            }
            _ => true,
        }
    }

    // ── Enforcement toggle ───────────────────────────────────────────

    pub fn enable_enforce_mode(&mut self) {
        if !self.policy.is_enforcement_enabled() {
            info!("enforcement enabled");
        }
        self.policy.set_enforcement_enabled(true);
    }

    /// Switch enforcement off and release any enforcement camera session.
    pub fn disable_enforce_mode(&mut self) {
        if self.policy.is_enforcement_enabled() {
            info!("enforcement disabled");
        }
        self.policy.set_enforcement_enabled(false);
        self.return_to_idle();
    }

    // ── Scheduling signals ───────────────────────────────────────────

    /// Called after every engine tick with a timer's remaining seconds.
    pub fn on_timer_update(
        &mut self,
        id: &TimerIdentifier,
        remaining: i64,
    ) -> Vec<EnforcementEvent> {
        if !id.is_look_away() || self.look_away_reminder_active {
            return Vec::new();
        }

        match self.state {
            EnforcementState::Idle if self.policy.should_pre_activate_camera(id, remaining) => {
                self.begin_camera(EnforcementState::PreActivated)
            }
            EnforcementState::PreActivated | EnforcementState::TimedOut
                if remaining > PRE_ACTIVATION_LEAD_SECONDS =>
            {
                // Skipped, requeued, or the engine restarted.
                self.return_to_idle();
                vec![EnforcementEvent::PreActivationCancelled]
            }
            _ => Vec::new(),
        }
    }

    /// Scheduling was globally paused: a countdown that no longer advances
    /// must not keep the camera warm.
    pub fn suspend(&mut self) -> Vec<EnforcementEvent> {
        if self.look_away_reminder_active {
            return Vec::new();
        }
        match self.state {
            EnforcementState::PreActivated | EnforcementState::TimedOut => {
                self.return_to_idle();
                vec![EnforcementEvent::PreActivationCancelled]
            }
            _ => Vec::new(),
        }
    }

    pub fn on_reminder_fired(&mut self, id: &TimerIdentifier) -> Vec<EnforcementEvent> {
        if !id.is_look_away() {
            return Vec::new();
        }
        self.look_away_reminder_active = true;
        if !self.policy.should_enforce(id) {
            return Vec::new();
        }

        match self.state {
            EnforcementState::PreActivated => {
                self.transition(EnforcementState::Enforcing);
                Vec::new()
            }
            EnforcementState::Idle => self.begin_camera(EnforcementState::Enforcing),
            EnforcementState::Enforcing | EnforcementState::TimedOut => Vec::new(),
        }
    }

    pub fn on_reminder_dismissed(&mut self, id: &TimerIdentifier) {
        if !id.is_look_away() {
            return;
        }
        self.look_away_reminder_active = false;
        self.return_to_idle();
    }

    // ── Camera signals ───────────────────────────────────────────────

    pub fn handle_start_outcome(
        &mut self,
        outcome: StartOutcome,
        now: Instant,
    ) -> Vec<EnforcementEvent> {
        match self.camera.complete_start(outcome, now) {
            StartResolution::Opened {
                purpose: SessionPurpose::Enforcement,
                handle,
            } => vec![EnforcementEvent::CameraReady(handle)],
            StartResolution::Opened {
                purpose: SessionPurpose::Test,
                handle,
            } => vec![EnforcementEvent::PreviewAvailable(handle)],
            StartResolution::Failed {
                purpose: SessionPurpose::Enforcement,
                error,
            } => self.camera_failed(error),
            StartResolution::Failed {
                purpose: SessionPurpose::Test,
                error,
            } => {
                self.test_mode = false;
                vec![EnforcementEvent::CameraFailed(error)]
            }
            StartResolution::Discarded => Vec::new(),
        }
    }

    pub fn handle_sample(&mut self, sample: GazeSample, now: Instant) -> Vec<EnforcementEvent> {
        let Some(sample) = self.camera.accept_sample(sample, now) else {
            return Vec::new();
        };
        let result = evaluate_compliance(sample.is_looking_at_screen, sample.face_detected);
        if self.latest_compliance == Some(result) {
            return Vec::new();
        }
        debug!(compliance = result.as_str(), "compliance changed");
        self.latest_compliance = Some(result);
        vec![EnforcementEvent::ComplianceChanged(result)]
    }

    /// Once-per-second watchdog pass.
    pub fn check_watchdog(&mut self, now: Instant) -> Vec<EnforcementEvent> {
        if !self.camera.check_watchdog(now) {
            return Vec::new();
        }
        if self.test_mode {
            // Calibration keeps the camera; the preview shows the missing face.
            self.latest_compliance = Some(ComplianceResult::FaceNotDetected);
            return vec![
                EnforcementEvent::FaceDetectionTimeout,
                EnforcementEvent::ComplianceChanged(ComplianceResult::FaceNotDetected),
            ];
        }
        match self.state {
            EnforcementState::PreActivated | EnforcementState::Enforcing => {
                warn!("face detection timed out, allowing unverified dismissal");
                self.camera.stop_camera();
                self.latest_compliance = None;
                self.transition(EnforcementState::TimedOut);
                vec![EnforcementEvent::FaceDetectionTimeout]
            }
            _ => Vec::new(),
        }
    }

    // ── Test mode ────────────────────────────────────────────────────

    /// Open the camera for a calibration preview.
    ///
    /// Returns `Ok(false)` when a reminder cycle currently owns the camera.
    pub fn start_test_mode(&mut self) -> Result<bool, CameraError> {
        if self.test_mode {
            return Ok(true);
        }
        if self.state != EnforcementState::Idle || self.look_away_reminder_active {
            info!("test mode refused while a reminder cycle is in progress");
            return Ok(false);
        }
        self.camera.start_camera(SessionPurpose::Test)?;
        self.test_mode = true;
        self.latest_compliance = None;
        info!("test mode started");
        Ok(true)
    }

    pub fn stop_test_mode(&mut self) {
        if !self.test_mode {
            return;
        }
        self.test_mode = false;
        if self.camera.purpose() == Some(SessionPurpose::Test) {
            self.camera.stop_camera();
        }
        self.latest_compliance = None;
        info!("test mode stopped");
    }

    /// Release everything. Called on process teardown.
    pub fn shutdown(&mut self) {
        self.test_mode = false;
        self.look_away_reminder_active = false;
        self.camera.stop_camera();
        self.latest_compliance = None;
        self.transition(EnforcementState::Idle);
    }

    // ── Internals ────────────────────────────────────────────────────

    fn begin_camera(&mut self, target: EnforcementState) -> Vec<EnforcementEvent> {
        // A real reminder cycle always wins over a calibration preview.
        if self.test_mode {
            info!("ending test mode for reminder cycle");
            self.stop_test_mode();
        }
        match self.camera.start_camera(SessionPurpose::Enforcement) {
            Ok(_) => {
                self.latest_compliance = None;
                self.transition(target);
                vec![EnforcementEvent::CameraRequested]
            }
            Err(error) => self.camera_failed(error),
        }
    }

    fn camera_failed(&mut self, error: CameraError) -> Vec<EnforcementEvent> {
        warn!(%error, "enforcement camera unavailable, falling back to unverified reminders");
        self.camera.stop_camera();
        self.latest_compliance = None;
        self.transition(EnforcementState::Idle);

        let mut events = vec![EnforcementEvent::CameraFailed(error.clone())];
        match error {
            CameraError::PermissionDenied => {
                self.policy.set_enforcement_enabled(false);
                events.push(EnforcementEvent::EnforcementReverted);
            }
            CameraError::CameraUnavailable => {
                self.policy.set_enforcement_enabled(false);
            }
            // Transient; try again next cycle.
            CameraError::CaptureFailed(_) => {}
        }
        events
    }

    fn return_to_idle(&mut self) {
        if self.camera.purpose() == Some(SessionPurpose::Enforcement)
            || self.camera.state() == CameraActivationState::PreActivating
        {
            self.camera.stop_camera();
        }
        if !self.test_mode {
            self.latest_compliance = None;
        }
        self.transition(EnforcementState::Idle);
    }

    fn transition(&mut self, next: EnforcementState) {
        if self.state != next {
            info!(from = ?self.state, to = ?next, "enforcement state changed");
            self.state = next;
        }
    }
}

impl Drop for EnforcementOrchestrator {
    fn drop(&mut self) {
        self.camera.stop_camera();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CalibrationThresholds, SimulatedCapture, DEFAULT_FACE_DETECTION_TIMEOUT};
    use std::sync::Arc;
    use std::time::Duration;

    fn orchestrator(sim: &Arc<SimulatedCapture>, enabled: bool) -> EnforcementOrchestrator {
        let camera = CameraController::new(
            sim.clone(),
            CalibrationThresholds::default(),
            DEFAULT_FACE_DETECTION_TIMEOUT,
        );
        EnforcementOrchestrator::new(CompliancePolicy::new(enabled), camera)
    }

    fn settle_camera(orch: &mut EnforcementOrchestrator, now: Instant) -> Vec<EnforcementEvent> {
        let outcome = orch
            .camera()
            .start_outcomes()
            .recv_timeout(Duration::from_secs(2))
            .expect("camera start should complete");
        orch.handle_start_outcome(outcome, now)
    }

    #[test]
    fn test_pre_activation_at_three_seconds() {
        let sim = Arc::new(SimulatedCapture::new());
        let mut orch = orchestrator(&sim, true);

        assert!(orch.on_timer_update(&TimerIdentifier::LOOK_AWAY, 4).is_empty());
        assert_eq!(orch.state(), EnforcementState::Idle);

        let events = orch.on_timer_update(&TimerIdentifier::LOOK_AWAY, 3);
        assert_eq!(events, vec![EnforcementEvent::CameraRequested]);
        assert_eq!(orch.state(), EnforcementState::PreActivated);

        // Still counting down: no second request.
        assert!(orch.on_timer_update(&TimerIdentifier::LOOK_AWAY, 2).is_empty());
        let events = settle_camera(&mut orch, Instant::now());
        assert!(matches!(events[..], [EnforcementEvent::CameraReady(_)]));
        assert_eq!(sim.start_count(), 1);
    }

    #[test]
    fn test_no_pre_activation_for_other_timers_or_when_disabled() {
        let sim = Arc::new(SimulatedCapture::new());
        let mut orch = orchestrator(&sim, true);
        assert!(orch.on_timer_update(&TimerIdentifier::BLINK, 0).is_empty());

        let mut disabled = orchestrator(&sim, false);
        assert!(disabled.on_timer_update(&TimerIdentifier::LOOK_AWAY, 1).is_empty());
        assert!(disabled.on_reminder_fired(&TimerIdentifier::LOOK_AWAY).is_empty());
        assert!(disabled.can_dismiss());
        assert_eq!(sim.start_count(), 0);
    }

    #[test]
    fn test_dismissal_requires_compliance() {
        let sim = Arc::new(SimulatedCapture::new());
        let mut orch = orchestrator(&sim, true);
        let now = Instant::now();

        orch.on_timer_update(&TimerIdentifier::LOOK_AWAY, 3);
        settle_camera(&mut orch, now);
        orch.on_reminder_fired(&TimerIdentifier::LOOK_AWAY);
        assert_eq!(orch.state(), EnforcementState::Enforcing);
        assert!(!orch.can_dismiss());

        let handle = orch.camera().handle().unwrap();
        let events = orch.handle_sample(GazeSample::looking_at_screen(handle), now);
        assert_eq!(
            events,
            vec![EnforcementEvent::ComplianceChanged(ComplianceResult::NotCompliant)]
        );
        assert!(!orch.can_dismiss());

        // Repeated identical samples are not re-announced.
        assert!(orch
            .handle_sample(GazeSample::looking_at_screen(handle), now)
            .is_empty());

        orch.handle_sample(GazeSample::looking_away(handle), now);
        assert_eq!(orch.latest_compliance(), Some(ComplianceResult::Compliant));
        assert!(orch.can_dismiss());

        orch.on_reminder_dismissed(&TimerIdentifier::LOOK_AWAY);
        assert_eq!(orch.state(), EnforcementState::Idle);
        assert_eq!(sim.open_sessions(), 0);
    }

    #[test]
    fn test_timeout_allows_unverified_dismissal() {
        let sim = Arc::new(SimulatedCapture::new());
        let mut orch = orchestrator(&sim, true);
        let t0 = Instant::now();

        orch.on_timer_update(&TimerIdentifier::LOOK_AWAY, 3);
        settle_camera(&mut orch, t0);

        assert!(orch.check_watchdog(t0 + Duration::from_secs(5)).is_empty());
        let events = orch.check_watchdog(t0 + Duration::from_secs(6));
        assert_eq!(events, vec![EnforcementEvent::FaceDetectionTimeout]);
        assert_eq!(orch.state(), EnforcementState::TimedOut);
        assert_eq!(sim.open_sessions(), 0);

        orch.on_reminder_fired(&TimerIdentifier::LOOK_AWAY);
        assert_eq!(orch.state(), EnforcementState::TimedOut);
        assert!(orch.can_dismiss());
    }

    #[test]
    fn test_stalled_start_times_out() {
        let sim = Arc::new(SimulatedCapture::new());
        let mut orch = orchestrator(&sim, true);
        let t0 = Instant::now();

        orch.on_reminder_fired(&TimerIdentifier::LOOK_AWAY);
        assert_eq!(orch.state(), EnforcementState::Enforcing);
        assert!(!orch.can_dismiss());

        // The outcome is left unapplied, as if the permission prompt never answered.
        assert!(orch.check_watchdog(t0).is_empty());
        assert!(orch.check_watchdog(t0 + Duration::from_secs(5)).is_empty());
        let events = orch.check_watchdog(t0 + Duration::from_secs(6));
        assert_eq!(events, vec![EnforcementEvent::FaceDetectionTimeout]);
        assert_eq!(orch.state(), EnforcementState::TimedOut);
        assert!(orch.can_dismiss());

        // When the start finally lands it is discarded and released.
        assert!(settle_camera(&mut orch, t0 + Duration::from_secs(7)).is_empty());
        assert!(!orch.camera().is_camera_active());
        assert_eq!(sim.open_sessions(), 0);
    }

    #[test]
    fn test_test_mode_timeout_keeps_preview() {
        let sim = Arc::new(SimulatedCapture::new());
        let mut orch = orchestrator(&sim, false);
        let t0 = Instant::now();

        orch.start_test_mode().unwrap();
        settle_camera(&mut orch, t0);

        let events = orch.check_watchdog(t0 + Duration::from_secs(6));
        assert_eq!(
            events,
            vec![
                EnforcementEvent::FaceDetectionTimeout,
                EnforcementEvent::ComplianceChanged(ComplianceResult::FaceNotDetected),
            ]
        );
        assert_eq!(orch.latest_compliance(), Some(ComplianceResult::FaceNotDetected));
        assert!(orch.is_test_mode());
        assert!(orch.camera().is_camera_active());
        assert_eq!(orch.state(), EnforcementState::Idle);

        // Reported once per stall.
        assert!(orch.check_watchdog(t0 + Duration::from_secs(7)).is_empty());
    }

    #[test]
    fn test_capture_failure_is_retried() {
        let sim = Arc::new(SimulatedCapture::new());
        sim.fail_next_start("device busy");
        let mut orch = orchestrator(&sim, true);
        let now = Instant::now();

        orch.on_timer_update(&TimerIdentifier::LOOK_AWAY, 3);
        let events = settle_camera(&mut orch, now);
        assert_eq!(
            events,
            vec![EnforcementEvent::CameraFailed(CameraError::CaptureFailed(
                "device busy".to_string()
            ))]
        );
        assert_eq!(orch.state(), EnforcementState::Idle);
        assert!(orch.policy().is_enforcement_enabled());

        // Still enabled, so the next update tries again.
        let events = orch.on_timer_update(&TimerIdentifier::LOOK_AWAY, 2);
        assert_eq!(events, vec![EnforcementEvent::CameraRequested]);
        let events = settle_camera(&mut orch, now);
        assert!(matches!(events[..], [EnforcementEvent::CameraReady(_)]));
        assert_eq!(sim.start_count(), 1);
    }

    #[test]
    fn test_permission_denied_reverts_to_idle() {
        let sim = Arc::new(SimulatedCapture::permission_denied());
        let mut orch = orchestrator(&sim, true);

        orch.on_timer_update(&TimerIdentifier::LOOK_AWAY, 3);
        assert_eq!(orch.state(), EnforcementState::PreActivated);

        let events = settle_camera(&mut orch, Instant::now());
        assert_eq!(
            events,
            vec![
                EnforcementEvent::CameraFailed(CameraError::PermissionDenied),
                EnforcementEvent::EnforcementReverted,
            ]
        );
        assert_eq!(orch.state(), EnforcementState::Idle);
        assert!(!orch.policy().is_enforcement_enabled());

        // Not retried on the next tick.
        assert!(orch.on_timer_update(&TimerIdentifier::LOOK_AWAY, 2).is_empty());
    }

    #[test]
    fn test_missing_camera_keeps_enforcement_off() {
        let sim = Arc::new(SimulatedCapture::unavailable());
        let mut orch = orchestrator(&sim, true);

        let events = orch.on_timer_update(&TimerIdentifier::LOOK_AWAY, 3);
        assert_eq!(
            events,
            vec![EnforcementEvent::CameraFailed(CameraError::CameraUnavailable)]
        );
        assert_eq!(orch.state(), EnforcementState::Idle);
        assert!(orch.on_reminder_fired(&TimerIdentifier::LOOK_AWAY).is_empty());
        assert!(orch.can_dismiss());
    }

    #[test]
    fn test_skip_cancels_pre_activation() {
        let sim = Arc::new(SimulatedCapture::new());
        let mut orch = orchestrator(&sim, true);

        orch.on_timer_update(&TimerIdentifier::LOOK_AWAY, 2);
        let events = orch.on_timer_update(&TimerIdentifier::LOOK_AWAY, 1200);
        assert_eq!(events, vec![EnforcementEvent::PreActivationCancelled]);
        assert_eq!(orch.state(), EnforcementState::Idle);

        // The late outcome is discarded and its session released.
        assert!(settle_camera(&mut orch, Instant::now()).is_empty());
        assert_eq!(sim.open_sessions(), 0);
    }

    #[test]
    fn test_disable_always_returns_to_idle() {
        let sim = Arc::new(SimulatedCapture::new());
        let mut orch = orchestrator(&sim, true);
        let now = Instant::now();

        orch.on_reminder_fired(&TimerIdentifier::LOOK_AWAY);
        settle_camera(&mut orch, now);
        assert_eq!(orch.state(), EnforcementState::Enforcing);
        assert_eq!(sim.open_sessions(), 1);

        orch.disable_enforce_mode();
        assert_eq!(orch.state(), EnforcementState::Idle);
        assert_eq!(sim.open_sessions(), 0);
        assert!(orch.can_dismiss());
    }

    #[test]
    fn test_test_mode_is_isolated_from_reminders() {
        let sim = Arc::new(SimulatedCapture::new());
        let mut orch = orchestrator(&sim, false);
        let now = Instant::now();

        assert_eq!(orch.start_test_mode(), Ok(true));
        let events = settle_camera(&mut orch, now);
        assert!(matches!(events[..], [EnforcementEvent::PreviewAvailable(_)]));
        assert_eq!(orch.state(), EnforcementState::Idle);

        let handle = orch.camera().handle().unwrap();
        let events = orch.handle_sample(GazeSample::looking_at_screen(handle), now);
        assert_eq!(
            events,
            vec![EnforcementEvent::ComplianceChanged(ComplianceResult::NotCompliant)]
        );

        // Disabling enforcement leaves the calibration preview alone.
        orch.disable_enforce_mode();
        assert!(orch.camera().is_camera_active());

        orch.stop_test_mode();
        assert!(!orch.camera().is_camera_active());
        assert_eq!(sim.open_sessions(), 0);
    }

    #[test]
    fn test_reminder_cycle_preempts_test_mode() {
        let sim = Arc::new(SimulatedCapture::new());
        let mut orch = orchestrator(&sim, true);
        let now = Instant::now();

        orch.start_test_mode().unwrap();
        settle_camera(&mut orch, now);

        let events = orch.on_timer_update(&TimerIdentifier::LOOK_AWAY, 3);
        assert_eq!(events, vec![EnforcementEvent::CameraRequested]);
        assert!(!orch.is_test_mode());
        assert_eq!(orch.state(), EnforcementState::PreActivated);

        // And test mode cannot start while the cycle owns the camera.
        assert_eq!(orch.start_test_mode(), Ok(false));
    }
}
