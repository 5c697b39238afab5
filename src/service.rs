//! The control thread.
//!
//! `ReminderService` owns the scheduling engine, the enforcement orchestrator
//! and the presenter. Ticks, commands, gaze samples and camera start outcomes
//! all arrive as messages and are applied one at a time, so no state is ever
//! touched from a capture callback.
//!
//! ```text
//!  1 Hz tick ──┐
//!  commands ───┼──▶ ReminderService ──▶ Presenter
//!  samples ────┤        │    │
//!  outcomes ───┘   Engine  Orchestrator ──▶ CameraController ──▶ CaptureBackend
//! ```

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, tick, unbounded, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::camera::{
    CameraController, CameraError, GazeSample, SharedCaptureBackend, StartOutcome,
};
use crate::config::Config;
use crate::enforcement::{
    CompliancePolicy, EnforcementEvent, EnforcementOrchestrator, EnforcementState,
};
use crate::presenter::Presenter;
use crate::timer::{EngineEvent, SchedulingEngine, TimerIdentifier};
use crate::transparency::SharedTransparencyLog;

/// Requests accepted by a running service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Pause,
    Resume,
    SkipNext(TimerIdentifier),
    TriggerReminder(TimerIdentifier),
    DismissReminder,
    EnableEnforcement,
    DisableEnforcement,
    StartTestMode,
    StopTestMode,
    Shutdown,
}

/// Reports for whoever owns the settings store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceNotice {
    CameraFailed(CameraError),
    /// Camera permission was denied; persist enforcement as disabled
    EnforcementReverted,
}

/// Cloneable sender for commands to a running service.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    commands: Sender<Command>,
}

impl ServiceHandle {
    /// Returns `false` once the service has exited.
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

pub struct ReminderService<P: Presenter> {
    engine: SchedulingEngine,
    orchestrator: EnforcementOrchestrator,
    presenter: P,
    log: SharedTransparencyLog,
    commands_tx: Sender<Command>,
    commands_rx: Receiver<Command>,
    notices_tx: Sender<ServiceNotice>,
    notices_rx: Receiver<ServiceNotice>,
}

impl<P: Presenter> ReminderService<P> {
    /// Wire the components from a configuration snapshot and start scheduling.
    pub fn new(
        config: &Config,
        backend: SharedCaptureBackend,
        presenter: P,
        log: SharedTransparencyLog,
    ) -> Self {
        let camera = CameraController::new(
            backend,
            config.enforcement.calibration,
            config.enforcement.face_detection_timeout,
        );
        let policy = CompliancePolicy::new(config.enforcement.enabled);

        let mut engine = SchedulingEngine::new();
        engine.start(config);
        if config.paused {
            engine.pause();
        }

        let (commands_tx, commands_rx) = unbounded();
        let (notices_tx, notices_rx) = unbounded();
        Self {
            engine,
            orchestrator: EnforcementOrchestrator::new(policy, camera),
            presenter,
            log,
            commands_tx,
            commands_rx,
            notices_tx,
            notices_rx,
        }
    }

    pub fn handle(&self) -> ServiceHandle {
        ServiceHandle {
            commands: self.commands_tx.clone(),
        }
    }

    pub fn notices(&self) -> Receiver<ServiceNotice> {
        self.notices_rx.clone()
    }

    pub fn engine(&self) -> &SchedulingEngine {
        &self.engine
    }

    pub fn orchestrator(&self) -> &EnforcementOrchestrator {
        &self.orchestrator
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Run on a dedicated thread until `Command::Shutdown`.
    pub fn spawn(self) -> JoinHandle<()>
    where
        P: 'static,
    {
        thread::spawn(move || self.run())
    }

    /// Run the control loop on the current thread until `Command::Shutdown`.
    pub fn run(mut self) {
        let ticker = tick(Duration::from_secs(1));
        let commands = self.commands_rx.clone();
        let samples = self.orchestrator.camera().samples().clone();
        let outcomes = self.orchestrator.camera().start_outcomes().clone();

        info!("reminder service running");
        loop {
            select! {
                recv(ticker) -> _ => self.handle_tick(Instant::now()),
                recv(commands) -> command => match command {
                    Ok(command) => {
                        if !self.handle_command(command) {
                            break;
                        }
                    }
                    Err(_) => break,
                },
                recv(samples) -> sample => {
                    if let Ok(sample) = sample {
                        self.handle_sample(sample, Instant::now());
                    }
                },
                recv(outcomes) -> outcome => {
                    if let Ok(outcome) = outcome {
                        self.handle_start_outcome(outcome, Instant::now());
                    }
                },
            }
        }
        self.shutdown();
    }

    /// One scheduler second.
    pub fn handle_tick(&mut self, now: Instant) {
        for event in self.engine.tick() {
            self.apply_engine_event(event);
        }

        if !self.engine.is_globally_paused() {
            if let Some(remaining) = self.engine.remaining_seconds(&TimerIdentifier::LOOK_AWAY) {
                let events = self
                    .orchestrator
                    .on_timer_update(&TimerIdentifier::LOOK_AWAY, remaining);
                self.apply_enforcement_events(events);
            }
        }

        let events = self.orchestrator.check_watchdog(now);
        self.apply_enforcement_events(events);
    }

    /// Apply a command. Returns `false` when the service should exit.
    pub fn handle_command(&mut self, command: Command) -> bool {
        debug!(?command, "command received");
        match command {
            Command::Pause => {
                self.engine.pause();
                let events = self.orchestrator.suspend();
                self.apply_enforcement_events(events);
            }
            Command::Resume => self.engine.resume(),
            Command::SkipNext(id) => {
                if self.engine.state(&id).is_some() {
                    self.engine.skip_next(&id);
                    self.log.record_reminder_skipped();
                    if let Some(remaining) = self.engine.remaining_seconds(&id) {
                        let events = self.orchestrator.on_timer_update(&id, remaining);
                        self.apply_enforcement_events(events);
                    }
                } else {
                    debug!(timer = %id, "skip ignored for untracked timer");
                }
            }
            Command::TriggerReminder(id) => {
                if let Some(event) = self.engine.trigger_reminder(&id) {
                    self.apply_engine_event(event);
                }
            }
            Command::DismissReminder => self.dismiss_active_reminder(),
            Command::EnableEnforcement => self.orchestrator.enable_enforce_mode(),
            Command::DisableEnforcement => {
                self.orchestrator.disable_enforce_mode();
                self.refresh_dismissible();
            }
            Command::StartTestMode => match self.orchestrator.start_test_mode() {
                Ok(true) => {}
                Ok(false) => info!("calibration preview unavailable during a break"),
                Err(error) => {
                    let _ = self.notices_tx.send(ServiceNotice::CameraFailed(error));
                }
            },
            Command::StopTestMode => self.orchestrator.stop_test_mode(),
            Command::Shutdown => return false,
        }
        true
    }

    pub fn handle_sample(&mut self, sample: GazeSample, now: Instant) {
        let events = self.orchestrator.handle_sample(sample, now);
        self.apply_enforcement_events(events);
    }

    pub fn handle_start_outcome(&mut self, outcome: StartOutcome, now: Instant) {
        let events = self.orchestrator.handle_start_outcome(outcome, now);
        self.apply_enforcement_events(events);
    }

    /// Release the camera, stop scheduling and persist the transparency log.
    pub fn shutdown(&mut self) {
        self.orchestrator.shutdown();
        self.engine.stop();
        if let Err(e) = self.log.save() {
            warn!("could not save transparency log: {e}");
        }
        info!("reminder service stopped");
    }

    fn dismiss_active_reminder(&mut self) {
        let Some(id) = self.engine.active_reminder() else {
            debug!("dismiss ignored, no active reminder");
            return;
        };
        if id.is_look_away() && !self.orchestrator.can_dismiss() {
            info!("dismissal refused until the user looks away");
            return;
        }

        let verified = id.is_look_away()
            && self.orchestrator.state() == EnforcementState::Enforcing;
        let promoted = self.engine.dismiss_reminder();
        self.orchestrator.on_reminder_dismissed(&id);
        self.presenter.dismiss_reminder();
        self.log.record_reminder_dismissed();
        if verified {
            self.log.record_verified_break();
        }

        if let Some(event) = promoted {
            self.apply_engine_event(event);
        }
    }

    fn apply_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::ReminderFired(id) => {
                self.presenter.show_reminder(id);
                self.log.record_reminder_shown();
                let events = self.orchestrator.on_reminder_fired(&id);
                self.apply_enforcement_events(events);
                self.refresh_dismissible();
            }
            EngineEvent::ReminderQueued(id) => {
                debug!(timer = %id, "reminder waiting for active reminder");
            }
        }
    }

    fn apply_enforcement_events(&mut self, events: Vec<EnforcementEvent>) {
        if events.is_empty() {
            return;
        }
        for event in events {
            match event {
                EnforcementEvent::CameraRequested | EnforcementEvent::PreActivationCancelled => {}
                EnforcementEvent::CameraReady(_) => self.log.record_camera_session(),
                EnforcementEvent::PreviewAvailable(handle) => {
                    self.log.record_camera_session();
                    self.presenter.show_camera_preview(handle);
                }
                EnforcementEvent::ComplianceChanged(result) => {
                    self.presenter.update_compliance_indicator(result);
                }
                EnforcementEvent::FaceDetectionTimeout => self.log.record_face_timeout(),
                EnforcementEvent::CameraFailed(error) => {
                    let _ = self.notices_tx.send(ServiceNotice::CameraFailed(error));
                }
                EnforcementEvent::EnforcementReverted => {
                    let _ = self.notices_tx.send(ServiceNotice::EnforcementReverted);
                }
            }
        }
        self.refresh_dismissible();
    }

    fn refresh_dismissible(&mut self) {
        if self.engine.active_reminder() == Some(TimerIdentifier::LOOK_AWAY) {
            self.presenter.set_dismissible(self.orchestrator.can_dismiss());
        }
    }
}
