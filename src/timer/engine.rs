//! Reminder scheduling engine.
//!
//! The engine runs any number of independently configured countdown timers.
//! It does not use internal threads; the owner calls `tick()` once per
//! wall-clock second and forwards the returned events to the presenter.
//!
//! At most one reminder is active at a time. A timer that expires while
//! another reminder is on screen is reset, keeps counting, and waits in a
//! FIFO queue until the current reminder is dismissed.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::types::{SettingsSource, TimerIdentifier, TimerState};

/// Notifications produced by engine commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// A reminder became the active reminder and should be shown.
    ReminderFired(TimerIdentifier),
    /// A reminder is waiting for the active one to be dismissed.
    ReminderQueued(TimerIdentifier),
}

#[derive(Debug, Default)]
pub struct SchedulingEngine {
    timers: HashMap<TimerIdentifier, TimerState>,
    /// Stable iteration order so simultaneous expiries fire deterministically.
    order: Vec<TimerIdentifier>,
    active_reminder: Option<TimerIdentifier>,
    pending: VecDeque<TimerIdentifier>,
    globally_paused: bool,
}

impl SchedulingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_running(&self) -> bool {
        !self.timers.is_empty()
    }

    pub fn is_globally_paused(&self) -> bool {
        self.globally_paused
    }

    pub fn active_reminder(&self) -> Option<TimerIdentifier> {
        self.active_reminder
    }

    pub fn pending_reminders(&self) -> impl Iterator<Item = &TimerIdentifier> {
        self.pending.iter()
    }

    pub fn state(&self, id: &TimerIdentifier) -> Option<&TimerState> {
        self.timers.get(id)
    }

    pub fn remaining_seconds(&self, id: &TimerIdentifier) -> Option<i64> {
        self.timers.get(id).map(|s| s.remaining_seconds)
    }

    pub fn tracked_timers(&self) -> &[TimerIdentifier] {
        &self.order
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Snapshot configuration and begin tracking every enabled timer.
    ///
    /// Timers that are already tracked keep their current countdown; call
    /// `stop()` first to force a fresh read.
    pub fn start(&mut self, settings: &impl SettingsSource) {
        for (id, config) in settings.timer_configurations() {
            if !config.enabled || self.timers.contains_key(&id) {
                continue;
            }
            info!(timer = %id, interval = config.interval_seconds, "tracking timer");
            self.timers.insert(id, TimerState::new(config.interval_seconds));
            self.order.push(id);
        }
    }

    /// Advance every running timer by one second.
    pub fn tick(&mut self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        if self.globally_paused {
            return events;
        }

        let mut expired = Vec::new();
        for id in &self.order {
            if let Some(state) = self.timers.get_mut(id) {
                if state.is_paused {
                    continue;
                }
                state.remaining_seconds = (state.remaining_seconds - 1).max(0);
                if state.remaining_seconds == 0 {
                    expired.push(*id);
                }
            }
        }

        for id in expired {
            events.extend(self.fire(id));
        }
        events
    }

    /// Globally suspend every timer without touching per-timer pause flags.
    pub fn pause(&mut self) {
        if !self.globally_paused {
            info!("scheduling paused");
        }
        self.globally_paused = true;
    }

    pub fn resume(&mut self) {
        if self.globally_paused {
            info!("scheduling resumed");
        }
        self.globally_paused = false;
    }

    /// Restart the named timer's countdown without showing a reminder.
    pub fn skip_next(&mut self, id: &TimerIdentifier) {
        match self.timers.get_mut(id) {
            Some(state) => {
                state.reset();
                info!(timer = %id, "skipped next reminder");
            }
            None => debug!(timer = %id, "skip ignored for untracked timer"),
        }
    }

    /// Fire a reminder as if the timer had reached zero.
    pub fn trigger_reminder(&mut self, id: &TimerIdentifier) -> Option<EngineEvent> {
        if !self.timers.contains_key(id) {
            debug!(timer = %id, "trigger ignored for untracked timer");
            return None;
        }
        self.fire(*id)
    }

    /// Clear the active reminder, resume its timer and promote the next
    /// queued reminder if there is one.
    pub fn dismiss_reminder(&mut self) -> Option<EngineEvent> {
        let id = self.active_reminder.take()?;
        if let Some(state) = self.timers.get_mut(&id) {
            state.is_paused = false;
        }
        info!(timer = %id, "reminder dismissed");

        while let Some(next) = self.pending.pop_front() {
            if self.timers.contains_key(&next) {
                return self.activate(next);
            }
        }
        None
    }

    /// Drop all timer state. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.is_running() {
            info!("scheduling stopped");
        }
        self.timers.clear();
        self.order.clear();
        self.pending.clear();
        self.active_reminder = None;
    }

    fn fire(&mut self, id: TimerIdentifier) -> Option<EngineEvent> {
        if self.active_reminder == Some(id) {
            return None;
        }
        if self.active_reminder.is_some() {
            if let Some(state) = self.timers.get_mut(&id) {
                state.reset();
            }
            if self.pending.contains(&id) {
                return None;
            }
            info!(timer = %id, "reminder queued behind active reminder");
            self.pending.push_back(id);
            return Some(EngineEvent::ReminderQueued(id));
        }
        self.activate(id)
    }

    fn activate(&mut self, id: TimerIdentifier) -> Option<EngineEvent> {
        let state = self.timers.get_mut(&id)?;
        state.reset();
        state.is_paused = true;
        self.active_reminder = Some(id);
        info!(timer = %id, "reminder fired");
        Some(EngineEvent::ReminderFired(id))
    }
}
