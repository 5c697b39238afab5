//! Timer identity and per-timer state for the Eyebreak Agent.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The reminder categories that ship with the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuiltInTimer {
    /// Look at something far away (the only category enforcement applies to)
    LookAway,
    /// Blink deliberately
    Blink,
    /// Check sitting posture
    Posture,
}

impl BuiltInTimer {
    pub const ALL: [BuiltInTimer; 3] = [
        BuiltInTimer::LookAway,
        BuiltInTimer::Blink,
        BuiltInTimer::Posture,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuiltInTimer::LookAway => "look-away",
            BuiltInTimer::Blink => "blink",
            BuiltInTimer::Posture => "posture",
        }
    }
}

/// Stable key for all per-timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerIdentifier {
    BuiltIn(BuiltInTimer),
    UserDefined(Uuid),
}

impl TimerIdentifier {
    pub const LOOK_AWAY: TimerIdentifier = TimerIdentifier::BuiltIn(BuiltInTimer::LookAway);
    pub const BLINK: TimerIdentifier = TimerIdentifier::BuiltIn(BuiltInTimer::Blink);
    pub const POSTURE: TimerIdentifier = TimerIdentifier::BuiltIn(BuiltInTimer::Posture);

    pub fn is_look_away(&self) -> bool {
        *self == Self::LOOK_AWAY
    }
}

impl fmt::Display for TimerIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerIdentifier::BuiltIn(timer) => f.write_str(timer.as_str()),
            TimerIdentifier::UserDefined(id) => write!(f, "user:{id}"),
        }
    }
}

impl FromStr for TimerIdentifier {
    type Err = String;

    /// Accepts `look-away`, `blink`, `posture`, or a user timer UUID
    /// (optionally prefixed with `user:`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if let Some(timer) = BuiltInTimer::ALL.iter().find(|t| t.as_str() == s) {
            return Ok(TimerIdentifier::BuiltIn(*timer));
        }
        if s == "lookaway" || s == "look_away" {
            return Ok(Self::LOOK_AWAY);
        }
        let raw = s.strip_prefix("user:").unwrap_or(&s);
        Uuid::parse_str(raw)
            .map(TimerIdentifier::UserDefined)
            .map_err(|_| format!("unknown timer '{s}'"))
    }
}

/// Per-category interval configuration, owned by the settings store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfiguration {
    pub enabled: bool,
    pub interval_seconds: u32,
}

impl TimerConfiguration {
    pub fn new(enabled: bool, interval_seconds: u32) -> Self {
        Self {
            enabled,
            interval_seconds,
        }
    }
}

/// Countdown state for one tracked timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerState {
    /// Seconds until the next reminder; never negative
    pub remaining_seconds: i64,
    /// Paused because this timer's own reminder is on screen
    pub is_paused: bool,
    /// Interval snapshot taken when the engine started
    pub interval_seconds: u32,
}

impl TimerState {
    pub fn new(interval_seconds: u32) -> Self {
        // A zero interval would fire on every tick.
        let interval_seconds = interval_seconds.max(1);
        Self {
            remaining_seconds: i64::from(interval_seconds),
            is_paused: false,
            interval_seconds,
        }
    }

    pub fn reset(&mut self) {
        self.remaining_seconds = i64::from(self.interval_seconds);
    }
}

/// Read-only view of timer configuration consumed by the engine at `start()`.
pub trait SettingsSource {
    /// Every known timer category with its current configuration.
    fn timer_configurations(&self) -> Vec<(TimerIdentifier, TimerConfiguration)>;
}

impl SettingsSource for Vec<(TimerIdentifier, TimerConfiguration)> {
    fn timer_configurations(&self) -> Vec<(TimerIdentifier, TimerConfiguration)> {
        self.clone()
    }
}
