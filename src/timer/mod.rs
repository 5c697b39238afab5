//! Interval timers and the scheduling engine that fires break reminders.

pub mod engine;
pub mod types;

pub use engine::{EngineEvent, SchedulingEngine};
pub use types::{BuiltInTimer, SettingsSource, TimerConfiguration, TimerIdentifier, TimerState};
