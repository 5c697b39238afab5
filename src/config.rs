//! Configuration for the Eyebreak Agent.

use crate::camera::{CalibrationThresholds, DEFAULT_FACE_DETECTION_TIMEOUT};
use crate::timer::{BuiltInTimer, SettingsSource, TimerConfiguration, TimerIdentifier};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Main configuration for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub look_away: TimerConfiguration,
    pub blink: TimerConfiguration,
    pub posture: TimerConfiguration,

    /// Reminders the user created
    #[serde(default)]
    pub user_timers: Vec<UserTimerConfig>,

    /// Camera-verified look-away breaks
    #[serde(default)]
    pub enforcement: EnforcementConfig,

    /// Path for storing the transparency log
    pub data_path: PathBuf,

    /// Whether all reminders are currently suspended
    #[serde(default)]
    pub paused: bool,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("eyebreak-agent");

        Self {
            look_away: TimerConfiguration::new(true, 20 * 60),
            blink: TimerConfiguration::new(false, 7 * 60),
            posture: TimerConfiguration::new(true, 30 * 60),
            user_timers: Vec::new(),
            enforcement: EnforcementConfig::default(),
            data_path: data_dir,
            paused: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("eyebreak-agent")
            .join("config.json")
    }

    pub fn transparency_path(&self) -> PathBuf {
        self.data_path.join("transparency.json")
    }

    pub fn built_in(&self, timer: BuiltInTimer) -> TimerConfiguration {
        match timer {
            BuiltInTimer::LookAway => self.look_away,
            BuiltInTimer::Blink => self.blink,
            BuiltInTimer::Posture => self.posture,
        }
    }

    /// Configuration for any timer, if it exists.
    pub fn timer(&self, id: &TimerIdentifier) -> Option<TimerConfiguration> {
        match id {
            TimerIdentifier::BuiltIn(timer) => Some(self.built_in(*timer)),
            TimerIdentifier::UserDefined(uuid) => self
                .user_timers
                .iter()
                .find(|t| t.id == *uuid)
                .map(UserTimerConfig::configuration),
        }
    }
}

impl SettingsSource for Config {
    fn timer_configurations(&self) -> Vec<(TimerIdentifier, TimerConfiguration)> {
        BuiltInTimer::ALL
            .iter()
            .map(|t| (TimerIdentifier::BuiltIn(*t), self.built_in(*t)))
            .chain(self.user_timers.iter().map(|t| {
                (TimerIdentifier::UserDefined(t.id), t.configuration())
            }))
            .collect()
    }
}

/// A reminder created by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTimerConfig {
    pub id: Uuid,
    pub title: String,
    pub enabled: bool,
    pub interval_seconds: u32,
}

impl UserTimerConfig {
    pub fn new(title: impl Into<String>, interval_seconds: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            enabled: true,
            interval_seconds,
        }
    }

    pub fn configuration(&self) -> TimerConfiguration {
        TimerConfiguration::new(self.enabled, self.interval_seconds)
    }
}

/// Settings for camera-verified look-away breaks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcementConfig {
    pub enabled: bool,

    /// How long the camera may go without seeing a face
    #[serde(with = "duration_serde")]
    pub face_detection_timeout: Duration,

    #[serde(default)]
    pub calibration: CalibrationThresholds,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            face_detection_timeout: DEFAULT_FACE_DETECTION_TIMEOUT,
            calibration: CalibrationThresholds::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Serialize error: {0}")]
    Serialize(serde_json::Error),
}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.look_away, TimerConfiguration::new(true, 1200));
        assert!(!config.blink.enabled);
        assert!(!config.enforcement.enabled);
        assert_eq!(config.enforcement.face_detection_timeout, Duration::from_secs(5));
        assert!(!config.paused);
    }

    #[test]
    fn test_settings_source_lists_every_timer() {
        let mut config = Config::default();
        let custom = UserTimerConfig::new("Drink water", 45 * 60);
        let custom_id = custom.id;
        config.user_timers.push(custom);

        let timers = config.timer_configurations();
        assert_eq!(timers.len(), 4);
        assert!(timers.contains(&(TimerIdentifier::LOOK_AWAY, config.look_away)));
        assert_eq!(
            config.timer(&TimerIdentifier::UserDefined(custom_id)),
            Some(TimerConfiguration::new(true, 2700))
        );
        assert_eq!(config.timer(&TimerIdentifier::UserDefined(Uuid::new_v4())), None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.paused = true;
        config.enforcement.enabled = true;
        config.enforcement.face_detection_timeout = Duration::from_secs(9);
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert!(loaded.paused);
        assert!(loaded.enforcement.enabled);
        assert_eq!(loaded.enforcement.face_detection_timeout, Duration::from_secs(9));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert!(!loaded.paused);
    }

    #[test]
    fn test_invalid_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
    }
}
