//! Privacy-preserving transparency log.
//!
//! Counts what the agent did with the camera and with reminders. Nothing
//! about the user's face or surroundings is recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Usage counters for the current session.
#[derive(Debug)]
pub struct TransparencyLog {
    reminders_shown: AtomicU64,
    reminders_dismissed: AtomicU64,
    reminders_skipped: AtomicU64,
    camera_sessions: AtomicU64,
    verified_breaks: AtomicU64,
    face_timeouts: AtomicU64,
    session_start: DateTime<Utc>,
    persist_path: Option<PathBuf>,
}

impl TransparencyLog {
    pub fn new() -> Self {
        Self {
            reminders_shown: AtomicU64::new(0),
            reminders_dismissed: AtomicU64::new(0),
            reminders_skipped: AtomicU64::new(0),
            camera_sessions: AtomicU64::new(0),
            verified_breaks: AtomicU64::new(0),
            face_timeouts: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create a log that continues the counters stored at `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            debug!("could not load previous transparency stats: {e}");
        }

        log
    }

    pub fn record_reminder_shown(&self) {
        self.reminders_shown.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reminder_dismissed(&self) {
        self.reminders_dismissed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reminder_skipped(&self) {
        self.reminders_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_camera_session(&self) {
        self.camera_sessions.fetch_add(1, Ordering::Relaxed);
    }

    /// A look-away reminder dismissed after the camera saw the user look away.
    pub fn record_verified_break(&self) {
        self.verified_breaks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_face_timeout(&self) {
        self.face_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> TransparencyStats {
        TransparencyStats {
            reminders_shown: self.reminders_shown.load(Ordering::Relaxed),
            reminders_dismissed: self.reminders_dismissed.load(Ordering::Relaxed),
            reminders_skipped: self.reminders_skipped.load(Ordering::Relaxed),
            camera_sessions: self.camera_sessions.load(Ordering::Relaxed),
            verified_breaks: self.verified_breaks.load(Ordering::Relaxed),
            face_timeouts: self.face_timeouts.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Reminders shown: {}\n\
             - Reminders dismissed: {}\n\
             - Reminders skipped: {}\n\
             - Camera sessions: {}\n\
             - Verified look-away breaks: {}\n\
             - Face detection timeouts: {}\n\
             - Session duration: {} seconds\n\
             \n\
             Privacy Guarantee:\n\
             - No camera frames stored or transmitted\n\
             - Only face/gaze yes-no signals used, then discarded\n\
             - Camera released as soon as a break ends",
            stats.reminders_shown,
            stats.reminders_dismissed,
            stats.reminders_skipped,
            stats.camera_sessions,
            stats.verified_breaks,
            stats.face_timeouts,
            stats.session_duration_secs
        )
    }

    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                reminders_shown: stats.reminders_shown,
                reminders_dismissed: stats.reminders_dismissed,
                reminders_skipped: stats.reminders_skipped,
                camera_sessions: stats.camera_sessions,
                verified_breaks: stats.verified_breaks,
                face_timeouts: stats.face_timeouts,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.reminders_shown
                    .store(persisted.reminders_shown, Ordering::Relaxed);
                self.reminders_dismissed
                    .store(persisted.reminders_dismissed, Ordering::Relaxed);
                self.reminders_skipped
                    .store(persisted.reminders_skipped, Ordering::Relaxed);
                self.camera_sessions
                    .store(persisted.camera_sessions, Ordering::Relaxed);
                self.verified_breaks
                    .store(persisted.verified_breaks, Ordering::Relaxed);
                self.face_timeouts
                    .store(persisted.face_timeouts, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    pub fn reset(&self) {
        self.reminders_shown.store(0, Ordering::Relaxed);
        self.reminders_dismissed.store(0, Ordering::Relaxed);
        self.reminders_skipped.store(0, Ordering::Relaxed);
        self.camera_sessions.store(0, Ordering::Relaxed);
        self.verified_breaks.store(0, Ordering::Relaxed);
        self.face_timeouts.store(0, Ordering::Relaxed);
    }
}

impl Default for TransparencyLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of transparency statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransparencyStats {
    pub reminders_shown: u64,
    pub reminders_dismissed: u64,
    pub reminders_skipped: u64,
    pub camera_sessions: u64,
    pub verified_breaks: u64,
    pub face_timeouts: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    reminders_shown: u64,
    reminders_dismissed: u64,
    reminders_skipped: u64,
    camera_sessions: u64,
    verified_breaks: u64,
    face_timeouts: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared transparency log.
pub type SharedTransparencyLog = Arc<TransparencyLog>;

pub fn create_shared_log() -> SharedTransparencyLog {
    Arc::new(TransparencyLog::new())
}

pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedTransparencyLog {
    Arc::new(TransparencyLog::with_persistence(path))
}
