//! Eyebreak Agent - Privacy-first break reminders with camera-verified
//! look-away enforcement.
//!
//! Interval timers fire eye-strain, blink and posture reminders. When
//! enforcement is enabled, the look-away reminder can only be dismissed once
//! the camera sees the user looking away from the screen.
//!
//! # Privacy Guarantees
//!
//! - **No frames**: Camera frames never leave the capture backend
//! - **Signals only**: Only "face present" and "looking at screen" flags are used
//! - **Short sessions**: The camera runs only around a look-away break
//! - **Transparency**: Every camera session is counted and auditable
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Eyebreak Agent                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │ Scheduling  │──▶│ Enforcement │──▶│   Camera    │       │
//! │  │   Engine    │   │Orchestrator │   │ Controller  │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                 │                  │              │
//! │         ▼                 ▼                  ▼              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  Presenter  │   │Transparency │   │   Capture   │       │
//! │  │             │   │    Log      │   │   Backend   │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use eyebreak_agent::{camera, config, presenter, service, transparency};
//!
//! let config = config::Config::default();
//! let backend = Arc::new(camera::NoopCapture::new());
//! let log = transparency::create_shared_log();
//!
//! let service = service::ReminderService::new(
//!     &config,
//!     backend,
//!     presenter::ConsolePresenter::new(),
//!     log,
//! );
//! let handle = service.handle();
//! let worker = service.spawn();
//!
//! handle.shutdown();
//! worker.join().expect("service thread panicked");
//! ```

pub mod camera;
pub mod config;
pub mod enforcement;
pub mod logging;
pub mod presenter;
pub mod service;
pub mod timer;
pub mod transparency;

// Re-export key types at crate root for convenience
pub use camera::{
    CameraController, CameraError, CaptureBackend, GazeSample, NoopCapture, SimulatedCapture,
};
pub use config::{Config, ConfigError};
pub use enforcement::{
    CompliancePolicy, ComplianceResult, EnforcementEvent, EnforcementOrchestrator,
    EnforcementState,
};
pub use presenter::{ConsolePresenter, Presenter};
pub use service::{Command, ReminderService, ServiceHandle, ServiceNotice};
pub use timer::{EngineEvent, SchedulingEngine, TimerIdentifier};
pub use transparency::{SharedTransparencyLog, TransparencyLog, TransparencyStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Privacy declaration that can be displayed to users.
pub const PRIVACY_DECLARATION: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║              EYEBREAK AGENT - CAMERA PRIVACY DECLARATION         ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  The camera is only used for look-away enforcement, which is     ║
║  off unless you turn it on.                                      ║
║                                                                  ║
║  ✓ WHAT WE USE:                                                  ║
║    • Whether a face is in front of the screen (yes/no)           ║
║    • Whether that face is looking at the screen (yes/no)         ║
║                                                                  ║
║  ✗ WHAT WE NEVER DO:                                             ║
║    • Store or transmit camera frames                             ║
║    • Identify who is in front of the camera                      ║
║    • Keep the camera on outside a look-away break                ║
║    • Send anything over the network                              ║
║                                                                  ║
║  The camera starts a few seconds before a look-away break and    ║
║  is released as soon as the break ends or the face is lost.      ║
║                                                                  ║
║  You can view camera usage statistics anytime with:              ║
║    eyebreak status                                               ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privacy_declaration_contents() {
        assert!(PRIVACY_DECLARATION.contains("PRIVACY"));
        assert!(PRIVACY_DECLARATION.contains("NEVER DO"));
        assert!(PRIVACY_DECLARATION.contains("camera frames"));
    }
}
