//! Reminder presentation seam.
//!
//! Window chrome lives outside the agent; the control thread drives a
//! [`Presenter`] with what to show.

use crate::camera::CaptureHandle;
use crate::enforcement::ComplianceResult;
use crate::timer::{BuiltInTimer, TimerIdentifier};
use chrono::Local;

pub trait Presenter: Send {
    fn show_reminder(&mut self, id: TimerIdentifier);
    fn dismiss_reminder(&mut self);
    fn update_compliance_indicator(&mut self, result: ComplianceResult);
    fn show_camera_preview(&mut self, handle: CaptureHandle);

    /// Whether the shown reminder can currently be closed by the user.
    fn set_dismissible(&mut self, _dismissible: bool) {}
}

/// Presenter that writes reminders to stdout.
#[derive(Debug, Default)]
pub struct ConsolePresenter {
    current: Option<TimerIdentifier>,
    dismissible: bool,
}

impl ConsolePresenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn stamp() -> String {
        Local::now().format("%H:%M:%S").to_string()
    }
}

impl Presenter for ConsolePresenter {
    fn show_reminder(&mut self, id: TimerIdentifier) {
        self.current = Some(id);
        self.dismissible = true;
        let prompt = match id {
            TimerIdentifier::BuiltIn(BuiltInTimer::LookAway) => {
                "Look at something 20 feet away for 20 seconds"
            }
            TimerIdentifier::BuiltIn(BuiltInTimer::Blink) => "Blink slowly a few times",
            TimerIdentifier::BuiltIn(BuiltInTimer::Posture) => {
                "Sit up straight and relax your shoulders"
            }
            TimerIdentifier::UserDefined(_) => "Time for your break",
        };
        println!("[{}] Reminder ({id}): {prompt}", Self::stamp());
        println!("           Type `dismiss` when done.");
    }

    fn dismiss_reminder(&mut self) {
        if let Some(id) = self.current.take() {
            println!("[{}] Reminder ({id}) dismissed", Self::stamp());
        }
    }

    fn update_compliance_indicator(&mut self, result: ComplianceResult) {
        println!("[{}] Camera: {}", Self::stamp(), result.as_str());
    }

    fn show_camera_preview(&mut self, handle: CaptureHandle) {
        println!("[{}] Camera preview attached (session {})", Self::stamp(), handle.0);
    }

    fn set_dismissible(&mut self, dismissible: bool) {
        if self.current.is_some() && dismissible != self.dismissible {
            if dismissible {
                println!("[{}] Break verified, you can dismiss now", Self::stamp());
            } else {
                println!("[{}] Look away from the screen to finish the break", Self::stamp());
            }
        }
        self.dismissible = dismissible;
    }
}
