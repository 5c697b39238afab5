//! Pure decision rules for look-away enforcement.

use crate::timer::TimerIdentifier;
use serde::{Deserialize, Serialize};

/// How many seconds before a look-away reminder the camera is warmed up.
pub const PRE_ACTIVATION_LEAD_SECONDS: i64 = 3;

/// Classification of one gaze sample against the intent of a break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceResult {
    Compliant,
    NotCompliant,
    FaceNotDetected,
}

impl ComplianceResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceResult::Compliant => "looking away",
            ComplianceResult::NotCompliant => "still looking at screen",
            ComplianceResult::FaceNotDetected => "no face detected",
        }
    }
}

/// Breaks require looking away, so a face that is not looking at the screen
/// is the compliant case.
pub fn evaluate_compliance(is_looking_at_screen: bool, face_detected: bool) -> ComplianceResult {
    if !face_detected {
        ComplianceResult::FaceNotDetected
    } else if is_looking_at_screen {
        ComplianceResult::NotCompliant
    } else {
        ComplianceResult::Compliant
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompliancePolicy {
    enforcement_enabled: bool,
}

impl CompliancePolicy {
    pub fn new(enforcement_enabled: bool) -> Self {
        Self {
            enforcement_enabled,
        }
    }

    pub fn is_enforcement_enabled(&self) -> bool {
        self.enforcement_enabled
    }

    pub fn set_enforcement_enabled(&mut self, enabled: bool) {
        self.enforcement_enabled = enabled;
    }

    /// Enforcement only ever applies to the built-in look-away timer.
    pub fn should_enforce(&self, id: &TimerIdentifier) -> bool {
        self.enforcement_enabled && id.is_look_away()
    }

    pub fn should_pre_activate_camera(&self, id: &TimerIdentifier, seconds_remaining: i64) -> bool {
        self.should_enforce(id) && seconds_remaining <= PRE_ACTIVATION_LEAD_SECONDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    #[test]
    fn test_evaluate_compliance() {
        assert_eq!(evaluate_compliance(false, true), ComplianceResult::Compliant);
        assert_eq!(evaluate_compliance(true, true), ComplianceResult::NotCompliant);
        assert_eq!(evaluate_compliance(true, false), ComplianceResult::FaceNotDetected);
        assert_eq!(evaluate_compliance(false, false), ComplianceResult::FaceNotDetected);
    }

    #[test]
    fn test_enforcement_only_for_look_away() {
        let policy = CompliancePolicy::new(true);
        assert!(policy.should_enforce(&TimerIdentifier::LOOK_AWAY));
        assert!(!policy.should_enforce(&TimerIdentifier::BLINK));
        assert!(!policy.should_enforce(&TimerIdentifier::POSTURE));
        assert!(!policy.should_enforce(&TimerIdentifier::UserDefined(Uuid::new_v4())));

        let disabled = CompliancePolicy::new(false);
        assert!(!disabled.should_enforce(&TimerIdentifier::LOOK_AWAY));
    }

    #[test]
    fn test_other_categories_never_pre_activate() {
        let policy = CompliancePolicy::new(true);
        assert!(!policy.should_pre_activate_camera(&TimerIdentifier::BLINK, 0));
        assert!(!policy.should_pre_activate_camera(&TimerIdentifier::POSTURE, 0));

        let custom = TimerIdentifier::UserDefined(Uuid::new_v4());
        assert!(!policy.should_pre_activate_camera(&custom, 0));
        assert!(!policy.should_pre_activate_camera(&custom, PRE_ACTIVATION_LEAD_SECONDS));
    }

    proptest! {
        #[test]
        fn pre_activation_window_is_zero_to_three(remaining in 0i64..100_000) {
            let policy = CompliancePolicy::new(true);
            prop_assert_eq!(
                policy.should_pre_activate_camera(&TimerIdentifier::LOOK_AWAY, remaining),
                remaining <= 3
            );
        }

        #[test]
        fn no_pre_activation_when_disabled(remaining in 0i64..100_000) {
            let policy = CompliancePolicy::new(false);
            let id = TimerIdentifier::LOOK_AWAY;
            prop_assert!(!policy.should_pre_activate_camera(&id, remaining));
        }

        #[test]
        fn missing_face_wins_over_gaze(looking in any::<bool>()) {
            prop_assert_eq!(evaluate_compliance(looking, false), ComplianceResult::FaceNotDetected);
        }
    }
}
