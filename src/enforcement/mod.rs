//! Look-away enforcement: compliance rules and the orchestrator that gates
//! dismissal of the look-away reminder behind verified gaze.

pub mod orchestrator;
pub mod policy;

pub use orchestrator::{EnforcementEvent, EnforcementOrchestrator, EnforcementState};
pub use policy::{
    evaluate_compliance, CompliancePolicy, ComplianceResult, PRE_ACTIVATION_LEAD_SECONDS,
};
