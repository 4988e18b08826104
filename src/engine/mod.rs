//! Engine — Plan / Validate / Alert.
//!
//! Builds `IncidentPlan`, enforces the safety rules from spec.md §4.4, and
//! compiles the neutral `AlertMessage`. Pure except for the optional,
//! strictly-bounded LLM rewrite pass in `alert::compile_alert`.

mod alert;
mod plan;
mod validate;

pub use alert::{compile_alert, run_engine};
pub use plan::build_incident_plan;
pub use validate::{check_text, codes, validate_incident_plan};
