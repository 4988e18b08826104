//! Engine output types: `IncidentPlan`, `ValidationResult`, `AlertMessage`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedNextStep {
    Monitor,
    Notify,
    DispatchPendingReview,
}

/// The engine's structured recommendation and risk assessment for an
/// incident. Recomputed on every change; never hand-edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentPlan {
    pub summary_1line: String,
    pub severity: u8,
    pub confidence: f64,
    pub recommended_next_step: RecommendedNextStep,
    pub requires_human_approval: bool,
    pub action_risk_flags: Vec<String>,
    pub evidence_refs: Vec<String>,
    pub uncertainty_notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Passed,
    Warning,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub passed: bool,
    pub violations: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn passed() -> Self {
        Self {
            status: ValidationStatus::Passed,
            passed: true,
            violations: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorAction {
    Confirm,
    Dismiss,
    Escalate,
    Close,
    Approve,
}

/// The neutral, operator-facing message derived from the plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertMessage {
    pub title: String,
    pub body: String,
    pub operator_actions: Vec<OperatorAction>,
    pub evidence_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimer: Option<String>,
}

/// The fixed neutral fallback body used whenever validation fails.
pub const NEUTRAL_REVIEW_BODY: &str =
    "This incident requires manual review. The automated summary could not be validated \
     against the system's safety rules and has been withheld.";
