//! Operator `Decision` records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::plan::OperatorAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DismissReason {
    FalsePositiveMotion,
    NormalBehavior,
    CameraFault,
    Weather,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub incident_id: String,
    pub decision_ts: DateTime<Utc>,
    pub action_taken: OperatorAction,
    pub operator_username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub was_true_positive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismiss_reason: Option<DismissReason>,
}
