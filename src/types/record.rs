//! Stored-record envelope shared by every JSONL line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::decision::Decision;
use super::event::CameraEvent;
use super::incident::Incident;
use super::plan::{AlertMessage, IncidentPlan, ValidationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Event,
    Incident,
    Decision,
    Audit,
}

/// The latest `IncidentPlan`, `AlertMessage` and `ValidationResult` for an
/// incident. Carried verbatim across status-only updates so it never
/// silently disappears from a stored incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentMetadata {
    pub plan: IncidentPlan,
    pub alert: AlertMessage,
    pub validation: ValidationResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub actor_username: String,
    pub action: String,
    pub target_id: String,
    pub ts: DateTime<Utc>,
    pub detail: serde_json::Value,
}

/// One self-contained line in an append-only JSONL log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoredRecord {
    Event {
        record_ts: DateTime<Utc>,
        payload: CameraEvent,
    },
    Incident {
        record_ts: DateTime<Utc>,
        version: u64,
        payload: Incident,
        #[serde(rename = "_metadata")]
        metadata: IncidentMetadata,
    },
    Decision {
        record_ts: DateTime<Utc>,
        payload: Decision,
    },
    Audit {
        record_ts: DateTime<Utc>,
        payload: AuditRecord,
    },
}

impl StoredRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            StoredRecord::Event { .. } => RecordKind::Event,
            StoredRecord::Incident { .. } => RecordKind::Incident,
            StoredRecord::Decision { .. } => RecordKind::Decision,
            StoredRecord::Audit { .. } => RecordKind::Audit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_record_round_trips_through_json() {
        let record = StoredRecord::Audit {
            record_ts: Utc::now(),
            payload: AuditRecord {
                actor_username: "alice".into(),
                action: "login_success".into(),
                target_id: "alice".into(),
                ts: Utc::now(),
                detail: serde_json::json!({}),
            },
        };
        let text = serde_json::to_string(&record).unwrap();
        let back: StoredRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back.kind(), RecordKind::Audit);
    }
}
