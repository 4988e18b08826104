//! Named audit events (spec.md §4.11), each a thin wrapper over
//! `storage::AuditStore::record` so call sites read as intent rather than
//! as raw `(actor, action, target, detail)` tuples.

use serde_json::json;

use crate::storage::{AuditStore, StorageError};

pub async fn login_success(audit: &AuditStore, username: &str) -> Result<(), StorageError> {
    audit.record(username, "login_success", username, json!({})).await
}

pub async fn login_failure(audit: &AuditStore, attempted_username: &str) -> Result<(), StorageError> {
    audit
        .record("anonymous", "login_failure", attempted_username, json!({}))
        .await
}

pub async fn user_created(audit: &AuditStore, actor: &str, target: &str, role: &str) -> Result<(), StorageError> {
    audit.record(actor, "user_created", target, json!({ "role": role })).await
}

pub async fn user_disabled(audit: &AuditStore, actor: &str, target: &str) -> Result<(), StorageError> {
    audit.record(actor, "user_disabled", target, json!({})).await
}

pub async fn password_changed(audit: &AuditStore, actor: &str, target: &str) -> Result<(), StorageError> {
    audit.record(actor, "password_changed", target, json!({})).await
}

pub async fn decision_recorded(
    audit: &AuditStore,
    actor: &str,
    incident_id: &str,
    action_taken: &str,
) -> Result<(), StorageError> {
    audit
        .record(actor, "decision_recorded", incident_id, json!({ "action_taken": action_taken }))
        .await
}

pub async fn approval_granted(
    audit: &AuditStore,
    actor: &str,
    incident_id: &str,
    approval_notes: Option<&str>,
) -> Result<(), StorageError> {
    audit
        .record(actor, "approval_granted", incident_id, json!({ "approval_notes": approval_notes }))
        .await
}

pub async fn settings_updated(audit: &AuditStore, actor: &str) -> Result<(), StorageError> {
    audit.record(actor, "settings_updated", "settings", json!({})).await
}

pub async fn simulator_started(audit: &AuditStore, actor: &str, scenario: &str) -> Result<(), StorageError> {
    audit
        .record(actor, "simulator_started", "simulator", json!({ "scenario": scenario }))
        .await
}

pub async fn simulator_stopped(audit: &AuditStore, actor: &str) -> Result<(), StorageError> {
    audit.record(actor, "simulator_stopped", "simulator", json!({})).await
}

pub async fn ingestion_rejected(audit: &AuditStore, event_id: &str, reason: &str) -> Result<(), StorageError> {
    audit
        .record("anonymous", "ingestion_rejected", event_id, json!({ "reason": reason }))
        .await
}
