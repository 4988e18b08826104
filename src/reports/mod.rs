//! Shift Report & Metrics — KPI aggregation over a `(start_ts, end_ts)`
//! window plus a deterministic narrative, optionally LLM-rewritten under
//! the same validation gate as alerts.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::check_text;
use crate::llm::LlmClient;
use crate::storage::LogStore;
use crate::types::{DismissReason, IncidentMetadata, OperatorAction};

#[derive(Debug, Clone, Serialize)]
pub struct ShiftReport {
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub total_incidents: usize,
    pub dismissed_rate: f64,
    pub escalation_rate: f64,
    pub confirmed_rate: f64,
    pub avg_seconds_to_first_decision: Option<f64>,
    pub top_cameras: Vec<(String, usize)>,
    pub top_zones: Vec<(String, usize)>,
    pub risk_flag_breakdown: BTreeMap<String, usize>,
    pub narrative: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_warning: Option<String>,
}

fn top_n(counts: BTreeMap<String, usize>, n: usize) -> Vec<(String, usize)> {
    let mut items: Vec<(String, usize)> = counts.into_iter().collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    items.truncate(n);
    items
}

fn narrative_template(
    total_incidents: usize,
    dismissed_rate: f64,
    escalation_rate: f64,
    confirmed_rate: f64,
    top_cameras: &[(String, usize)],
) -> String {
    let top_camera = top_cameras
        .first()
        .map(|(camera, count)| format!("{camera} ({count} incident(s))"))
        .unwrap_or_else(|| "none".to_string());
    format!(
        "{total_incidents} incident(s) this shift. Dismissed {:.0}%, confirmed {:.0}%, escalated {:.0}%. \
         Busiest camera: {top_camera}.",
        dismissed_rate * 100.0,
        confirmed_rate * 100.0,
        escalation_rate * 100.0,
    )
}

/// Builds the shift report for `[start_ts, end_ts]`, scanning incidents by
/// `updated_ts` and decisions by `decision_ts`.
pub async fn build_shift_report(
    store: &LogStore,
    start_ts: DateTime<Utc>,
    end_ts: DateTime<Utc>,
    llm_enabled: bool,
    llm: &dyn LlmClient,
    llm_timeout: Duration,
) -> Result<ShiftReport, crate::storage::StorageError> {
    let incidents_in_window: Vec<(crate::types::Incident, IncidentMetadata, u64)> = store
        .incidents
        .list(None, None, usize::MAX)
        .into_iter()
        .filter(|(incident, _, _)| incident.updated_ts >= start_ts && incident.updated_ts <= end_ts)
        .collect();

    let decisions_in_window: Vec<crate::types::Decision> = store
        .decisions
        .all()?
        .into_iter()
        .filter(|d| d.decision_ts >= start_ts && d.decision_ts <= end_ts)
        .collect();

    let total_incidents = incidents_in_window.len();

    let dismissed = decisions_in_window
        .iter()
        .filter(|d| matches!(d.dismiss_reason, Some(DismissReason::FalsePositiveMotion | DismissReason::NormalBehavior | DismissReason::CameraFault | DismissReason::Weather | DismissReason::Unknown)))
        .count();
    let escalated = decisions_in_window
        .iter()
        .filter(|d| matches!(d.action_taken, OperatorAction::Escalate))
        .count();
    let confirmed = decisions_in_window
        .iter()
        .filter(|d| matches!(d.action_taken, OperatorAction::Confirm))
        .count();
    let decision_count = decisions_in_window.len().max(1);
    let dismissed_rate = dismissed as f64 / decision_count as f64;
    let escalation_rate = escalated as f64 / decision_count as f64;
    let confirmed_rate = confirmed as f64 / decision_count as f64;

    let mut first_decision_ts: BTreeMap<String, DateTime<Utc>> = BTreeMap::new();
    for decision in &decisions_in_window {
        first_decision_ts
            .entry(decision.incident_id.clone())
            .and_modify(|ts| {
                if decision.decision_ts < *ts {
                    *ts = decision.decision_ts;
                }
            })
            .or_insert(decision.decision_ts);
    }
    let deltas: Vec<f64> = incidents_in_window
        .iter()
        .filter_map(|(incident, _, _)| {
            first_decision_ts
                .get(&incident.incident_id)
                .map(|ts| (*ts - incident.created_ts).num_milliseconds() as f64 / 1000.0)
        })
        .collect();
    let avg_seconds_to_first_decision = if deltas.is_empty() {
        None
    } else {
        Some(deltas.iter().sum::<f64>() / deltas.len() as f64)
    };

    let mut camera_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut zone_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut risk_flag_breakdown: BTreeMap<String, usize> = BTreeMap::new();
    for (incident, metadata, _) in &incidents_in_window {
        *camera_counts.entry(incident.camera_id.clone()).or_default() += 1;
        *zone_counts.entry(incident.zone_id.clone()).or_default() += 1;
        for flag in &metadata.plan.action_risk_flags {
            *risk_flag_breakdown.entry(flag.clone()).or_default() += 1;
        }
    }
    let top_cameras = top_n(camera_counts, 5);
    let top_zones = top_n(zone_counts, 5);

    let mut narrative = narrative_template(
        total_incidents,
        dismissed_rate,
        escalation_rate,
        confirmed_rate,
        &top_cameras,
    );
    let mut llm_warning = None;

    if llm_enabled {
        let prompt = format!(
            "Rewrite the following shift summary in neutral, non-accusatory operator language, \
             preserving every figure: {narrative}"
        );
        match tokio::time::timeout(llm_timeout, llm.generate(&prompt, llm_timeout)).await {
            Ok(Ok(rewritten)) => {
                let violations = check_text(&rewritten, false, false);
                if violations.is_empty() {
                    narrative = rewritten;
                } else {
                    llm_warning = Some("llm_rewrite_rejected_accusatory_language".to_string());
                }
            }
            Ok(Err(_)) => llm_warning = Some("llm_unavailable".to_string()),
            Err(_) => llm_warning = Some("llm_timeout".to_string()),
        }
    }

    Ok(ShiftReport {
        start_ts,
        end_ts,
        total_incidents,
        dismissed_rate,
        escalation_rate,
        confirmed_rate,
        avg_seconds_to_first_decision,
        top_cameras,
        top_zones,
        risk_flag_breakdown,
        narrative,
        llm_warning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::DisabledLlmClient;
    use crate::types::{CameraEvent, Incident, IncidentPlan, Metadata, RecommendedNextStep};

    #[tokio::test]
    async fn empty_window_produces_zero_incident_report() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();
        let report = build_shift_report(
            &store,
            Utc::now() - chrono::Duration::hours(8),
            Utc::now(),
            false,
            &DisabledLlmClient,
            Duration::from_secs(3),
        )
        .await
        .unwrap();
        assert_eq!(report.total_incidents, 0);
    }

    #[tokio::test]
    async fn incident_outside_window_is_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();

        let old_ts = Utc::now() - chrono::Duration::days(3);
        let event = CameraEvent {
            event_id: "e1".into(),
            camera_id: "cam_A".into(),
            zone_id: "z1".into(),
            ts: old_ts,
            event_type: "person_detected".into(),
            confidence: 0.6,
            severity: 2,
            clip_url: None,
            snapshot_url: None,
            metadata: Metadata::new(),
        };
        let incident = Incident::new("i1".into(), event, old_ts);
        let metadata = IncidentMetadata {
            plan: IncidentPlan {
                summary_1line: "1 event(s)".into(),
                severity: 2,
                confidence: 0.6,
                recommended_next_step: RecommendedNextStep::Monitor,
                requires_human_approval: false,
                action_risk_flags: vec![],
                evidence_refs: vec![],
                uncertainty_notes: String::new(),
            },
            alert: crate::types::AlertMessage {
                title: "t".into(),
                body: "b".into(),
                operator_actions: vec![],
                evidence_refs: vec![],
                disclaimer: None,
            },
            validation: crate::types::ValidationResult::passed(),
        };
        store.incidents.append(incident, metadata).await.unwrap();

        let report = build_shift_report(
            &store,
            Utc::now() - chrono::Duration::hours(1),
            Utc::now(),
            false,
            &DisabledLlmClient,
            Duration::from_secs(3),
        )
        .await
        .unwrap();
        assert_eq!(report.total_incidents, 0);
    }
}
