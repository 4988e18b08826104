//! `build_incident_plan(incident) -> IncidentPlan`

use std::collections::HashMap;

use crate::config::ThresholdsConfig;
use crate::types::{Incident, IncidentPlan, RecommendedNextStep};

/// Builds the structured plan for an incident. Pure function: same
/// incident + same thresholds always produce the same plan.
pub fn build_incident_plan(incident: &Incident, thresholds: &ThresholdsConfig) -> IncidentPlan {
    let severity = incident.max_severity();
    let confidence = incident.avg_confidence();
    let watchlist_match_present = incident.watchlist_match_present(thresholds);
    let red_light_present = incident.red_light_present(thresholds);

    let recommended_next_step = if confidence < thresholds.min_confidence_for_notify {
        RecommendedNextStep::Monitor
    } else if severity >= thresholds.high_severity_threshold
        || watchlist_match_present
        || red_light_present
    {
        RecommendedNextStep::DispatchPendingReview
    } else {
        RecommendedNextStep::Notify
    };

    let requires_human_approval = recommended_next_step == RecommendedNextStep::DispatchPendingReview;

    let mut evidence_refs: Vec<String> = Vec::new();
    for event in &incident.events {
        if let Some(url) = &event.clip_url {
            evidence_refs.push(url.clone());
        }
        if let Some(url) = &event.snapshot_url {
            evidence_refs.push(url.clone());
        }
    }
    let needs_evidence_marker = matches!(
        recommended_next_step,
        RecommendedNextStep::Notify | RecommendedNextStep::DispatchPendingReview
    );
    if evidence_refs.is_empty() && needs_evidence_marker {
        evidence_refs.push("no_clip_available".to_string());
    }

    let mut action_risk_flags = Vec::new();
    if confidence < thresholds.min_confidence_for_notify {
        action_risk_flags.push("low_confidence".to_string());
    }
    if severity >= thresholds.high_severity_threshold {
        action_risk_flags.push("high_severity".to_string());
    }
    if watchlist_match_present {
        action_risk_flags.push("watchlist_match".to_string());
    }
    if red_light_present {
        action_risk_flags.push("red_light".to_string());
    }
    if !incident.has_evidence() {
        action_risk_flags.push("no_evidence".to_string());
    }

    let is_mismatch = incident.plate_mismatch_present(thresholds);
    let summary_1line = summarize(
        incident,
        severity,
        confidence,
        watchlist_match_present,
        is_mismatch,
    );

    let uncertainty_notes = if confidence < thresholds.min_confidence_for_notify {
        "Confidence is below the notification threshold; recommendation limited to monitoring."
            .to_string()
    } else {
        String::new()
    };

    IncidentPlan {
        summary_1line,
        severity,
        confidence,
        recommended_next_step,
        requires_human_approval,
        action_risk_flags,
        evidence_refs,
        uncertainty_notes,
    }
}

fn summarize(
    incident: &Incident,
    severity: u8,
    confidence: f64,
    watchlist_match_present: bool,
    is_mismatch: bool,
) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for event in &incident.events {
        *counts.entry(event.event_type.as_str()).or_insert(0) += 1;
    }
    let mut types: Vec<&str> = counts.keys().copied().collect();
    types.sort_by(|a, b| counts[b].cmp(&counts[a]).then(a.cmp(b)));
    let top_types = types.join(", ");

    let mut summary = format!(
        "{} event(s): {} (severity {}, confidence {:.2})",
        incident.events.len(),
        top_types,
        severity,
        confidence
    );
    if watchlist_match_present {
        summary.push_str(" - possible watchlist match, requires review");
    } else if is_mismatch {
        summary.push_str(" - possible plate mismatch, requires review");
    }
    summary.chars().take(200).collect()
}
