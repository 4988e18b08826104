//! `validate_incident_plan(plan, incident) -> ValidationResult`
//!
//! Enforces the hard safety rules from spec.md §4.4. Any violation forces
//! `status = failed`; this is reported back as a value, never raised as an
//! HTTP error (spec.md §7).

use once_cell::sync::Lazy;
use regex::RegexSet;

use crate::config::ThresholdsConfig;
use crate::types::{Incident, IncidentPlan, RecommendedNextStep, ValidationResult, ValidationStatus};

/// Case-insensitive, word-boundary forbidden phrases. Any match in a
/// summary/title/body is a hard validation failure.
const FORBIDDEN_PATTERNS: &[&str] = &[
    r"(?i)\bsuspect\b",
    r"(?i)\bcriminal\b",
    r"(?i)\bperpetrator\b",
    r"(?i)\bintruder\b",
    r"(?i)\bidentified as\b",
    r"(?i)\bconfirmed stolen\b",
    r"(?i)\bis stolen\b",
    r"(?i)\bwill be cited\b",
    r"(?i)\bguilty\b",
    r"(?i)\bimpound\b",
    r"(?i)\bseize\b",
    r"(?i)\barrest\b",
    r"(?i)\bfraud\b",
    r"(?i)\bcrime\b",
    r"(?i)\billegal\b",
];

static FORBIDDEN_SET: Lazy<RegexSet> =
    Lazy::new(|| RegexSet::new(FORBIDDEN_PATTERNS).expect("forbidden pattern set must compile"));

const HOTLIST_REQUIRED_TOKENS: &[&str] = &[
    r"(?i)\bpossible\b",
    r"(?i)\bpotential\b",
    r"(?i)\bappears\b",
    r"(?i)\bmay be\b",
    r"(?i)\bverify\b",
    r"(?i)\breview\b",
    r"(?i)\bconfirm\b",
];

static HOTLIST_TOKENS: Lazy<RegexSet> =
    Lazy::new(|| RegexSet::new(HOTLIST_REQUIRED_TOKENS).expect("hotlist token set must compile"));

/// Stable machine-readable violation/warning codes.
pub mod codes {
    pub const ACCUSATORY_LANGUAGE: &str = "accusatory_language";
    pub const MISSING_HOTLIST_HEDGE: &str = "missing_hotlist_hedge";
    pub const LOW_CONFIDENCE_GATE: &str = "low_confidence_gate";
    pub const HIGH_RISK_APPROVAL_GATE: &str = "high_risk_approval_gate";
    pub const EVIDENCE_GATE: &str = "evidence_gate";
    pub const CONFIDENCE_NEAR_THRESHOLD: &str = "confidence_near_threshold";
    pub const UNUSUAL_EVENT_TYPE_MIX: &str = "unusual_event_type_mix";
}

/// Checks `text` against the accusatory-language rule. For hotlist/mismatch
/// incidents, at least one hedging token (plus `mismatch` for mismatch
/// events) is required.
pub fn check_text(text: &str, is_hotlist_or_mismatch: bool, is_mismatch: bool) -> Vec<String> {
    let mut violations = Vec::new();
    if FORBIDDEN_SET.is_match(text) {
        violations.push(codes::ACCUSATORY_LANGUAGE.to_string());
    }
    if is_hotlist_or_mismatch {
        let has_hedge = HOTLIST_TOKENS.is_match(text);
        let has_mismatch_token = !is_mismatch || text.to_lowercase().contains("mismatch");
        if !has_hedge || !has_mismatch_token {
            violations.push(codes::MISSING_HOTLIST_HEDGE.to_string());
        }
    }
    violations
}

pub fn validate_incident_plan(
    plan: &IncidentPlan,
    incident: &Incident,
    thresholds: &ThresholdsConfig,
) -> ValidationResult {
    let mut violations = Vec::new();
    let mut warnings = Vec::new();

    let is_watchlist_match = incident.watchlist_match_present(thresholds);
    let is_mismatch = incident.plate_mismatch_present(thresholds);
    let is_hotlist_or_mismatch = is_watchlist_match || is_mismatch;

    violations.extend(check_text(
        &plan.summary_1line,
        is_hotlist_or_mismatch,
        is_mismatch,
    ));

    if plan.confidence < thresholds.min_confidence_for_notify
        && plan.recommended_next_step != RecommendedNextStep::Monitor
    {
        violations.push(codes::LOW_CONFIDENCE_GATE.to_string());
    }

    let is_high_risk = plan.severity >= thresholds.high_severity_threshold
        || is_watchlist_match
        || incident.red_light_present(thresholds);
    if is_high_risk
        && (!plan.requires_human_approval
            || plan.recommended_next_step == RecommendedNextStep::Notify)
    {
        violations.push(codes::HIGH_RISK_APPROVAL_GATE.to_string());
    }

    let needs_evidence = matches!(
        plan.recommended_next_step,
        RecommendedNextStep::Notify | RecommendedNextStep::DispatchPendingReview
    );
    if needs_evidence && plan.evidence_refs.is_empty() {
        violations.push(codes::EVIDENCE_GATE.to_string());
    }

    let near_threshold = (plan.confidence - thresholds.min_confidence_for_notify).abs() < 0.05;
    if near_threshold {
        warnings.push(codes::CONFIDENCE_NEAR_THRESHOLD.to_string());
    }
    if incident.event_types().len() > 3 {
        warnings.push(codes::UNUSUAL_EVENT_TYPE_MIX.to_string());
    }

    let status = if !violations.is_empty() {
        ValidationStatus::Failed
    } else if !warnings.is_empty() {
        ValidationStatus::Warning
    } else {
        ValidationStatus::Passed
    };

    ValidationResult {
        passed: violations.is_empty(),
        status,
        violations,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accusatory_language_is_flagged() {
        let violations = check_text("A suspect was identified near the gate.", false, false);
        assert!(violations.contains(&codes::ACCUSATORY_LANGUAGE.to_string()));
    }

    #[test]
    fn neutral_language_passes() {
        let violations = check_text(
            "2 event(s): person_detected (severity 3, confidence 0.60)",
            false,
            false,
        );
        assert!(violations.is_empty());
    }

    #[test]
    fn hotlist_text_without_hedge_is_flagged() {
        let violations = check_text("A person was seen at the gate.", true, false);
        assert!(violations.contains(&codes::MISSING_HOTLIST_HEDGE.to_string()));
    }

    #[test]
    fn hotlist_text_with_hedge_passes() {
        let violations = check_text("A possible watchlist match requires review.", true, false);
        assert!(violations.is_empty());
    }
}
