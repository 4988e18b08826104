//! `Incident`: a grouped collection of related camera events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ThresholdsConfig;

use super::event::CameraEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    New,
    Triage,
    Dismissed,
    Escalated,
    DispatchPendingReview,
    DispatchAuthorized,
    Closed,
}

/// A grouped collection of related camera events, treated as one
/// operator-facing item. Mutable only by appending a new version; never
/// destroyed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub incident_id: String,
    pub status: IncidentStatus,
    pub created_ts: DateTime<Utc>,
    pub updated_ts: DateTime<Utc>,
    pub camera_id: String,
    pub zone_id: String,
    pub events: Vec<CameraEvent>,
}

impl Incident {
    pub fn new(incident_id: String, first_event: CameraEvent, now: DateTime<Utc>) -> Self {
        let camera_id = first_event.camera_id.clone();
        let zone_id = first_event.zone_id.clone();
        Self {
            incident_id,
            status: IncidentStatus::New,
            created_ts: now,
            updated_ts: now,
            camera_id,
            zone_id,
            events: vec![first_event],
        }
    }

    pub fn attach(&mut self, event: CameraEvent, now: DateTime<Utc>) {
        self.events.push(event);
        self.updated_ts = now;
    }

    pub fn latest_event_ts(&self) -> Option<DateTime<Utc>> {
        self.events.iter().map(|e| e.ts).max()
    }

    pub fn max_severity(&self) -> u8 {
        self.events.iter().map(|e| e.severity).max().unwrap_or(0)
    }

    pub fn avg_confidence(&self) -> f64 {
        if self.events.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.events.iter().map(|e| e.confidence).sum();
        sum / self.events.len() as f64
    }

    /// A watchlist match only counts once the triggering event's confidence
    /// clears the detector's own bar (spec.md §9): a low-confidence flag on
    /// the event is not trusted enough to drive the approval gate.
    pub fn watchlist_match_present(&self, thresholds: &ThresholdsConfig) -> bool {
        self.events
            .iter()
            .any(|e| e.watchlist_match() && e.confidence >= thresholds.watchlist_match_confidence)
    }

    pub fn plate_mismatch_present(&self, thresholds: &ThresholdsConfig) -> bool {
        self.events
            .iter()
            .any(|e| e.event_type == "plate_mismatch" && e.confidence >= thresholds.plate_mismatch_confidence)
    }

    pub fn red_light_present(&self, thresholds: &ThresholdsConfig) -> bool {
        self.events
            .iter()
            .any(|e| e.event_type == "red_light" && e.confidence >= thresholds.red_light_confidence)
    }

    pub fn has_evidence(&self) -> bool {
        self.events.iter().any(|e| e.has_evidence())
    }

    pub fn event_types(&self) -> std::collections::BTreeSet<&str> {
        self.events.iter().map(|e| e.event_type.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metadata;

    fn event(ts: DateTime<Utc>, severity: u8, confidence: f64) -> CameraEvent {
        CameraEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            camera_id: "cam_A".into(),
            zone_id: "z1".into(),
            ts,
            event_type: "person_detected".into(),
            confidence,
            severity,
            clip_url: None,
            snapshot_url: None,
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn max_severity_is_max_over_events() {
        let now = Utc::now();
        let mut inc = Incident::new("i1".into(), event(now, 2, 0.5), now);
        inc.attach(event(now, 5, 0.9), now);
        inc.attach(event(now, 3, 0.7), now);
        assert_eq!(inc.max_severity(), 5);
    }

    #[test]
    fn avg_confidence_is_mean_over_events() {
        let now = Utc::now();
        let mut inc = Incident::new("i1".into(), event(now, 2, 0.4), now);
        inc.attach(event(now, 2, 0.6), now);
        assert!((inc.avg_confidence() - 0.5).abs() < 1e-9);
    }
}
