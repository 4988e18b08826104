//! `CameraEvent`: a single observation from one camera at one moment.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A typed map value for event metadata.
///
/// Well-known keys (`watchlist_match`, `person_count`, ...) are looked up
/// through the typed variants; anything else round-trips through `Json`
/// without the validators needing to understand it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Number(f64),
    String(String),
    Json(serde_json::Value),
}

impl MetadataValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

/// A single observation from one camera at one moment.
///
/// Immutable once validated and stored; incidents reference events by
/// value, never by a mutable handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraEvent {
    pub event_id: String,
    pub camera_id: String,
    pub zone_id: String,
    pub ts: DateTime<Utc>,
    pub event_type: String,
    pub confidence: f64,
    pub severity: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_url: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A rejected event and the reason it failed schema validation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventValidationError {
    #[error("event_id must not be empty")]
    EmptyEventId,
    #[error("confidence {0} is outside [0.0, 1.0]")]
    ConfidenceOutOfRange(f64),
    #[error("severity {0} is outside 1..=5")]
    SeverityOutOfRange(u8),
    #[error("camera_id must not be empty")]
    EmptyCameraId,
    #[error("zone_id must not be empty")]
    EmptyZoneId,
    #[error("event_type must not be empty")]
    EmptyEventType,
}

impl CameraEvent {
    /// Validates invariants from the spec: `confidence in [0,1]`, `severity
    /// in 1..=5`, non-empty identifiers. `ts` is parsed by serde already, so
    /// an event that deserializes at all has a valid timestamp.
    pub fn validate(&self) -> Result<(), EventValidationError> {
        if self.event_id.trim().is_empty() {
            return Err(EventValidationError::EmptyEventId);
        }
        if self.camera_id.trim().is_empty() {
            return Err(EventValidationError::EmptyCameraId);
        }
        if self.zone_id.trim().is_empty() {
            return Err(EventValidationError::EmptyZoneId);
        }
        if self.event_type.trim().is_empty() {
            return Err(EventValidationError::EmptyEventType);
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(EventValidationError::ConfidenceOutOfRange(self.confidence));
        }
        if !(1..=5).contains(&self.severity) {
            return Err(EventValidationError::SeverityOutOfRange(self.severity));
        }
        Ok(())
    }

    pub fn watchlist_match(&self) -> bool {
        self.metadata
            .get("watchlist_match")
            .and_then(MetadataValue::as_bool)
            .unwrap_or(false)
    }

    pub fn has_evidence(&self) -> bool {
        self.clip_url.is_some() || self.snapshot_url.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_event() -> CameraEvent {
        CameraEvent {
            event_id: "e1".into(),
            camera_id: "cam_A".into(),
            zone_id: "z1".into(),
            ts: Utc::now(),
            event_type: "person_detected".into(),
            confidence: 0.6,
            severity: 3,
            clip_url: None,
            snapshot_url: None,
            metadata: Metadata::new(),
        }
    }

    #[test]
    fn valid_event_passes() {
        assert!(base_event().validate().is_ok());
    }

    #[test]
    fn confidence_out_of_range_is_rejected() {
        let mut e = base_event();
        e.confidence = 1.5;
        assert!(matches!(
            e.validate(),
            Err(EventValidationError::ConfidenceOutOfRange(_))
        ));
    }

    #[test]
    fn severity_out_of_range_is_rejected() {
        let mut e = base_event();
        e.severity = 0;
        assert!(matches!(
            e.validate(),
            Err(EventValidationError::SeverityOutOfRange(_))
        ));
    }

    #[test]
    fn empty_event_id_is_rejected() {
        let mut e = base_event();
        e.event_id = "  ".into();
        assert!(matches!(e.validate(), Err(EventValidationError::EmptyEventId)));
    }

    #[test]
    fn watchlist_match_reads_metadata() {
        let mut e = base_event();
        assert!(!e.watchlist_match());
        e.metadata
            .insert("watchlist_match".into(), MetadataValue::Bool(true));
        assert!(e.watchlist_match());
    }
}
