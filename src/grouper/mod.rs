//! Incident Grouper — dedup + merge-window logic.
//!
//! Deterministic: given the same validated event and the same set of
//! existing incidents at `(camera_id, zone_id)`, always produces the same
//! outcome. Ties in "most recent" are broken by `incident_id` lexicographic
//! order so ordering stays deterministic even with equal timestamps.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::config::IncidentGroupingConfig;
use crate::types::{CameraEvent, Incident};

/// What the grouper decided to do with an incoming event.
pub enum GroupOutcome {
    /// Attach to an existing incident (dedup or merge).
    Attached { incident_id: String },
    /// Create a brand new incident.
    Created { incident: Incident },
}

fn most_recent<'a>(candidates: &'a [&'a Incident]) -> Option<&'a Incident> {
    candidates
        .iter()
        .copied()
        .max_by(|a, b| {
            a.latest_event_ts()
                .cmp(&b.latest_event_ts())
                .then(a.incident_id.cmp(&b.incident_id))
        })
}

fn is_compatible(
    incoming_type: &str,
    incident_types: &std::collections::BTreeSet<&str>,
    compatibility: &IncidentGroupingConfig,
) -> bool {
    if incident_types.contains(incoming_type) {
        return true;
    }
    for existing_type in incident_types {
        if let Some(set) = compatibility.compatible_event_types.get(*existing_type) {
            if set.contains(incoming_type) {
                return true;
            }
        }
    }
    if let Some(set) = compatibility.compatible_event_types.get(incoming_type) {
        return incident_types.iter().any(|t| set.contains(*t));
    }
    false
}

/// Decides whether `event` should attach to one of `existing` (incidents
/// already at the same camera+zone) or start a new incident.
pub fn group_event(
    event: &CameraEvent,
    existing: &[Incident],
    config: &IncidentGroupingConfig,
    now: DateTime<Utc>,
) -> GroupOutcome {
    let refs: Vec<&Incident> = existing.iter().collect();

    // Step 1: dedup probe — same event_type within dedup_window_seconds.
    let dedup_candidates: Vec<&Incident> = refs
        .iter()
        .copied()
        .filter(|incident| {
            incident.event_types().contains(event.event_type.as_str())
                && incident
                    .latest_event_ts()
                    .map(|ts| (event.ts - ts).num_seconds().abs() <= config.dedup_window_seconds)
                    .unwrap_or(false)
        })
        .collect();
    if let Some(incident) = most_recent(&dedup_candidates) {
        return GroupOutcome::Attached {
            incident_id: incident.incident_id.clone(),
        };
    }

    // Step 2: merge probe — compatible event_type within merge_window_seconds.
    let merge_candidates: Vec<&Incident> = refs
        .iter()
        .copied()
        .filter(|incident| {
            incident
                .latest_event_ts()
                .map(|ts| (event.ts - ts).num_seconds().abs() <= config.merge_window_seconds)
                .unwrap_or(false)
                && is_compatible(&event.event_type, &incident.event_types(), config)
        })
        .collect();
    if let Some(incident) = most_recent(&merge_candidates) {
        return GroupOutcome::Attached {
            incident_id: incident.incident_id.clone(),
        };
    }

    // Step 3: create a new incident with a stable, deterministic id.
    let incident_id = generate_incident_id(event);
    GroupOutcome::Created {
        incident: Incident::new(incident_id, event.clone(), now),
    }
}

fn generate_incident_id(event: &CameraEvent) -> String {
    let floored = event.ts.timestamp();
    let random_suffix: u32 = rand::thread_rng().gen_range(0..0xFFFF);
    format!(
        "{}-{}-{}-{:04x}",
        event.camera_id, event.zone_id, floored, random_suffix
    )
}
