//! Ingestion Pipeline — the critical path from a raw `CameraEvent` to a
//! stored, alertable incident.
//!
//! Single entry point, `ingest_event`: schema-validate, append to the
//! events log, group into an incident, run the plan/validate/alert engine,
//! append the new incident version, and publish the upsert to subscribers.

use std::time::Duration;

use chrono::Utc;

use crate::config::Settings;
use crate::engine::run_engine;
use crate::grouper::{group_event, GroupOutcome};
use crate::hub::FanoutHub;
use crate::llm::LlmClient;
use crate::storage::{LogStore, StorageError};
use crate::types::{CameraEvent, EventValidationError, Incident, IncidentMetadata};

#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("event failed schema validation: {0}")]
    InvalidEvent(#[from] EventValidationError),
    #[error("event stored but incident processing failed: {0}")]
    Partial(StorageError),
}

/// What the caller gets back once an event has made it through the
/// pipeline: the incident it landed in, its version, and whether this was
/// a brand new incident or an attach to an existing one.
#[derive(Debug, Clone)]
pub struct IngestResult {
    pub incident_id: String,
    pub version: u64,
    pub created_new_incident: bool,
}

/// Runs `event` through the full pipeline. `llm` and `llm_timeout` are
/// threaded through to the engine's optional rewrite pass.
pub async fn ingest_event(
    event: CameraEvent,
    store: &LogStore,
    hub: &FanoutHub,
    settings: &Settings,
    llm: &dyn LlmClient,
) -> Result<IngestResult, IngestionError> {
    event.validate()?;

    // Idempotence: a replayed event_id is acknowledged but must not
    // re-trigger grouping or a second incident upsert.
    if store.events.contains(&event.event_id) {
        return reconcile_existing(&event, store)
            .await
            .map_err(IngestionError::Partial);
    }

    store
        .events
        .append_if_new(&event)
        .await
        .map_err(IngestionError::Partial)?;

    let now = Utc::now();
    let existing = store.incidents.by_camera_zone(&event.camera_id, &event.zone_id);
    let outcome = group_event(&event, &existing, &settings.incident_grouping, now);

    let (incident, created_new_incident) = match outcome {
        GroupOutcome::Created { incident } => (incident, true),
        GroupOutcome::Attached { incident_id } => {
            let (mut incident, _, _) = store
                .incidents
                .get(&incident_id)
                .ok_or_else(|| IngestionError::Partial(StorageError::Unavailable(format!(
                    "grouper attached to unknown incident {incident_id}"
                ))))?;
            incident.attach(event.clone(), now);
            (incident, false)
        }
    };

    let llm_timeout = Duration::from_secs(settings.llm.timeout_seconds);
    let (plan, alert, validation) =
        run_engine(&incident, &settings.thresholds, settings.llm.enabled, llm, llm_timeout).await;

    let metadata = IncidentMetadata {
        plan,
        alert: alert.clone(),
        validation,
    };

    let version = store
        .incidents
        .append(incident.clone(), metadata)
        .await
        .map_err(IngestionError::Partial)?;

    hub.publish_incident_upsert(incident.incident_id.clone(), version, alert.title, incident.updated_ts);

    Ok(IngestResult {
        incident_id: incident.incident_id,
        version,
        created_new_incident,
    })
}

/// A replayed `event_id`: the event is already on disk, so just report the
/// incident it already belongs to without re-running grouping or the
/// engine a second time.
async fn reconcile_existing(event: &CameraEvent, store: &LogStore) -> Result<IngestResult, StorageError> {
    let candidates = store.incidents.by_camera_zone(&event.camera_id, &event.zone_id);
    let found = candidates
        .into_iter()
        .find(|incident: &Incident| incident.events.iter().any(|e| e.event_id == event.event_id));
    match found {
        Some(incident) => {
            let (_, _, version) = store
                .incidents
                .get(&incident.incident_id)
                .expect("incident was just found by scan");
            Ok(IngestResult {
                incident_id: incident.incident_id,
                version,
                created_new_incident: false,
            })
        }
        None => Err(StorageError::Unavailable(format!(
            "event {} marked seen but no owning incident found",
            event.event_id
        ))),
    }
}
