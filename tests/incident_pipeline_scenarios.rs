//! End-to-end scenarios from spec.md §8 (S1-S7), driven through the same
//! `ingest_event` entry point HTTP and the simulator use.

use std::time::Duration;

use alibi::config::default_settings;
use alibi::hub::FanoutHub;
use alibi::ingestion::{ingest_event, IngestionError};
use alibi::llm::{DisabledLlmClient, LlmClient, LlmError};
use alibi::storage::LogStore;
use alibi::types::{CameraEvent, Metadata, MetadataValue, RecommendedNextStep, NEUTRAL_REVIEW_BODY};
use chrono::{DateTime, Utc};

/// Always rewrites the alert body into accusatory prose, regardless of the
/// prompt, standing in for a real backend that produced unsafe output.
struct AccusatoryLlmClient;

#[async_trait::async_trait]
impl LlmClient for AccusatoryLlmClient {
    async fn generate(&self, _prompt: &str, _timeout: Duration) -> Result<String, LlmError> {
        Ok("The suspect was identified near the gate.".to_string())
    }
}

fn event(
    id: &str,
    camera: &str,
    zone: &str,
    ts: DateTime<Utc>,
    event_type: &str,
    confidence: f64,
    severity: u8,
    clip_url: Option<&str>,
    metadata: Metadata,
) -> CameraEvent {
    CameraEvent {
        event_id: id.to_string(),
        camera_id: camera.to_string(),
        zone_id: zone.to_string(),
        ts,
        event_type: event_type.to_string(),
        confidence,
        severity,
        clip_url: clip_url.map(String::from),
        snapshot_url: None,
        metadata,
    }
}

#[tokio::test]
async fn s1_low_confidence_stays_as_monitor() {
    let dir = tempfile::tempdir().unwrap();
    let store = LogStore::open(dir.path()).unwrap();
    let hub = FanoutHub::new();
    let settings = default_settings();
    let ts: DateTime<Utc> = "2026-01-18T10:00:00Z".parse().unwrap();

    let e1 = event("e1", "cam_A", "z1", ts, "person_detected", 0.60, 3, None, Metadata::new());
    let result = ingest_event(e1, &store, &hub, &settings, &DisabledLlmClient)
        .await
        .unwrap();

    let (_, metadata, _) = store.incidents.get(&result.incident_id).unwrap();
    assert_eq!(metadata.plan.recommended_next_step, RecommendedNextStep::Monitor);
    assert!(!metadata.plan.requires_human_approval);
    assert!(metadata.validation.passed);
}

#[tokio::test]
async fn s2_dedup_within_30s_does_not_create_new_incident() {
    let dir = tempfile::tempdir().unwrap();
    let store = LogStore::open(dir.path()).unwrap();
    let hub = FanoutHub::new();
    let settings = default_settings();
    let base_ts: DateTime<Utc> = "2026-01-18T10:00:00Z".parse().unwrap();

    let e1 = event("e1", "cam_A", "z1", base_ts, "person_detected", 0.60, 3, None, Metadata::new());
    let first = ingest_event(e1, &store, &hub, &settings, &DisabledLlmClient)
        .await
        .unwrap();

    let e2 = event(
        "e2",
        "cam_A",
        "z1",
        base_ts + chrono::Duration::seconds(20),
        "person_detected",
        0.80,
        3,
        None,
        Metadata::new(),
    );
    let second = ingest_event(e2, &store, &hub, &settings, &DisabledLlmClient)
        .await
        .unwrap();

    assert_eq!(first.incident_id, second.incident_id);
    let (incident, _, _) = store.incidents.get(&first.incident_id).unwrap();
    assert_eq!(incident.events.len(), 2);
}

#[tokio::test]
async fn s3_merge_across_compatible_types() {
    let dir = tempfile::tempdir().unwrap();
    let store = LogStore::open(dir.path()).unwrap();
    let hub = FanoutHub::new();
    let settings = default_settings();
    let base_ts: DateTime<Utc> = "2026-01-18T10:00:00Z".parse().unwrap();

    let e1 = event("e1", "cam_A", "z1", base_ts, "person_detected", 0.60, 3, None, Metadata::new());
    let first = ingest_event(e1, &store, &hub, &settings, &DisabledLlmClient).await.unwrap();

    let e2 = event(
        "e2",
        "cam_A",
        "z1",
        base_ts + chrono::Duration::seconds(20),
        "person_detected",
        0.80,
        3,
        None,
        Metadata::new(),
    );
    ingest_event(e2, &store, &hub, &settings, &DisabledLlmClient).await.unwrap();

    let e3 = event(
        "e3",
        "cam_A",
        "z1",
        base_ts + chrono::Duration::seconds(120),
        "loitering",
        0.80,
        3,
        None,
        Metadata::new(),
    );
    let third = ingest_event(e3, &store, &hub, &settings, &DisabledLlmClient).await.unwrap();

    assert_eq!(first.incident_id, third.incident_id);
    let (incident, _, _) = store.incidents.get(&first.incident_id).unwrap();
    assert_eq!(incident.events.len(), 3);
}

#[tokio::test]
async fn s4_new_incident_after_merge_window() {
    let dir = tempfile::tempdir().unwrap();
    let store = LogStore::open(dir.path()).unwrap();
    let hub = FanoutHub::new();
    let settings = default_settings();
    let base_ts: DateTime<Utc> = "2026-01-18T10:00:00Z".parse().unwrap();

    let e1 = event("e1", "cam_A", "z1", base_ts, "person_detected", 0.60, 3, None, Metadata::new());
    let first = ingest_event(e1, &store, &hub, &settings, &DisabledLlmClient).await.unwrap();

    let e4 = event(
        "e4",
        "cam_A",
        "z1",
        base_ts + chrono::Duration::seconds(600),
        "person_detected",
        0.60,
        3,
        None,
        Metadata::new(),
    );
    let fourth = ingest_event(e4, &store, &hub, &settings, &DisabledLlmClient).await.unwrap();

    assert_ne!(first.incident_id, fourth.incident_id);
}

#[tokio::test]
async fn s5_watchlist_match_forces_approval_path() {
    let dir = tempfile::tempdir().unwrap();
    let store = LogStore::open(dir.path()).unwrap();
    let hub = FanoutHub::new();
    let settings = default_settings();
    let ts: DateTime<Utc> = "2026-01-18T11:00:00Z".parse().unwrap();

    let mut metadata = Metadata::new();
    metadata.insert("watchlist_match".to_string(), MetadataValue::Bool(true));
    let e5 = event(
        "e5",
        "cam_B",
        "z2",
        ts,
        "person_detected",
        0.90,
        3,
        Some("https://evidence.local/c.mp4"),
        metadata,
    );
    let result = ingest_event(e5, &store, &hub, &settings, &DisabledLlmClient)
        .await
        .unwrap();

    let (_, stored, _) = store.incidents.get(&result.incident_id).unwrap();
    assert!(stored.plan.requires_human_approval);
    assert_eq!(
        stored.plan.recommended_next_step,
        RecommendedNextStep::DispatchPendingReview
    );
    assert!(stored
        .plan
        .evidence_refs
        .contains(&"https://evidence.local/c.mp4".to_string()));
    assert!(stored.validation.passed);
}

#[tokio::test]
async fn s6_accusatory_language_is_blocked_post_compile() {
    let dir = tempfile::tempdir().unwrap();
    let store = LogStore::open(dir.path()).unwrap();
    let hub = FanoutHub::new();
    let mut settings = default_settings();
    settings.llm.enabled = true;
    let ts: DateTime<Utc> = "2026-01-18T12:00:00Z".parse().unwrap();

    let e6 = event(
        "e6",
        "cam_C",
        "z3",
        ts,
        "person_detected",
        0.90,
        3,
        Some("https://evidence.local/c6.mp4"),
        Metadata::new(),
    );
    let result = ingest_event(e6, &store, &hub, &settings, &AccusatoryLlmClient)
        .await
        .unwrap();

    let (_, stored, _) = store.incidents.get(&result.incident_id).unwrap();
    assert_ne!(stored.alert.body, "The suspect was identified near the gate.");
    assert!(!stored.alert.body.to_lowercase().contains("suspect"));
    // compile_alert's own gate already rejects the rewrite and falls back to
    // the template, so validation still passes; the fixed neutral fallback
    // only kicks in when the accusatory text survives into post-compile
    // re-validation, which it never does here.
    assert_ne!(stored.alert.body, NEUTRAL_REVIEW_BODY);
    assert!(stored.validation.passed);
}

// S7 (dismiss without dismiss_reason returns 422 and writes nothing) is
// exercised at the HTTP layer in tests/api_regression.rs, where the
// request boundary that enforces it actually lives.

#[tokio::test]
async fn invalid_event_reports_distinct_ingestion_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = LogStore::open(dir.path()).unwrap();
    let hub = FanoutHub::new();
    let settings = default_settings();

    let mut bad = event(
        "e1",
        "cam_A",
        "z1",
        Utc::now(),
        "person_detected",
        0.6,
        3,
        None,
        Metadata::new(),
    );
    bad.confidence = 3.0;
    let result = ingest_event(bad, &store, &hub, &settings, &DisabledLlmClient).await;
    assert!(matches!(result, Err(IngestionError::InvalidEvent(_))));
}
