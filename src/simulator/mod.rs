//! Event Simulator — feeds schema-valid `CameraEvent`s through the same
//! ingestion function HTTP uses, either as a live generator or by
//! replaying a JSONL blob.
//!
//! Deterministic: each run owns an isolated `StdRng` seeded from the
//! caller-supplied seed, so the same seed + scenario + rate (and an
//! injected clock) reproduce an identical event stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::hub::FanoutHub;
use crate::ingestion::ingest_event;
use crate::llm::LlmClient;
use crate::storage::LogStore;
use crate::supervisor::Clock;
use crate::types::{CameraEvent, Metadata, MetadataValue};

const MIN_RATE_PER_MINUTE: f64 = 0.1;
const MAX_RATE_PER_MINUTE: f64 = 120.0;
const CAMERAS: &[(&str, &str)] = &[
    ("cam_A", "z1"),
    ("cam_B", "z1"),
    ("cam_C", "z2"),
    ("cam_D", "z3"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioPreset {
    QuietShift,
    NormalDay,
    BusyEvening,
    SecurityIncident,
    MixedEvents,
}

impl ScenarioPreset {
    /// Weighted `(event_type, weight)` distribution for this scenario.
    fn weighted_event_types(self) -> &'static [(&'static str, u32)] {
        match self {
            ScenarioPreset::QuietShift => &[("person_detected", 8), ("vehicle_detected", 2)],
            ScenarioPreset::NormalDay => &[
                ("person_detected", 6),
                ("vehicle_detected", 3),
                ("loitering", 1),
            ],
            ScenarioPreset::BusyEvening => &[
                ("person_detected", 5),
                ("vehicle_detected", 3),
                ("loitering", 2),
                ("door_forced", 1),
            ],
            ScenarioPreset::SecurityIncident => &[
                ("loitering", 3),
                ("door_forced", 3),
                ("watchlist_match", 2),
                ("plate_mismatch", 2),
                ("red_light", 1),
            ],
            ScenarioPreset::MixedEvents => &[
                ("person_detected", 4),
                ("vehicle_detected", 3),
                ("loitering", 2),
                ("door_forced", 1),
                ("watchlist_match", 1),
                ("plate_mismatch", 1),
                ("red_light", 1),
            ],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    #[error("simulator is already running")]
    AlreadyRunning,
    #[error("simulator is not running")]
    NotRunning,
    #[error("rate {0} events/min is outside [{MIN_RATE_PER_MINUTE}, {MAX_RATE_PER_MINUTE}]")]
    RateOutOfRange(f64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorParams {
    pub scenario: ScenarioPreset,
    pub rate_per_minute: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulatorStatus {
    pub running: bool,
    pub scenario: Option<ScenarioPreset>,
    pub rate_per_minute: Option<f64>,
    pub events_emitted: u64,
    pub events_dropped: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub accepted: usize,
    pub errors: Vec<String>,
}

struct RunningTask {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// The singleton simulator. Only one generator run may be active at a
/// time; starting while running is rejected rather than queued.
pub struct Simulator {
    task: Mutex<Option<RunningTask>>,
    events_emitted: Arc<AtomicU64>,
    events_dropped: Arc<AtomicU64>,
    current: Mutex<Option<SimulatorParams>>,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    pub fn new() -> Self {
        Self {
            task: Mutex::new(None),
            events_emitted: Arc::new(AtomicU64::new(0)),
            events_dropped: Arc::new(AtomicU64::new(0)),
            current: Mutex::new(None),
        }
    }

    pub async fn status(&self) -> SimulatorStatus {
        let current = self.current.lock().await.clone();
        SimulatorStatus {
            running: self.task.lock().await.is_some(),
            scenario: current.as_ref().map(|p| p.scenario),
            rate_per_minute: current.as_ref().map(|p| p.rate_per_minute),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
        }
    }

    pub async fn start(
        &self,
        params: SimulatorParams,
        store: Arc<LogStore>,
        hub: Arc<FanoutHub>,
        settings: Arc<Settings>,
        llm: Arc<dyn LlmClient>,
        clock: Arc<dyn Clock>,
    ) -> Result<(), SimulatorError> {
        if !(MIN_RATE_PER_MINUTE..=MAX_RATE_PER_MINUTE).contains(&params.rate_per_minute) {
            return Err(SimulatorError::RateOutOfRange(params.rate_per_minute));
        }

        let mut task = self.task.lock().await;
        if task.is_some() {
            return Err(SimulatorError::AlreadyRunning);
        }

        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let emitted = self.events_emitted.clone();
        let dropped = self.events_dropped.clone();
        let interval = std::time::Duration::from_secs_f64(60.0 / params.rate_per_minute);
        let scenario = params.scenario;
        let seed = params.seed;

        let handle = tokio::spawn(async move {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = loop_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let event = generate_event(&mut rng, scenario, clock.as_ref());
                        match ingest_event(event, &store, &hub, &settings, llm.as_ref()).await {
                            Ok(_) => { emitted.fetch_add(1, Ordering::Relaxed); }
                            Err(_) => { dropped.fetch_add(1, Ordering::Relaxed); }
                        }
                    }
                }
            }
        });

        *task = Some(RunningTask { handle, cancel });
        *self.current.lock().await = Some(params);
        Ok(())
    }

    /// Stops the running generator, draining the in-flight tick before
    /// returning.
    pub async fn stop(&self) -> Result<(), SimulatorError> {
        let running = self.task.lock().await.take();
        match running {
            Some(running) => {
                running.cancel.cancel();
                let _ = running.handle.await;
                *self.current.lock().await = None;
                Ok(())
            }
            None => Err(SimulatorError::NotRunning),
        }
    }

    /// Parses `blob` as newline-delimited `CameraEvent` JSON and ingests
    /// each valid line in file order. Malformed lines are collected into
    /// `errors[]`; valid lines still proceed.
    pub async fn replay(
        &self,
        blob: &str,
        store: &LogStore,
        hub: &FanoutHub,
        settings: &Settings,
        llm: &dyn LlmClient,
    ) -> ReplayReport {
        let mut accepted = 0;
        let mut errors = Vec::new();
        for (line_no, line) in blob.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<CameraEvent>(line) {
                Ok(event) => match ingest_event(event, store, hub, settings, llm).await {
                    Ok(_) => accepted += 1,
                    Err(e) => errors.push(format!("line {}: {e}", line_no + 1)),
                },
                Err(e) => errors.push(format!("line {}: {e}", line_no + 1)),
            }
        }
        ReplayReport { accepted, errors }
    }
}

fn generate_event(rng: &mut StdRng, scenario: ScenarioPreset, clock: &dyn Clock) -> CameraEvent {
    let weighted = scenario.weighted_event_types();
    let weights: Vec<u32> = weighted.iter().map(|(_, w)| *w).collect();
    let index = WeightedIndex::new(&weights).expect("scenario weight table is non-empty");
    let (event_type, _) = weighted[index.sample(rng)];
    let (camera_id, zone_id) = CAMERAS[rng.gen_range(0..CAMERAS.len())];

    let mut metadata = Metadata::new();
    let severity = match event_type {
        "watchlist_match" | "door_forced" | "red_light" => rng.gen_range(3..=5),
        "plate_mismatch" | "loitering" => rng.gen_range(2..=4),
        _ => rng.gen_range(1..=3),
    };
    if event_type == "watchlist_match" {
        metadata.insert("watchlist_match".to_string(), MetadataValue::Bool(true));
    }

    CameraEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        camera_id: camera_id.to_string(),
        zone_id: zone_id.to_string(),
        ts: clock.now(),
        event_type: event_type.to_string(),
        confidence: rng.gen_range(0.5..=0.99),
        severity,
        clip_url: Some(format!("https://evidence.local/{}.mp4", uuid::Uuid::new_v4())),
        snapshot_url: None,
        metadata,
    }
}
