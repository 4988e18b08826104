//! `events.jsonl` — one line per accepted `CameraEvent`.

use std::collections::HashSet;
use std::path::Path;
use std::sync::RwLock;

use chrono::Utc;

use crate::types::{CameraEvent, StoredRecord};

use super::error::StorageError;
use super::log_file::JsonlLog;

pub struct EventStore {
    log: JsonlLog,
    /// Event ids already persisted, for the idempotence guarantee in
    /// spec.md §8 property 8: replaying `event_id` twice must not
    /// double-append.
    seen: RwLock<HashSet<String>>,
}

impl EventStore {
    pub fn open(data_dir: &Path) -> Result<Self, StorageError> {
        let log = JsonlLog::open(data_dir.join("events.jsonl"))?;
        let mut seen = HashSet::new();
        for line in log.scan_lines()? {
            if let Ok(StoredRecord::Event { payload, .. }) = serde_json::from_str(&line) {
                seen.insert(payload.event_id);
            }
        }
        Ok(Self {
            log,
            seen: RwLock::new(seen),
        })
    }

    pub fn contains(&self, event_id: &str) -> bool {
        self.seen.read().expect("event-seen lock poisoned").contains(event_id)
    }

    /// Appends the event unless it was already stored. Returns `true` if a
    /// new line was written.
    pub async fn append_if_new(&self, event: &CameraEvent) -> Result<bool, StorageError> {
        if self.contains(&event.event_id) {
            return Ok(false);
        }
        let record = StoredRecord::Event {
            record_ts: Utc::now(),
            payload: event.clone(),
        };
        let line = serde_json::to_string(&record)
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        self.log.append_line(&line).await?;
        self.seen
            .write()
            .expect("event-seen lock poisoned")
            .insert(event.event_id.clone());
        Ok(true)
    }
}
