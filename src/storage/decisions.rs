//! `decisions.jsonl` — append-only operator decision records.

use std::path::Path;

use chrono::Utc;

use crate::types::{Decision, StoredRecord};

use super::error::StorageError;
use super::log_file::JsonlLog;

pub struct DecisionStore {
    log: JsonlLog,
}

impl DecisionStore {
    pub fn open(data_dir: &Path) -> Result<Self, StorageError> {
        Ok(Self {
            log: JsonlLog::open(data_dir.join("decisions.jsonl"))?,
        })
    }

    pub async fn append(&self, decision: Decision) -> Result<(), StorageError> {
        let record = StoredRecord::Decision {
            record_ts: Utc::now(),
            payload: decision,
        };
        let line = serde_json::to_string(&record)
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        self.log.append_line(&line).await
    }

    /// All decisions, in file order. Used by the shift report; small
    /// enough to materialize fully given a realistic operating window.
    pub fn all(&self) -> Result<Vec<Decision>, StorageError> {
        let mut out = Vec::new();
        for line in self.log.scan_lines()? {
            if let Ok(StoredRecord::Decision { payload, .. }) = serde_json::from_str(&line) {
                out.push(payload);
            }
        }
        Ok(out)
    }
}
