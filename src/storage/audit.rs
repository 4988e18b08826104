//! `audit.jsonl` — append-only record of auth and decision events.

use std::path::Path;

use chrono::Utc;
use serde_json::Value;

use crate::types::{AuditRecord, StoredRecord};

use super::error::StorageError;
use super::log_file::JsonlLog;

pub struct AuditStore {
    log: JsonlLog,
}

impl AuditStore {
    pub fn open(data_dir: &Path) -> Result<Self, StorageError> {
        Ok(Self {
            log: JsonlLog::open(data_dir.join("audit.jsonl"))?,
        })
    }

    pub async fn record(
        &self,
        actor_username: impl Into<String>,
        action: impl Into<String>,
        target_id: impl Into<String>,
        detail: Value,
    ) -> Result<(), StorageError> {
        let payload = AuditRecord {
            actor_username: actor_username.into(),
            action: action.into(),
            target_id: target_id.into(),
            ts: Utc::now(),
            detail,
        };
        let record = StoredRecord::Audit {
            record_ts: Utc::now(),
            payload,
        };
        let line = serde_json::to_string(&record)
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        self.log.append_line(&line).await
    }

    pub fn all(&self) -> Result<Vec<AuditRecord>, StorageError> {
        let mut out = Vec::new();
        for line in self.log.scan_lines()? {
            if let Ok(StoredRecord::Audit { payload, .. }) = serde_json::from_str(&line) {
                out.push(payload);
            }
        }
        Ok(out)
    }
}
