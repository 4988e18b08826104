//! `incidents.jsonl` — "latest version wins" append-only incident records.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use chrono::Utc;

use crate::types::{Incident, IncidentMetadata, StoredRecord};

use super::error::StorageError;
use super::log_file::JsonlLog;

struct Indexed {
    incident: Incident,
    metadata: IncidentMetadata,
    version: u64,
}

/// Holds the append-only `incidents.jsonl` file plus an in-memory index of
/// the highest version observed per `incident_id`, built by scanning the
/// file forward on startup and kept in lock-step with every append.
pub struct IncidentStore {
    log: JsonlLog,
    index: RwLock<HashMap<String, Indexed>>,
}

impl IncidentStore {
    pub fn open(data_dir: &Path) -> Result<Self, StorageError> {
        let log = JsonlLog::open(data_dir.join("incidents.jsonl"))?;
        let mut index: HashMap<String, Indexed> = HashMap::new();
        for line in log.scan_lines()? {
            if let Ok(StoredRecord::Incident {
                version,
                payload,
                metadata,
                ..
            }) = serde_json::from_str(&line)
            {
                let entry = index.entry(payload.incident_id.clone());
                match entry {
                    std::collections::hash_map::Entry::Occupied(mut o) => {
                        if version >= o.get().version {
                            o.insert(Indexed {
                                incident: payload,
                                metadata,
                                version,
                            });
                        }
                    }
                    std::collections::hash_map::Entry::Vacant(v) => {
                        v.insert(Indexed {
                            incident: payload,
                            metadata,
                            version,
                        });
                    }
                }
            }
        }
        Ok(Self {
            log,
            index: RwLock::new(index),
        })
    }

    /// Appends a new version for `incident`, carrying `metadata` forward.
    /// Returns the version number that was written.
    pub async fn append(
        &self,
        incident: Incident,
        metadata: IncidentMetadata,
    ) -> Result<u64, StorageError> {
        let version = {
            let index = self.index.read().expect("incident index lock poisoned");
            index
                .get(&incident.incident_id)
                .map(|i| i.version + 1)
                .unwrap_or(1)
        };

        let record = StoredRecord::Incident {
            record_ts: Utc::now(),
            version,
            payload: incident.clone(),
            metadata: metadata.clone(),
        };
        let line = serde_json::to_string(&record)
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        self.log.append_line(&line).await?;

        self.index.write().expect("incident index lock poisoned").insert(
            incident.incident_id.clone(),
            Indexed {
                incident,
                metadata,
                version,
            },
        );
        Ok(version)
    }

    pub fn get(&self, incident_id: &str) -> Option<(Incident, IncidentMetadata, u64)> {
        let index = self.index.read().expect("incident index lock poisoned");
        index
            .get(incident_id)
            .map(|i| (i.incident.clone(), i.metadata.clone(), i.version))
    }

    /// Lists incidents matching an optional status and `since` filter,
    /// most-recently-updated first, truncated to `limit`.
    pub fn list(
        &self,
        status: Option<crate::types::IncidentStatus>,
        since: Option<chrono::DateTime<Utc>>,
        limit: usize,
    ) -> Vec<(Incident, IncidentMetadata, u64)> {
        let index = self.index.read().expect("incident index lock poisoned");
        let mut items: Vec<_> = index
            .values()
            .filter(|i| status.map(|s| i.incident.status == s).unwrap_or(true))
            .filter(|i| since.map(|s| i.incident.updated_ts >= s).unwrap_or(true))
            .map(|i| (i.incident.clone(), i.metadata.clone(), i.version))
            .collect();
        items.sort_by_key(|item| std::cmp::Reverse(item.0.updated_ts));
        items.truncate(limit);
        items
    }

    /// Snapshot of all incidents indexed by `(camera_id, zone_id)`, used by
    /// the Grouper to find merge/dedup candidates.
    pub fn by_camera_zone(&self, camera_id: &str, zone_id: &str) -> Vec<Incident> {
        let index = self.index.read().expect("incident index lock poisoned");
        index
            .values()
            .map(|i| &i.incident)
            .filter(|i| i.camera_id == camera_id && i.zone_id == zone_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AlertMessage, CameraEvent, IncidentPlan, Metadata, RecommendedNextStep, ValidationResult,
    };

    fn sample_incident(id: &str) -> (Incident, IncidentMetadata) {
        let now = Utc::now();
        let event = CameraEvent {
            event_id: "e1".into(),
            camera_id: "cam_A".into(),
            zone_id: "z1".into(),
            ts: now,
            event_type: "person_detected".into(),
            confidence: 0.6,
            severity: 3,
            clip_url: None,
            snapshot_url: None,
            metadata: Metadata::new(),
        };
        let incident = Incident::new(id.into(), event, now);
        let metadata = IncidentMetadata {
            plan: IncidentPlan {
                summary_1line: "1 event(s)".into(),
                severity: 3,
                confidence: 0.6,
                recommended_next_step: RecommendedNextStep::Monitor,
                requires_human_approval: false,
                action_risk_flags: vec![],
                evidence_refs: vec![],
                uncertainty_notes: String::new(),
            },
            alert: AlertMessage {
                title: "Incident".into(),
                body: "body".into(),
                operator_actions: vec![],
                evidence_refs: vec![],
                disclaimer: None,
            },
            validation: ValidationResult::passed(),
        };
        (incident, metadata)
    }

    #[tokio::test]
    async fn append_increments_version_and_reload_keeps_latest() {
        let dir = tempfile::tempdir().unwrap();
        let store = IncidentStore::open(dir.path()).unwrap();
        let (incident, metadata) = sample_incident("i1");
        assert_eq!(store.append(incident.clone(), metadata.clone()).await.unwrap(), 1);
        assert_eq!(store.append(incident, metadata).await.unwrap(), 2);

        let reopened = IncidentStore::open(dir.path()).unwrap();
        let (_, _, version) = reopened.get("i1").unwrap();
        assert_eq!(version, 2);
    }

    #[tokio::test]
    async fn metadata_is_preserved_across_status_only_update() {
        let dir = tempfile::tempdir().unwrap();
        let store = IncidentStore::open(dir.path()).unwrap();
        let (mut incident, metadata) = sample_incident("i1");
        store.append(incident.clone(), metadata.clone()).await.unwrap();

        incident.status = crate::types::IncidentStatus::Escalated;
        store.append(incident, metadata.clone()).await.unwrap();

        let (_, stored_metadata, _) = store.get("i1").unwrap();
        assert_eq!(stored_metadata.plan.summary_1line, metadata.plan.summary_1line);
    }
}
