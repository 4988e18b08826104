//! Append-only Log Store.
//!
//! Four independent JSONL files (`events`, `incidents`, `decisions`,
//! `audit`), each with single-writer-per-file discipline and a
//! latest-version-wins in-memory index built by scanning forward on
//! startup. No in-place edits; every "update" is a new line.

mod audit;
mod decisions;
mod error;
mod events;
mod incidents;
mod log_file;

pub use audit::AuditStore;
pub use decisions::DecisionStore;
pub use error::StorageError;
pub use events::EventStore;
pub use incidents::IncidentStore;

use std::path::{Path, PathBuf};

/// Bundles the four JSONL stores behind one handle, matching the
/// directory layout in spec.md §6.3.
pub struct LogStore {
    pub data_dir: PathBuf,
    pub events: EventStore,
    pub incidents: IncidentStore,
    pub decisions: DecisionStore,
    pub audit: AuditStore,
}

impl LogStore {
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)
            .map_err(|e| StorageError::Unavailable(format!("{}: {e}", data_dir.display())))?;
        Ok(Self {
            events: EventStore::open(&data_dir)?,
            incidents: IncidentStore::open(&data_dir)?,
            decisions: DecisionStore::open(&data_dir)?,
            audit: AuditStore::open(&data_dir)?,
            data_dir,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
