//! A single append-only JSONL file with single-writer-per-file discipline.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use tokio::sync::Mutex;

use super::error::StorageError;

/// An append-only JSONL file. Writers serialize through an internal mutex;
/// a write is considered durable only once the OS-level append call
/// returns success.
pub struct JsonlLog {
    path: PathBuf,
    writer: Mutex<File>,
}

impl JsonlLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::Unavailable(format!("{}: {e}", path.display())))?;
        Ok(Self {
            path,
            writer: Mutex::new(file),
        })
    }

    /// Appends one JSON-serializable record as a single line. The write
    /// completes only after the append and flush both return success.
    pub async fn append_line(&self, line: &str) -> Result<(), StorageError> {
        let mut guard = self.writer.lock().await;
        writeln!(guard, "{line}")
            .and_then(|()| guard.flush())
            .map_err(|e| StorageError::Unavailable(format!("{}: {e}", self.path.display())))
    }

    /// Scans every line in file order. Malformed lines surface as
    /// `StorageError::Corrupt` with their line number; callers decide
    /// whether to abort or skip.
    pub fn scan_lines(&self) -> Result<Vec<String>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path)
            .map_err(|e| StorageError::Unavailable(format!("{}: {e}", self.path.display())))?;
        let reader = BufReader::new(file);
        reader
            .lines()
            .filter(|l| l.as_ref().map(|s| !s.trim().is_empty()).unwrap_or(true))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::Unavailable(format!("{}: {e}", self.path.display())))
    }
}
