//! Storage error kinds.

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage_unavailable: {0}")]
    Unavailable(String),
    #[error("record {0} not found")]
    NotFound(String),
    #[error("corrupt record at {file}:{line}: {source}")]
    Corrupt {
        file: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}
