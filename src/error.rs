use std::path::PathBuf;
use thiserror::Error;

use crate::fetch::FetchError;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Network error: {0}")]
    Network(#[from] FetchError),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Stored table {} is unreadable: {reason}", path.display())]
    StorageCorrupt { path: PathBuf, reason: String },

    #[error("Malformed filter fragment '{fragment}': {reason}")]
    QueryMalformed { fragment: String, reason: String },

    #[error("Source '{source_name}' has no usable data: {cause}")]
    Ingestion {
        source_name: String,
        #[source]
        cause: Box<ProcessingError>,
    },

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Failure taxonomy used for retry and fallback decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NetworkTimeout,
    NetworkOther,
    Extraction,
    Schema,
    StorageCorrupt,
    QueryMalformed,
    Other,
}

impl ProcessingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessingError::Network(FetchError::Timeout { .. }) => ErrorKind::NetworkTimeout,
            ProcessingError::Network(_) => ErrorKind::NetworkOther,
            ProcessingError::Extraction(_) => ErrorKind::Extraction,
            ProcessingError::Schema(_) => ErrorKind::Schema,
            ProcessingError::StorageCorrupt { .. } => ErrorKind::StorageCorrupt,
            ProcessingError::QueryMalformed { .. } => ErrorKind::QueryMalformed,
            ProcessingError::Ingestion { cause, .. } => cause.kind(),
            _ => ErrorKind::Other,
        }
    }

    /// Network and extraction failures may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NetworkTimeout | ErrorKind::NetworkOther | ErrorKind::Extraction
        )
    }

    pub(crate) fn malformed(fragment: &str, reason: impl Into<String>) -> Self {
        ProcessingError::QueryMalformed {
            fragment: fragment.to_string(),
            reason: reason.into(),
        }
    }
}
