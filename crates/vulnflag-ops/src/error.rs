//! Error types for the operations layer.
//!
//! Only run-level failures live here. Per-row and per-file problems
//! (unparseable URLs, missing local files, analyzer failures) never surface
//! as errors; they are logged, counted and folded into a negative flag.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for operations.
pub type OpsResult<T> = Result<T, OpsError>;

/// Errors that can occur during operations.
#[derive(Debug, Error)]
pub enum OpsError {
    /// A required input table does not exist.
    #[error("{table} table not found at {path}")]
    MissingInputTable { table: &'static str, path: PathBuf },

    /// Failed to read or write a CSV table.
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context.
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },
}

impl OpsError {
    /// Create a CSV error tied to the table it came from.
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    /// Whether this error was raised before any row was processed.
    pub fn is_preflight(&self) -> bool {
        matches!(self, Self::MissingInputTable { .. })
    }
}

impl From<anyhow::Error> for OpsError {
    fn from(err: anyhow::Error) -> Self {
        OpsError::WithContext {
            context: "Operation failed".to_string(),
            message: err.to_string(),
        }
    }
}
