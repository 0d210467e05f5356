//! Request DTOs for operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Request to flag vulnerable files in a file change table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagRequest {
    /// Per-commit file change table.
    pub file_changes: PathBuf,

    /// Pull request table carrying repository URLs.
    pub pull_requests: PathBuf,

    /// Where to write the flagged table.
    pub output: PathBuf,

    /// Whether to skip writing the output table.
    #[serde(default)]
    pub no_save: bool,
}

impl FlagRequest {
    /// Create a request for explicit table paths.
    pub fn new(
        file_changes: impl Into<PathBuf>,
        pull_requests: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            file_changes: file_changes.into(),
            pull_requests: pull_requests.into(),
            output: output.into(),
            no_save: false,
        }
    }

    /// Create a request using the table paths from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.file_changes_path,
            &config.pull_requests_path,
            &config.output_path,
        )
    }

    /// Compute flags without writing the output table.
    pub fn without_save(mut self) -> Self {
        self.no_save = true;
        self
    }
}
