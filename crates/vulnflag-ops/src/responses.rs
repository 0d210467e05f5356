//! Response DTOs for operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::analyzer::UnscannedReason;
use crate::table::JoinedRow;

/// Counters describing one flagging run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSummary {
    /// Rows in the file change table.
    pub total_rows: usize,

    /// Rows whose path has a source extension.
    pub candidates: usize,

    /// Candidates whose pull request had no repository URL.
    pub missing_repo_url: usize,

    /// Candidates whose repository URL could not be parsed.
    pub malformed_repo_url: usize,

    /// Candidates with no matching file in the local clone.
    pub unresolved_files: usize,

    /// Distinct files handed to the analyzer.
    pub scanned_files: usize,

    /// Distinct files the analyzer reported findings for.
    pub flagged_files: usize,

    /// Distinct files the analyzer could not produce a verdict for.
    pub unscanned_files: usize,

    /// Rows whose flag ended up set.
    pub flagged_rows: usize,
}

/// A file that was handed to the analyzer but has no verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnscannedFile {
    /// Path the analyzer was run on.
    pub path: PathBuf,

    /// What went wrong.
    pub reason: UnscannedReason,
}

/// Response from a flag operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlagResponse {
    /// Run counters.
    pub summary: FlagSummary,

    /// Files left without a verdict, sorted by path. Their rows are unflagged.
    #[serde(default)]
    pub unscanned: Vec<UnscannedFile>,

    /// Where the flagged table was written, unless saving was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Joined rows in input order with their flags set.
    #[serde(skip)]
    pub rows: Vec<JoinedRow>,
}

impl FlagResponse {
    /// Output flags in row order as 0/1.
    pub fn flags(&self) -> Vec<u8> {
        self.rows.iter().map(|r| u8::from(r.vulnerable)).collect()
    }

    /// Number of records in the output table.
    pub fn record_count(&self) -> usize {
        self.rows.len()
    }
}
