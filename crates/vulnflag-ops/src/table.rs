//! Input and output tables.
//!
//! Tables are CSV files with a header row. Columns are matched by name, extra
//! columns are ignored and missing ones read as absent. Values are carried as
//! text so that numeric columns round-trip unchanged.

use std::collections::HashMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{OpsError, OpsResult};

/// Columns of the flagged output table, in order.
pub const OUTPUT_COLUMNS: [&str; 10] = [
    "PRID",
    "PRSHA",
    "PRCOMMITMESSAGE",
    "PRFILE",
    "PRSTATUS",
    "PRADDS",
    "PRDELSS",
    "PRCHANGECOUNT",
    "PRDIFF",
    "VULNERABLEFILE",
];

/// One pull request. Only the columns the join needs are read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRecord {
    #[serde(rename = "ID", default)]
    pub id: Option<String>,

    #[serde(rename = "REPOURL", default)]
    pub repo_url: Option<String>,
}

/// One changed file within one commit of a pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChangeRecord {
    #[serde(rename = "PRID", default)]
    pub pr_id: Option<String>,

    #[serde(rename = "PRSHA", default)]
    pub sha: Option<String>,

    #[serde(rename = "PRCOMMITMESSAGE", default)]
    pub commit_message: Option<String>,

    #[serde(rename = "PRFILE", default)]
    pub file: Option<String>,

    #[serde(rename = "PRSTATUS", default)]
    pub status: Option<String>,

    #[serde(rename = "PRADDS", default)]
    pub additions: Option<String>,

    #[serde(rename = "PRDELSS", default)]
    pub deletions: Option<String>,

    #[serde(rename = "PRCHANGECOUNT", default)]
    pub change_count: Option<String>,

    #[serde(rename = "PRDIFF", default)]
    pub diff: Option<String>,
}

/// A file change joined with its repository URL and carrying the output flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRow {
    /// The input row, untouched.
    pub change: FileChangeRecord,
    /// Repository URL of the owning pull request, if the join matched.
    pub repo_url: Option<String>,
    /// Whether the analyzer reported findings for this file.
    pub vulnerable: bool,
}

impl JoinedRow {
    /// Change path if present and not blank.
    pub fn file(&self) -> Option<&str> {
        self.change
            .file
            .as_deref()
            .filter(|f| !f.trim().is_empty())
    }

    /// Repository URL if present and not blank.
    pub fn usable_repo_url(&self) -> Option<&str> {
        self.repo_url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

#[derive(Serialize)]
struct OutputRow<'a> {
    pr_id: &'a Option<String>,
    sha: &'a Option<String>,
    commit_message: &'a Option<String>,
    file: &'a Option<String>,
    status: &'a Option<String>,
    additions: &'a Option<String>,
    deletions: &'a Option<String>,
    change_count: &'a Option<String>,
    diff: &'a Option<String>,
    vulnerable: u8,
}

impl<'a> From<&'a JoinedRow> for OutputRow<'a> {
    fn from(row: &'a JoinedRow) -> Self {
        let c = &row.change;
        Self {
            pr_id: &c.pr_id,
            sha: &c.sha,
            commit_message: &c.commit_message,
            file: &c.file,
            status: &c.status,
            additions: &c.additions,
            deletions: &c.deletions,
            change_count: &c.change_count,
            diff: &c.diff,
            vulnerable: u8::from(row.vulnerable),
        }
    }
}

/// Canonical text form of a pull request identifier.
///
/// Identifiers that went through a float column (`"123.0"`) compare equal to
/// their integer form (`"123"`). Blank identifiers are absent.
pub fn normalize_pr_id(raw: &str) -> Option<String> {
    let id = raw.trim();
    if id.is_empty() {
        return None;
    }

    if let Some((int, frac)) = id.split_once('.') {
        let digits = int.strip_prefix('-').unwrap_or(int);
        let integral = !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
            && !frac.is_empty()
            && frac.bytes().all(|b| b == b'0');
        if integral {
            return Some(int.to_string());
        }
    }

    Some(id.to_string())
}

/// Lookup from normalized pull request identifier to repository URL.
#[derive(Debug, Default)]
pub struct PullRequestIndex {
    urls: HashMap<String, Option<String>>,
}

impl PullRequestIndex {
    /// Index pull requests by identifier. The first record for an identifier
    /// wins.
    pub fn build(records: Vec<PullRequestRecord>) -> Self {
        let mut urls = HashMap::with_capacity(records.len());
        let mut duplicates = 0usize;

        for record in records {
            let Some(id) = record.id.as_deref().and_then(normalize_pr_id) else {
                continue;
            };
            if urls.contains_key(&id) {
                duplicates += 1;
                continue;
            }
            urls.insert(id, record.repo_url);
        }

        if duplicates > 0 {
            warn!(duplicates, "Duplicate pull request identifiers; keeping first");
        }

        Self { urls }
    }

    /// Repository URL for a pull request identifier, if any.
    pub fn repo_url(&self, pr_id: Option<&str>) -> Option<&str> {
        let id = normalize_pr_id(pr_id?)?;
        self.urls.get(&id)?.as_deref()
    }

    /// Number of indexed pull requests.
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Whether no pull requests were indexed.
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Left-join file changes against this index. Every change yields
    /// exactly one row, flagged `false`.
    pub fn join(&self, changes: Vec<FileChangeRecord>) -> Vec<JoinedRow> {
        changes
            .into_iter()
            .map(|change| {
                let repo_url = self.repo_url(change.pr_id.as_deref()).map(str::to_string);
                JoinedRow {
                    change,
                    repo_url,
                    vulnerable: false,
                }
            })
            .collect()
    }
}

/// Fail unless `path` exists.
pub fn require_table(table: &'static str, path: &Path) -> OpsResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(OpsError::MissingInputTable {
            table,
            path: path.to_path_buf(),
        })
    }
}

/// Read every record of a CSV table.
pub fn read_table<T: DeserializeOwned>(table: &'static str, path: &Path) -> OpsResult<Vec<T>> {
    require_table(table, path)?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| OpsError::csv(path, e))?;

    let records = reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| OpsError::csv(path, e))?;

    debug!(table, path = %path.display(), records = records.len(), "Loaded table");
    Ok(records)
}

/// Write the flagged table, creating the parent directory if needed.
/// Returns the number of records written.
pub fn write_flagged(path: &Path, rows: &[JoinedRow]) -> OpsResult<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| OpsError::csv(path, e))?;

    writer
        .write_record(OUTPUT_COLUMNS)
        .map_err(|e| OpsError::csv(path, e))?;
    for row in rows {
        writer
            .serialize(OutputRow::from(row))
            .map_err(|e| OpsError::csv(path, e))?;
    }
    writer.flush()?;

    Ok(rows.len())
}
