//! OpsContext - The main service for executing operations.
//!
//! The OpsContext holds configuration and the analyzer adapter, and drives a
//! flagging run: load both tables, join them, resolve and scan every
//! candidate file once, write the flagged table.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::analyzer::{Analyzer, CommandAnalyzer, ScanOutcome};
use crate::cache::{CacheKey, ScanCache};
use crate::config::Config;
use crate::error::OpsResult;
use crate::repo_url::parse_repo_url;
use crate::requests::FlagRequest;
use crate::resolve::{PathResolver, ResolvedPath};
use crate::responses::{FlagResponse, FlagSummary, UnscannedFile};
use crate::table::{
    read_table, require_table, write_flagged, FileChangeRecord, JoinedRow, PullRequestIndex,
    PullRequestRecord,
};

const FILE_CHANGE_TABLE: &str = "file change";
const PULL_REQUEST_TABLE: &str = "pull request";

/// The main operations context.
#[derive(Debug)]
pub struct OpsContext<A = CommandAnalyzer> {
    /// Configuration for operations.
    pub config: Config,

    resolver: PathResolver,
    analyzer: A,
}

impl OpsContext<CommandAnalyzer> {
    /// Create a new OpsContext that runs the configured analyzer binary.
    pub fn new(config: Config) -> Self {
        let analyzer = CommandAnalyzer::new(config.analyzer.clone());
        Self::with_analyzer(config, analyzer)
    }

    /// Create a new OpsContext with configuration loaded from disk.
    pub fn default_config() -> OpsResult<Self> {
        Ok(Self::new(Config::load()?))
    }
}

impl<A: Analyzer> OpsContext<A> {
    /// Create a new OpsContext with a custom analyzer.
    pub fn with_analyzer(config: Config, analyzer: A) -> Self {
        let resolver = PathResolver::new(&config.repos_dir);
        Self {
            config,
            resolver,
            analyzer,
        }
    }

    /// The analyzer adapter in use.
    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    /// Flag vulnerable files in a file change table.
    ///
    /// Fails only if a table cannot be read or the output cannot be written.
    /// Problems with individual rows leave that row unflagged.
    pub async fn flag(&self, request: FlagRequest) -> OpsResult<FlagResponse> {
        require_table(FILE_CHANGE_TABLE, &request.file_changes)?;
        require_table(PULL_REQUEST_TABLE, &request.pull_requests)?;

        info!(path = %request.file_changes.display(), "Loading file change table");
        let changes: Vec<FileChangeRecord> =
            read_table(FILE_CHANGE_TABLE, &request.file_changes)?;

        info!(path = %request.pull_requests.display(), "Loading pull request table");
        let pull_requests: Vec<PullRequestRecord> =
            read_table(PULL_REQUEST_TABLE, &request.pull_requests)?;

        let index = PullRequestIndex::build(pull_requests);
        let mut response = self.flag_rows(index.join(changes)).await;

        if !request.no_save {
            let written = write_flagged(&request.output, &response.rows)?;
            info!(path = %request.output.display(), records = written, "Saved flagged table");
            response.output_path = Some(request.output);
        }

        Ok(response)
    }

    /// Flag already-joined rows.
    pub async fn flag_rows(&self, mut rows: Vec<JoinedRow>) -> FlagResponse {
        let mut cache = ScanCache::new();
        let mut summary = FlagSummary {
            total_rows: rows.len(),
            ..FlagSummary::default()
        };

        info!(
            rows = rows.len(),
            repos_dir = %self.resolver.repos_dir().display(),
            "Scanning candidate source files"
        );

        // Files in first-scan order, with the native path the analyzer saw.
        let mut scanned: Vec<(CacheKey, PathBuf)> = Vec::new();

        for row in rows.iter_mut() {
            let Some(resolved) = self.locate(row, &mut summary) else {
                continue;
            };

            let key = CacheKey::from(&resolved);
            let outcome = cache
                .get_or_compute(key.clone(), || {
                    summary.scanned_files += 1;
                    scanned.push((key, resolved.path.clone()));
                    info!(
                        n = summary.scanned_files,
                        path = %resolved.path.display(),
                        "Scanning with analyzer"
                    );
                    self.analyzer.scan(&resolved.path)
                })
                .await;

            row.vulnerable = outcome.is_flagged();
        }

        let mut unscanned = Vec::new();
        for (key, path) in scanned {
            match cache.get(&key) {
                Some(ScanOutcome::Flagged { .. }) => summary.flagged_files += 1,
                Some(ScanOutcome::Unknown { reason }) => unscanned.push(UnscannedFile {
                    path,
                    reason: reason.clone(),
                }),
                Some(ScanOutcome::Clean) | None => {}
            }
        }
        unscanned.sort_by(|a, b| a.path.cmp(&b.path));
        summary.unscanned_files = unscanned.len();
        summary.flagged_rows = rows.iter().filter(|r| r.vulnerable).count();

        info!(
            total_rows = summary.total_rows,
            candidates = summary.candidates,
            scanned = summary.scanned_files,
            flagged = summary.flagged_files,
            unscanned = summary.unscanned_files,
            "Flagging complete"
        );

        FlagResponse {
            summary,
            unscanned,
            output_path: None,
            rows,
        }
    }

    /// Find the local file a candidate row refers to, counting why not.
    fn locate(&self, row: &JoinedRow, summary: &mut FlagSummary) -> Option<ResolvedPath> {
        let file = row.file()?;
        if !self.config.is_source_file(file) {
            return None;
        }
        summary.candidates += 1;

        let Some(url) = row.usable_repo_url() else {
            summary.missing_repo_url += 1;
            debug!(file, "No repository URL for row");
            return None;
        };

        let Some(slug) = parse_repo_url(Some(url)) else {
            summary.malformed_repo_url += 1;
            debug!(url, "Could not parse repository URL");
            return None;
        };

        let clone_root = self.resolver.clone_root(&slug);
        match self.resolver.resolve(&clone_root, file) {
            Some(resolved) if resolved.exists() => Some(resolved),
            _ => {
                summary.unresolved_files += 1;
                debug!(repo = %slug, file, "File not present in local clone");
                None
            }
        }
    }
}
