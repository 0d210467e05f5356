//! vulnflag Operations Layer
//!
//! Flags the changed files of pull-request commits that a static analyzer
//! reports findings for. The CLI is a thin shell over this crate.
//!
//! ## Architecture
//!
//! - **repo_url**: repository URL → `owner/repo`
//! - **resolve**: change path → file inside the local clone
//! - **analyzer**: one subprocess run → [`ScanOutcome`]
//! - **cache**: one analyzer run per distinct file per run
//! - **OpsContext**: joins the tables and drives the above per row
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vulnflag_ops::{Config, FlagRequest, OpsContext};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let request = FlagRequest::from_config(&config);
//!     let ctx = OpsContext::new(config);
//!
//!     let response = ctx.flag(request).await?;
//!
//!     println!("Flagged {} rows", response.summary.flagged_rows);
//!     Ok(())
//! }
//! ```

mod analyzer;
mod cache;
mod config;
mod context;
mod error;
mod repo_url;
mod requests;
mod resolve;
mod responses;
mod table;

// Re-export public API
pub use analyzer::{interpret_report, Analyzer, CommandAnalyzer, ScanOutcome, UnscannedReason};
pub use cache::{CacheKey, ScanCache};
pub use config::{AnalyzerConfig, Config, CONFIG_KEYS};
pub use context::OpsContext;
pub use error::{OpsError, OpsResult};
pub use repo_url::{parse_repo_url, RepoSlug};
pub use requests::*;
pub use responses::*;
pub use resolve::{PathResolver, ResolvedPath};
pub use table::{
    normalize_pr_id, read_table, write_flagged, FileChangeRecord, JoinedRow, PullRequestIndex,
    PullRequestRecord, OUTPUT_COLUMNS,
};
