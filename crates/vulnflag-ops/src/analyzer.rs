//! Static analyzer adapter.
//!
//! The analyzer is an opaque external program. It is run once per file and
//! its report is reduced to a [`ScanOutcome`]. Every way the invocation can go
//! wrong ends up as [`ScanOutcome::Unknown`]; nothing here returns an error.

use std::fmt;
use std::future::Future;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::AnalyzerConfig;

/// Result of scanning one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// The analyzer ran and reported nothing.
    Clean,
    /// The analyzer reported at least one finding.
    Flagged { findings: usize },
    /// The file could not be scanned.
    Unknown { reason: UnscannedReason },
}

impl ScanOutcome {
    /// Whether this outcome sets the vulnerability flag.
    pub fn is_flagged(&self) -> bool {
        matches!(self, Self::Flagged { .. })
    }

    /// Whether the analyzer failed to produce a verdict.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }

    fn unknown(reason: UnscannedReason) -> Self {
        Self::Unknown { reason }
    }
}

/// Why a file has no verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnscannedReason {
    /// The analyzer binary is not installed.
    AnalyzerUnavailable,
    /// The analyzer could not be started or waited on.
    SpawnFailed { message: String },
    /// Exit status other than 0 or 1; `None` when killed by a signal.
    ExitStatus { code: Option<i32> },
    /// Findings were signalled but stdout was empty.
    EmptyOutput,
    /// Stdout was not a usable JSON report.
    MalformedOutput { message: String },
    /// The invocation exceeded its time limit.
    TimedOut { secs: u64 },
}

impl fmt::Display for UnscannedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnalyzerUnavailable => write!(f, "analyzer not installed"),
            Self::SpawnFailed { message } => write!(f, "failed to run analyzer: {}", message),
            Self::ExitStatus { code: Some(code) } => write!(f, "analyzer exited with {}", code),
            Self::ExitStatus { code: None } => write!(f, "analyzer killed by signal"),
            Self::EmptyOutput => write!(f, "analyzer produced no output"),
            Self::MalformedOutput { message } => write!(f, "unparseable report: {}", message),
            Self::TimedOut { secs } => write!(f, "analyzer timed out after {}s", secs),
        }
    }
}

/// Something that can scan a single file.
pub trait Analyzer {
    /// Scan `path` and report what was found.
    fn scan(&self, path: &Path) -> impl Future<Output = ScanOutcome> + Send;
}

/// Runs the configured analyzer binary as a subprocess.
#[derive(Debug)]
pub struct CommandAnalyzer {
    config: AnalyzerConfig,
    unavailable_reported: AtomicBool,
}

impl CommandAnalyzer {
    /// Create an adapter for the given invocation settings.
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            config,
            unavailable_reported: AtomicBool::new(false),
        }
    }

    /// Invocation settings.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    fn report_unavailable(&self) {
        if !self.unavailable_reported.swap(true, Ordering::Relaxed) {
            warn!(
                program = %self.config.program,
                "Analyzer is not installed or not on PATH; files will be left unflagged. \
                 Install it with `pip install bandit` or point `analyzer` at the binary"
            );
        }
    }

    async fn run(&self, path: &Path) -> ScanOutcome {
        let mut command = Command::new(&self.config.program);
        command
            .args(&self.config.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a timeout also reaches anything the analyzer forks.
        #[cfg(unix)]
        command.process_group(0);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.report_unavailable();
                return ScanOutcome::unknown(UnscannedReason::AnalyzerUnavailable);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to start analyzer");
                return ScanOutcome::unknown(UnscannedReason::SpawnFailed {
                    message: e.to_string(),
                });
            }
        };

        let pid = child.id();
        let wait = child.wait_with_output();
        tokio::pin!(wait);

        let waited = match self.config.timeout() {
            Some(limit) => match tokio::time::timeout(limit, &mut wait).await {
                Ok(waited) => waited,
                Err(_) => {
                    // The child is still unreaped here, so its group id is valid.
                    kill_process_group(pid);
                    warn!(
                        path = %path.display(),
                        secs = self.config.timeout_secs,
                        "Analyzer timed out"
                    );
                    return ScanOutcome::unknown(UnscannedReason::TimedOut {
                        secs: self.config.timeout_secs,
                    });
                }
            },
            None => wait.await,
        };

        match waited {
            Ok(output) => {
                let outcome = interpret_report(
                    output.status,
                    &output.stdout,
                    &self.config.findings_key,
                );
                if let ScanOutcome::Unknown { reason } = &outcome {
                    warn!(
                        path = %path.display(),
                        reason = %reason,
                        stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                        "Analyzer error"
                    );
                }
                outcome
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to collect analyzer output");
                ScanOutcome::unknown(UnscannedReason::SpawnFailed {
                    message: e.to_string(),
                })
            }
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        debug!(pid, "Killing analyzer process group");
        unsafe {
            libc::killpg(pid as libc::pid_t, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

impl Analyzer for CommandAnalyzer {
    fn scan(&self, path: &Path) -> impl Future<Output = ScanOutcome> + Send {
        self.run(path)
    }
}

/// Reduce an analyzer exit status and stdout to an outcome.
///
/// Exit code 0 is clean without looking at stdout. Exit code 1 means the
/// report has to be read: the file is flagged only if the findings array is
/// non-empty. A report without the findings key counts as empty.
pub fn interpret_report(status: ExitStatus, stdout: &[u8], findings_key: &str) -> ScanOutcome {
    match status.code() {
        Some(0) => ScanOutcome::Clean,
        Some(1) => parse_findings(stdout, findings_key),
        code => ScanOutcome::unknown(UnscannedReason::ExitStatus { code }),
    }
}

fn parse_findings(stdout: &[u8], findings_key: &str) -> ScanOutcome {
    let text = String::from_utf8_lossy(stdout);
    if text.trim().is_empty() {
        return ScanOutcome::unknown(UnscannedReason::EmptyOutput);
    }

    let report: Value = match serde_json::from_str(&text) {
        Ok(report) => report,
        Err(e) => {
            return ScanOutcome::unknown(UnscannedReason::MalformedOutput {
                message: e.to_string(),
            })
        }
    };

    if !report.is_object() {
        return ScanOutcome::unknown(UnscannedReason::MalformedOutput {
            message: "report is not a JSON object".to_string(),
        });
    }

    let findings = match report.get(findings_key) {
        None | Some(Value::Null) => 0,
        Some(Value::Array(items)) => items.len(),
        Some(_) => {
            return ScanOutcome::unknown(UnscannedReason::MalformedOutput {
                message: format!("`{}` is not an array", findings_key),
            })
        }
    };

    debug!(findings, "Parsed analyzer report");
    if findings > 0 {
        ScanOutcome::Flagged { findings }
    } else {
        ScanOutcome::Clean
    }
}
