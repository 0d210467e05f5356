//! Configuration for the operations layer.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{OpsError, OpsResult};

/// Configuration for flagging runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base directory holding local clones as `<owner>/<repo>`.
    #[serde(default = "default_repos_dir")]
    pub repos_dir: PathBuf,

    /// External static analyzer invocation.
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// File extensions (without the dot) that are eligible for scanning.
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,

    /// Per-commit file change table.
    #[serde(default = "default_file_changes_path")]
    pub file_changes_path: PathBuf,

    /// Pull request table carrying repository URLs.
    #[serde(default = "default_pull_requests_path")]
    pub pull_requests_path: PathBuf,

    /// Where the flagged table is written.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

/// How the static analyzer is invoked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Binary name or path.
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the target file path.
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Top-level key of the findings array in the JSON report.
    #[serde(default = "default_findings_key")]
    pub findings_key: String,

    /// Seconds before a single invocation is killed. Zero disables the limit.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_repos_dir() -> PathBuf {
    PathBuf::from("repos")
}

fn default_source_extensions() -> Vec<String> {
    vec!["py".to_string()]
}

fn default_file_changes_path() -> PathBuf {
    PathBuf::from("output").join("task4_pr_commit_details.csv")
}

fn default_pull_requests_path() -> PathBuf {
    PathBuf::from("output").join("task1_pull_requests.csv")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("output").join("task7_pr_commit_vulnerabilities.csv")
}

fn default_program() -> String {
    "bandit".to_string()
}

fn default_args() -> Vec<String> {
    vec!["-f".to_string(), "json".to_string(), "-q".to_string()]
}

fn default_findings_key() -> String {
    "results".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            findings_key: default_findings_key(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AnalyzerConfig {
    /// Invocation time limit, if any.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repos_dir: default_repos_dir(),
            analyzer: AnalyzerConfig::default(),
            source_extensions: default_source_extensions(),
            file_changes_path: default_file_changes_path(),
            pull_requests_path: default_pull_requests_path(),
            output_path: default_output_path(),
        }
    }
}

/// Keys accepted by [`Config::get`] and [`Config::set`].
pub const CONFIG_KEYS: &[&str] = &[
    "repos-dir",
    "analyzer",
    "analyzer-args",
    "findings-key",
    "timeout",
    "extensions",
    "file-changes",
    "pull-requests",
    "output",
];

impl Config {
    /// Load configuration from disk with environment overrides.
    pub fn load() -> OpsResult<Self> {
        Self::load_file()?.with_env_overrides()
    }

    /// Load only what is stored in the config file, falling back to defaults.
    pub fn load_file() -> OpsResult<Self> {
        match Self::config_file_path() {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)?;
                Ok(serde_json::from_str(&contents)?)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Apply `VULNFLAG_*` environment variables on top of this configuration.
    pub fn with_env_overrides(mut self) -> OpsResult<Self> {
        if let Ok(dir) = std::env::var("VULNFLAG_REPOS_DIR") {
            self.repos_dir = PathBuf::from(dir);
        }
        if let Ok(program) = std::env::var("VULNFLAG_ANALYZER") {
            self.analyzer.program = program;
        }
        if let Ok(timeout) = std::env::var("VULNFLAG_TIMEOUT_SECS") {
            self.set("timeout", &timeout)?;
        }
        if let Ok(extensions) = std::env::var("VULNFLAG_EXTENSIONS") {
            self.set("extensions", &extensions)?;
        }
        Ok(self)
    }

    /// Save configuration to disk.
    pub fn save(&self) -> OpsResult<()> {
        if let Some(path) = Self::config_file_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(self)?;
            std::fs::write(&path, contents)?;
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_file_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "vulnflag", "vulnflag")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Whether a path ends in one of the configured source extensions.
    ///
    /// Comparison is case-insensitive and works on the raw change path, so
    /// backslash-separated paths are handled too.
    pub fn is_source_file(&self, change_path: &str) -> bool {
        let lower = change_path.to_ascii_lowercase();
        self.source_extensions.iter().any(|ext| {
            let ext = ext.trim_start_matches('.').to_ascii_lowercase();
            !ext.is_empty()
                && lower
                    .strip_suffix(ext.as_str())
                    .is_some_and(|stem| stem.ends_with('.'))
        })
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "repos-dir" => Some(self.repos_dir.display().to_string()),
            "analyzer" => Some(self.analyzer.program.clone()),
            "analyzer-args" => Some(self.analyzer.args.join(" ")),
            "findings-key" => Some(self.analyzer.findings_key.clone()),
            "timeout" => Some(self.analyzer.timeout_secs.to_string()),
            "extensions" => Some(self.source_extensions.join(",")),
            "file-changes" => Some(self.file_changes_path.display().to_string()),
            "pull-requests" => Some(self.pull_requests_path.display().to_string()),
            "output" => Some(self.output_path.display().to_string()),
            _ => None,
        }
    }

    /// Set a configuration value by key.
    pub fn set(&mut self, key: &str, value: &str) -> OpsResult<()> {
        match key {
            "repos-dir" => self.repos_dir = PathBuf::from(value),
            "analyzer" => self.analyzer.program = value.to_string(),
            "analyzer-args" => {
                self.analyzer.args = value.split_whitespace().map(str::to_string).collect();
            }
            "findings-key" => self.analyzer.findings_key = value.to_string(),
            "timeout" => {
                self.analyzer.timeout_secs = value
                    .trim()
                    .parse()
                    .map_err(|_| OpsError::Config(format!("Invalid timeout: {}", value)))?;
            }
            "extensions" => {
                let extensions: Vec<String> = value
                    .split(',')
                    .map(|e| e.trim().trim_start_matches('.').to_string())
                    .filter(|e| !e.is_empty())
                    .collect();
                if extensions.is_empty() {
                    return Err(OpsError::Config(
                        "At least one source extension is required".to_string(),
                    ));
                }
                self.source_extensions = extensions;
            }
            "file-changes" => self.file_changes_path = PathBuf::from(value),
            "pull-requests" => self.pull_requests_path = PathBuf::from(value),
            "output" => self.output_path = PathBuf::from(value),
            _ => {
                return Err(OpsError::Config(format!(
                    "Unknown config key: {}. Valid keys: {}",
                    key,
                    CONFIG_KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }
}
