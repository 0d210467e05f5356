//! Integration tests for the vulnflag CLI.
//!
//! Run with: `cargo test --package vulnflag-cli --test cli_integration`

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Helper to run vulnflag in a specific directory with a clean environment.
fn run_in_dir(dir: &Path, args: &[&str]) -> Output {
    run_with_env(dir, args, &[])
}

/// Like [`run_in_dir`], with extra environment variables set.
fn run_with_env(dir: &Path, args: &[&str], vars: &[(&str, &str)]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vulnflag"))
        .current_dir(dir)
        .args(args)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("RUST_LOG")
        .env_remove("VULNFLAG_REPOS_DIR")
        .env_remove("VULNFLAG_ANALYZER")
        .env_remove("VULNFLAG_TIMEOUT_SECS")
        .env_remove("VULNFLAG_EXTENSIONS")
        .envs(vars.iter().copied())
        .output()
        .expect("Failed to execute vulnflag command")
}

/// Write a stand-in analyzer that reports a finding for files mentioning `eval`.
#[cfg(unix)]
fn write_fake_analyzer(dir: &Path) -> String {
    let script = dir.join("fake-bandit.sh");
    fs::write(
        &script,
        r#"for target; do :; done
if grep -q eval "$target"; then
  echo '{"errors": [], "results": [{"test_id": "B307", "issue_severity": "MEDIUM"}]}'
  exit 1
fi
echo '{"errors": [], "results": []}'
exit 0
"#,
    )
    .unwrap();
    script.display().to_string()
}

/// Lay out the default tables under `output/` and clones under `repos/`.
fn create_batch(dir: &Path) {
    let clone = dir.join("repos/octo/widgets");
    fs::create_dir_all(clone.join("widgets")).unwrap();
    fs::write(clone.join("widgets/render.py"), "eval(template)\n").unwrap();
    fs::write(clone.join("widgets/util.py"), "def f():\n    return 1\n").unwrap();

    fs::create_dir_all(dir.join("output")).unwrap();
    fs::write(
        dir.join("output/task1_pull_requests.csv"),
        "ID,TITLE,AGENT,REPOURL\n\
         11,Render fix,Codex,https://api.github.com/repos/octo/widgets\n\
         12,Docs,Devin,not-a-url\n",
    )
    .unwrap();
    fs::write(
        dir.join("output/task4_pr_commit_details.csv"),
        "PRID,PRSHA,PRCOMMITMESSAGE,PRFILE,PRSTATUS,PRADDS,PRDELSS,PRCHANGECOUNT,PRDIFF\n\
         11,abc,Fix render,widgets/render.py,modified,2,1,3,+eval\n\
         11,abc,Fix render,widgets\\util.py,modified,1,0,1,+return\n\
         11,abc,Fix render,README.md,modified,1,1,2,+docs\n\
         12,def,Docs,widgets/render.py,modified,1,0,1,+eval\n",
    )
    .unwrap();
}

fn flag_column(csv: &str) -> Vec<String> {
    csv.lines()
        .skip(1)
        .map(|line| line.rsplit(',').next().unwrap().to_string())
        .collect()
}

// =============================================================================
// parse-url Command Tests
// =============================================================================

#[test]
fn test_parse_url_prints_slug() {
    let temp = TempDir::new().unwrap();

    for url in [
        "https://github.com/o/r",
        "https://github.com/o/r.git",
        "git@github.com:o/r.git",
        "https://api.github.com/repos/o/r",
    ] {
        let output = run_in_dir(temp.path(), &["parse-url", url]);
        assert!(output.status.success(), "parse-url should accept {}", url);
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "o/r");
    }
}

#[test]
fn test_parse_url_rejects_malformed() {
    let temp = TempDir::new().unwrap();
    let output = run_in_dir(temp.path(), &["parse-url", "https://github.com/onlyowner"]);
    assert!(!output.status.success(), "parse-url should fail");
}

// =============================================================================
// flag Command Tests
// =============================================================================

#[test]
fn test_flag_without_tables_fails() {
    let temp = TempDir::new().unwrap();

    let output = run_in_dir(temp.path(), &["flag"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "flag should fail without tables");
    assert!(
        stderr.contains("file change table not found"),
        "stderr should name the missing table: {}",
        stderr
    );
    assert!(!temp.path().join("output").exists());
}

#[cfg(unix)]
#[test]
fn test_flag_end_to_end() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    create_batch(dir);
    let script = write_fake_analyzer(dir);

    let output = run_in_dir(
        dir,
        &["flag", "--analyzer", "sh", "--analyzer-arg", script.as_str()],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "flag should succeed: {:?}", output);
    assert!(stdout.contains("Source file candidates:    3"), "{}", stdout);
    assert!(stdout.contains("Unique files scanned:      2"), "{}", stdout);
    assert!(stdout.contains("Rows flagged:              1"), "{}", stdout);
    assert!(stdout.contains("✅ Output saved to:"));

    let written =
        fs::read_to_string(dir.join("output/task7_pr_commit_vulnerabilities.csv")).unwrap();
    assert!(written.starts_with(
        "PRID,PRSHA,PRCOMMITMESSAGE,PRFILE,PRSTATUS,PRADDS,PRDELSS,PRCHANGECOUNT,PRDIFF,VULNERABLEFILE\n"
    ));
    assert_eq!(flag_column(&written), vec!["1", "0", "0", "0"]);
}

#[cfg(unix)]
#[test]
fn test_flag_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    create_batch(dir);
    let script = write_fake_analyzer(dir);
    let args = ["flag", "--analyzer", "sh", "--analyzer-arg", script.as_str(), "-o", "out.csv"];

    assert!(run_in_dir(dir, &args).status.success());
    let first = fs::read(dir.join("out.csv")).unwrap();
    assert!(run_in_dir(dir, &args).status.success());
    let second = fs::read(dir.join("out.csv")).unwrap();

    assert_eq!(first, second);
}

#[cfg(unix)]
#[test]
fn test_flag_json_summary_without_save() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    create_batch(dir);
    let script = write_fake_analyzer(dir);

    let output = run_in_dir(
        dir,
        &[
            "flag",
            "--analyzer",
            "sh",
            "--analyzer-arg",
            script.as_str(),
            "--json",
            "--no-save",
        ],
    );

    assert!(output.status.success());
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["summary"]["total_rows"], 4);
    assert_eq!(summary["summary"]["candidates"], 3);
    assert_eq!(summary["summary"]["malformed_repo_url"], 1);
    assert_eq!(summary["summary"]["flagged_files"], 1);
    assert!(summary.get("output_path").is_none());
    assert!(!dir.join("output/task7_pr_commit_vulnerabilities.csv").exists());
}

#[test]
fn test_flag_with_missing_analyzer_completes_unflagged() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    create_batch(dir);

    let output = run_in_dir(
        dir,
        &["flag", "--analyzer", "vulnflag-no-such-analyzer"],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(output.status.success(), "missing analyzer must not fail the run");
    assert!(stdout.contains("without verdict:         2"), "{}", stdout);
    assert!(stdout.contains("could not be scanned"));
    assert_eq!(
        stderr.matches("not installed or not on PATH").count(),
        1,
        "install hint should be printed once: {}",
        stderr
    );

    let written =
        fs::read_to_string(dir.join("output/task7_pr_commit_vulnerabilities.csv")).unwrap();
    assert_eq!(flag_column(&written), vec!["0", "0", "0", "0"]);
}

#[test]
fn test_flag_extension_override() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    create_batch(dir);

    let output = run_in_dir(
        dir,
        &[
            "flag",
            "--analyzer",
            "vulnflag-no-such-analyzer",
            "--extension",
            "md",
            "--no-save",
        ],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("Source file candidates:    1"), "{}", stdout);
}

#[test]
fn test_flag_settings_precedence() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    create_batch(dir);
    let args = ["flag", "--analyzer", "vulnflag-no-such-analyzer", "--no-save"];
    let md = [("VULNFLAG_EXTENSIONS", "md")];

    // Environment over defaults.
    let output = run_with_env(dir, &args, &md);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Source file candidates:    1"), "{}", stdout);

    // Command line over environment.
    let mut with_flag = args.to_vec();
    with_flag.extend(["--extension", "py"]);
    let output = run_with_env(dir, &with_flag, &md);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Source file candidates:    3"), "{}", stdout);

    // Environment over the config file.
    assert!(run_in_dir(dir, &["config", "set", "extensions", "py"]).status.success());
    let output = run_with_env(dir, &args, &md);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Source file candidates:    1"), "{}", stdout);
}

#[test]
fn test_flag_reads_dotenv_file() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    create_batch(dir);
    fs::write(dir.join(".env"), "VULNFLAG_EXTENSIONS=md\n").unwrap();

    let output = run_in_dir(
        dir,
        &["flag", "--analyzer", "vulnflag-no-such-analyzer", "--no-save"],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("Source file candidates:    1"), "{}", stdout);
}

#[test]
fn test_invalid_env_value_fails() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    create_batch(dir);

    let output = run_with_env(dir, &["flag"], &[("VULNFLAG_TIMEOUT_SECS", "soon")]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid timeout"));
}

// =============================================================================
// config Command Tests
// =============================================================================

#[test]
fn test_config_set_then_get() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();

    let output = run_in_dir(dir, &["config", "set", "repos-dir", "/srv/clones"]);
    assert!(output.status.success(), "config set should succeed");

    let output = run_in_dir(dir, &["config", "get", "repos-dir"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "/srv/clones");
}

#[test]
fn test_config_rejects_unknown_key() {
    let temp = TempDir::new().unwrap();
    let output = run_in_dir(temp.path(), &["config", "get", "colour"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Valid keys"));
}
