//! Flag command implementation.
//!
//! Joins the file change table with the pull request table, scans every
//! changed source file present in a local clone, and writes the flagged
//! table.
//!
//! Examples:
//! ```bash
//! vulnflag                                         # default tables under ./output
//! vulnflag flag --repos-dir ~/clones               # clones at ~/clones/<owner>/<repo>
//! vulnflag flag --file-changes commits.csv \
//!               --pull-requests prs.csv -o out.csv
//! vulnflag flag --json --no-save                   # summary only, as JSON
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use vulnflag_ops::{Config, FlagRequest, FlagResponse, OpsContext};

/// Options for the flag command. Anything left unset comes from config.
#[derive(Args, Debug, Default)]
pub struct FlagArgs {
    /// File change table (CSV).
    #[arg(long)]
    pub file_changes: Option<PathBuf>,

    /// Pull request table with repository URLs (CSV).
    #[arg(long)]
    pub pull_requests: Option<PathBuf>,

    /// Output path for the flagged table.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory holding local clones as <owner>/<repo>.
    #[arg(long)]
    pub repos_dir: Option<PathBuf>,

    /// Analyzer binary.
    #[arg(long)]
    pub analyzer: Option<String>,

    /// Analyzer argument placed before the file path (repeatable, replaces the defaults).
    #[arg(long = "analyzer-arg", allow_hyphen_values = true)]
    pub analyzer_args: Vec<String>,

    /// Seconds before a single analyzer run is killed (0 disables).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Source file extension eligible for scanning (repeatable).
    #[arg(short, long = "extension")]
    pub extensions: Vec<String>,

    /// Compute flags without writing the output table.
    #[arg(long)]
    pub no_save: bool,

    /// Print the run summary as JSON.
    #[arg(long)]
    pub json: bool,
}

impl FlagArgs {
    /// Layer command line options over the loaded configuration.
    fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(path) = &self.file_changes {
            config.file_changes_path = path.clone();
        }
        if let Some(path) = &self.pull_requests {
            config.pull_requests_path = path.clone();
        }
        if let Some(path) = &self.output {
            config.output_path = path.clone();
        }
        if let Some(dir) = &self.repos_dir {
            config.repos_dir = dir.clone();
        }
        if let Some(program) = &self.analyzer {
            config.analyzer.program = program.clone();
        }
        if !self.analyzer_args.is_empty() {
            config.analyzer.args = self.analyzer_args.clone();
        }
        if let Some(timeout) = self.timeout {
            config.analyzer.timeout_secs = timeout;
        }
        if !self.extensions.is_empty() {
            config.set("extensions", &self.extensions.join(","))?;
        }
        Ok(())
    }
}

/// Execute the flag command.
pub async fn execute(mut config: Config, args: FlagArgs) -> Result<FlagResponse> {
    args.apply(&mut config)?;

    let mut request = FlagRequest::from_config(&config);
    if args.no_save {
        request = request.without_save();
    }

    let ctx = OpsContext::new(config);
    let response = match ctx.flag(request).await {
        Ok(response) => response,
        Err(e) if e.is_preflight() => anyhow::bail!(
            "{}. Produce the input tables first or point --file-changes/--pull-requests at them",
            e
        ),
        Err(e) => return Err(e.into()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_summary(&response);
    }

    Ok(response)
}

fn print_summary(response: &FlagResponse) {
    let s = &response.summary;

    println!("📊 vulnflag summary");
    println!("{:─<50}", "");
    println!("Total rows:                {}", s.total_rows);
    println!("Source file candidates:    {}", s.candidates);
    println!("  without repository URL:  {}", s.missing_repo_url);
    println!("  unparseable URL:         {}", s.malformed_repo_url);
    println!("  not in local clone:      {}", s.unresolved_files);
    println!("Unique files scanned:      {}", s.scanned_files);
    println!("  with findings:           {}", s.flagged_files);
    println!("  without verdict:         {}", s.unscanned_files);
    println!("Rows flagged:              {}", s.flagged_rows);

    if !response.unscanned.is_empty() {
        println!();
        println!("⚠️  Files left unflagged because they could not be scanned:");
        for file in &response.unscanned {
            println!("   • {} ({})", file.path.display(), file.reason);
        }
    }

    println!();
    match &response.output_path {
        Some(path) => {
            println!("✅ Output saved to: {}", path.display());
            println!("   Records written: {}", response.record_count());
        }
        None => println!("Output not saved (--no-save)"),
    }
}
