//! vulnflag CLI - flag pull-request file changes that a static analyzer
//! reports findings for.
//!
//! Reads the file change and pull request tables, scans every changed source
//! file that exists in a local clone, and writes the table back out with a
//! `VULNERABLEFILE` column.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{config as config_cmd, flag::FlagArgs};
use vulnflag_ops::{parse_repo_url, Config};

/// vulnflag - Flag changed files with static-analysis findings.
///
/// Run `vulnflag` or `vulnflag flag` to process the default tables.
#[derive(Parser, Debug)]
#[command(
    name = "vulnflag",
    author,
    version,
    about = "vulnflag: flag pull-request file changes with static-analysis findings",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan changed source files and write the flagged table (default command).
    Flag(FlagArgs),

    /// Print the `owner/repo` a repository URL resolves to.
    ParseUrl {
        /// Repository URL (web, SSH or API form).
        url: String,
    },

    /// Manage configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration.
    Show,

    /// Set a configuration value.
    Set {
        /// Configuration key.
        key: String,
        /// Configuration value.
        value: String,
    },

    /// Get a configuration value.
    Get {
        /// Configuration key.
        key: String,
    },

    /// Reset configuration to defaults.
    Reset,

    /// Show path to config file.
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // RUST_LOG wins over the verbosity flags when set.
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr);
    match EnvFilter::try_from_default_env() {
        Ok(filter) => subscriber.with_env_filter(filter).init(),
        Err(_) => subscriber.with_max_level(level).init(),
    }

    let command = cli
        .command
        .unwrap_or_else(|| Commands::Flag(FlagArgs::default()));

    match command {
        Commands::Flag(args) => {
            let config = Config::load()?;
            commands::flag::execute(config, args).await?;
        }

        Commands::ParseUrl { url } => match parse_repo_url(Some(&url)) {
            Some(slug) => println!("{}", slug),
            None => anyhow::bail!("Could not extract owner/repo from {:?}", url),
        },

        Commands::Config(config_cmd_inner) => match config_cmd_inner {
            ConfigCommands::Show => {
                config_cmd::show(&Config::load()?)?;
            }
            ConfigCommands::Set { key, value } => {
                let mut config = Config::load_file()?;
                config_cmd::set(&mut config, &key, &value)?;
            }
            ConfigCommands::Get { key } => {
                config_cmd::get(&Config::load()?, &key)?;
            }
            ConfigCommands::Reset => {
                config_cmd::reset()?;
            }
            ConfigCommands::Path => {
                if let Some(path) = Config::config_file_path() {
                    println!("{}", path.display());
                } else {
                    println!("(no config file path available)");
                }
            }
        },
    }

    Ok(())
}
