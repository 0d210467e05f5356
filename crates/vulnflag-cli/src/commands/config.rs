//! Config command implementation.
//!
//! Manages the stored configuration.

use anyhow::Result;
use vulnflag_ops::{Config, CONFIG_KEYS};

/// Show current configuration.
pub fn show(config: &Config) -> Result<()> {
    println!("vulnflag Configuration");
    println!("{:-<40}", "");

    println!("Repos Directory:     {}", config.repos_dir.display());
    println!("Analyzer:            {}", config.analyzer.program);
    println!("Analyzer Args:       {}", config.analyzer.args.join(" "));
    println!("Findings Key:        {}", config.analyzer.findings_key);
    match config.analyzer.timeout_secs {
        0 => println!("Timeout:             (none)"),
        secs => println!("Timeout:             {} s", secs),
    }
    println!("Source Extensions:   {}", config.source_extensions.join(", "));
    println!("File Changes Table:  {}", config.file_changes_path.display());
    println!("Pull Request Table:  {}", config.pull_requests_path.display());
    println!("Output Table:        {}", config.output_path.display());

    if let Some(config_path) = Config::config_file_path() {
        println!("\nConfig file: {}", config_path.display());
    }

    Ok(())
}

/// Set a configuration value and persist it.
pub fn set(config: &mut Config, key: &str, value: &str) -> Result<()> {
    config.set(key, value)?;
    config.save()?;
    println!("Set {} to: {}", key, config.get(key).unwrap_or_default());
    Ok(())
}

/// Get a configuration value.
pub fn get(config: &Config, key: &str) -> Result<()> {
    match config.get(key) {
        Some(value) => println!("{}", value),
        None => anyhow::bail!(
            "Unknown config key: {}. Valid keys: {}",
            key,
            CONFIG_KEYS.join(", ")
        ),
    }
    Ok(())
}

/// Reset configuration to defaults.
pub fn reset() -> Result<()> {
    let config = Config::default();
    config.save()?;
    println!("Configuration reset to defaults");
    Ok(())
}
