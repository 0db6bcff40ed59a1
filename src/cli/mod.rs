//! Command-line interface
//!
//! - `dai scan`: checks installed dependencies against advisory databases
//! - `dai upgrade`: plans (and optionally applies) safe constraint upgrades
//! - `dai config`: shows or edits the config file

pub mod config;
pub mod scan;
pub mod upgrade;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::advisory::report::Severity;

/// Process exit code when a finding reaches `--fail-on`
pub const EXIT_VULNERABLE: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "dai")]
#[command(version, about = "Dependency upgrade advisor for package.json projects")]
pub struct Cli {
    /// Log format on stderr (overrides config)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan dependencies for known vulnerabilities
    Scan(ScanArgs),
    /// Find the best upgrade for each dependency constraint
    Upgrade(UpgradeArgs),
    /// Show or edit configuration
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Table,
    Json,
}

#[derive(Debug, clap::Args)]
pub struct ScanArgs {
    /// Directory to start looking for package.json from
    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Skip devDependencies
    #[arg(long)]
    pub no_dev: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Exit with code 2 when a finding is at or above this severity
    #[arg(long, value_parser = parse_severity)]
    pub fail_on: Option<Severity>,
}

#[derive(Debug, clap::Args)]
pub struct UpgradeArgs {
    /// Only plan these packages
    pub packages: Vec<String>,

    /// Plan every dependency (default when no packages are given)
    #[arg(long, conflicts_with = "packages")]
    pub all: bool,

    /// Write upgrades to package.json (a backup is kept)
    #[arg(long)]
    pub apply: bool,

    /// Show the diff --apply would write without touching files
    #[arg(long)]
    pub dry_run: bool,

    /// npm registry base URL (overrides config)
    #[arg(long)]
    pub registry: Option<String>,

    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Skip devDependencies
    #[arg(long)]
    pub no_dev: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    /// Print every setting (secrets masked)
    #[arg(long)]
    pub list: bool,

    /// Print the config file location
    #[arg(long)]
    pub path: bool,

    /// Set a value, e.g. --set concurrency=4
    #[arg(long, value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

fn parse_severity(s: &str) -> Result<Severity, String> {
    s.parse()
}
