//! `dai scan`

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::advisory::github::GitHubAdvisoryClient;
use crate::advisory::nvd::NvdClient;
use crate::advisory::report::{
    ScanSummary, ScanTarget, VulnerabilityReporter, write_console_report,
};
use crate::advisory::scanner::VulnerabilityScanner;
use crate::advisory::source::AdvisorySource;
use crate::cli::{EXIT_VULNERABLE, OutputFormat, ScanArgs};
use crate::config::Config;
use crate::parser::package_json::{PackageJson, find_package_json};
use crate::parser::package_lock::PackageLock;
use crate::parser::types::{Dependency, Ecosystem};
use crate::version::constraint::parse_constraint;

/// Builds the advisory sources from config
pub fn build_sources(config: &Config) -> Result<Vec<Arc<dyn AdvisorySource>>> {
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let github = GitHubAdvisoryClient::new(
        &config.github_advisory_url,
        config.github_token.clone(),
        timeout,
    )
    .context("failed to create GitHub advisory client")?;
    let nvd = NvdClient::new(&config.nvd_url, config.nvd_api_key.clone(), timeout)
        .context("failed to create NVD client")?;

    Ok(vec![Arc::new(github), Arc::new(nvd)])
}

/// Version to scan for each dependency, keyed by manifest name: the locked
/// version when a lock file lists it, otherwise the declared constraint's
/// base version. Dependencies with neither are skipped.
pub fn scan_targets(
    dependencies: &[Dependency],
    lock: Option<&PackageLock>,
) -> BTreeMap<String, ScanTarget> {
    let mut targets = BTreeMap::new();

    for dependency in dependencies {
        let installed = lock.and_then(|lock| lock.installed_version(&dependency.name));
        let version = match installed {
            Some(version) => version.to_string(),
            None => match parse_constraint(&dependency.constraint) {
                Ok(constraint) => constraint.version.to_string(),
                Err(e) => {
                    warn!("Skipping {}: {}", dependency.name, e);
                    continue;
                }
            },
        };
        debug!("{} -> {}@{}", dependency.name, dependency.package, version);
        targets.insert(
            dependency.name.clone(),
            ScanTarget::new(dependency.package.as_str(), version),
        );
    }

    targets
}

pub fn write_summary<W: Write>(
    w: &mut W,
    summary: &ScanSummary,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => write_console_report(w, summary)?,
        OutputFormat::Table => {
            let mut vulnerable: Vec<_> = summary.vulnerable().cloned().collect();
            if vulnerable.is_empty() {
                writeln!(w, "No vulnerabilities found in {} packages", summary.reports.len())?;
            }
            for report in &mut vulnerable {
                writeln!(w, "{}@{}", report.package, report.version)?;
                report.write_table(w)?;
                writeln!(w)?;
            }
            for failure in &summary.failures {
                writeln!(
                    w,
                    "Failed to scan {}@{}: {}",
                    failure.package, failure.version, failure.reason
                )?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *w, summary)?;
            writeln!(w)?;
        }
    }
    Ok(())
}

/// Runs the scan and returns the process exit code
pub async fn run<W: Write>(args: &ScanArgs, config: &Config, out: &mut W) -> Result<u8> {
    let manifest_path = find_package_json(&args.path)
        .with_context(|| format!("no package.json found from {}", args.path.display()))?;
    let manifest = PackageJson::read(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    let lock = PackageLock::read_beside(&manifest_path).context("failed to read lock file")?;

    let include_dev = config.include_dev && !args.no_dev;
    let targets = scan_targets(&manifest.dependencies(include_dev), lock.as_ref());
    info!(
        "Scanning {} packages from {}",
        targets.len(),
        manifest_path.display()
    );

    let reporter = VulnerabilityReporter::new(VulnerabilityScanner::new(build_sources(config)?));
    let summary = reporter.report_multiple(Ecosystem::Npm, &targets).await;

    write_summary(out, &summary, args.format)?;

    let failed = args
        .fail_on
        .is_some_and(|threshold| summary.has_at_least(threshold));
    Ok(if failed { EXIT_VULNERABLE } else { 0 })
}
