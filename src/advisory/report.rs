//! Vulnerability reports
//!
//! Reports are sorted most severe first, newest first within a severity, and
//! can be written as plain text, a table, or JSON (via `Serialize`).

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::advisory::scanner::VulnerabilityScanner;
use crate::config::FETCH_STAGGER_DELAY_MS;
use crate::parser::types::Ecosystem;

const TABLE_DESCRIPTION_WIDTH: usize = 80;

/// Severity levels, ordered by weight (Unknown lowest)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Most severe first
    pub const DESCENDING: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Unknown,
    ];

    pub fn weight(&self) -> u8 {
        *self as u8
    }

    /// Case-insensitive; GitHub's "moderate" is Medium. Anything else is Unknown.
    pub fn parse(s: &str) -> Severity {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" | "moderate" => Severity::Medium,
            "low" => Severity::Low,
            _ => Severity::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Unknown => "UNKNOWN",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    /// Strict variant of [`Severity::parse`] for user input
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Severity::parse(s) {
            Severity::Unknown if !s.eq_ignore_ascii_case("unknown") => Err(format!(
                "Unknown severity: {}. Use 'critical', 'high', 'medium', 'low', or 'unknown'",
                s
            )),
            severity => Ok(severity),
        }
    }
}

/// Maps a CVSS v3 base score to a severity level.
pub fn parse_cvss_score(score: f64) -> Severity {
    match score {
        s if s >= 9.0 => Severity::Critical,
        s if s >= 7.0 => Severity::High,
        s if s >= 4.0 => Severity::Medium,
        s if s > 0.0 => Severity::Low,
        _ => Severity::Unknown,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vulnerability {
    pub id: String,
    pub package: String,
    pub version: String,
    pub description: String,
    pub severity: Severity,
    pub published: Option<DateTime<Utc>>,
    pub references: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_version: Option<String>,
    pub source: &'static str,
}

impl Vulnerability {
    fn published_date(&self) -> String {
        self.published
            .map(|p| p.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// Security report for one installed package
#[derive(Debug, Clone, Serialize)]
pub struct VulnerabilityReport {
    pub package: String,
    pub version: String,
    pub vulnerabilities: Vec<Vulnerability>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Tabled)]
struct VulnRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Published")]
    published: String,
    #[tabled(rename = "Fixed In")]
    fixed_in: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl VulnerabilityReport {
    pub fn new(package: &str, version: &str, vulnerabilities: Vec<Vulnerability>) -> Self {
        Self {
            package: package.to_string(),
            version: version.to_string(),
            vulnerabilities,
            timestamp: Utc::now(),
        }
    }

    pub fn has_vulnerabilities(&self) -> bool {
        !self.vulnerabilities.is_empty()
    }

    pub fn count_by_severity(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for vuln in &self.vulnerabilities {
            *counts.entry(vuln.severity).or_insert(0) += 1;
        }
        counts
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.vulnerabilities.iter().map(|v| v.severity).max()
    }

    /// Most severe first; newer advisories first within a severity. Stable.
    pub fn sort_by_severity(&mut self) {
        self.vulnerabilities.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| b.published.cmp(&a.published))
        });
    }

    pub fn write_text<W: Write>(&mut self, w: &mut W) -> io::Result<()> {
        self.sort_by_severity();

        writeln!(
            w,
            "Security Vulnerability Report for {}@{}",
            self.package, self.version
        )?;
        writeln!(w, "Generated: {}", self.timestamp.to_rfc2822())?;
        writeln!(w)?;

        if !self.has_vulnerabilities() {
            writeln!(w, "No vulnerabilities found")?;
            return Ok(());
        }

        writeln!(w, "Found {} vulnerabilities:", self.vulnerabilities.len())?;
        self.write_severity_counts(w, "  ")?;
        writeln!(w)?;

        writeln!(w, "Vulnerability Details:")?;
        writeln!(w, "-----------------------")?;
        self.write_details(w)
    }

    pub fn write_table<W: Write>(&mut self, w: &mut W) -> io::Result<()> {
        self.sort_by_severity();

        let rows: Vec<VulnRow> = self
            .vulnerabilities
            .iter()
            .map(|v| VulnRow {
                id: v.id.clone(),
                severity: v.severity.to_string(),
                published: v.published_date(),
                fixed_in: v.fixed_version.clone().unwrap_or_else(|| "-".to_string()),
                description: truncate(&v.description, TABLE_DESCRIPTION_WIDTH),
            })
            .collect();

        let table = Table::new(rows).with(Style::psql()).to_string();
        writeln!(w, "{}", table)
    }

    fn write_severity_counts<W: Write>(&self, w: &mut W, indent: &str) -> io::Result<()> {
        let counts = self.count_by_severity();
        for severity in Severity::DESCENDING {
            if let Some(count) = counts.get(&severity) {
                writeln!(w, "{indent}- {severity}: {count}")?;
            }
        }
        Ok(())
    }

    fn write_details<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for (i, vuln) in self.vulnerabilities.iter().enumerate() {
            writeln!(w, "[{}] {} ({})", i + 1, vuln.id, vuln.severity)?;
            writeln!(w, "    Description: {}", vuln.description)?;
            writeln!(w, "    Published: {}", vuln.published_date())?;
            if let Some(fixed) = &vuln.fixed_version {
                writeln!(w, "    Fixed in: {}", fixed)?;
            }
            if !vuln.references.is_empty() {
                writeln!(w, "    References:")?;
                for reference in &vuln.references {
                    writeln!(w, "      - {}", reference)?;
                }
            }
            writeln!(w)?;
        }
        Ok(())
    }
}

/// Truncates on a char boundary, appending "..." when shortened
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// A package that could not be scanned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFailure {
    pub package: String,
    pub version: String,
    pub reason: String,
}

/// One package version to scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    /// Registry name; differs from the manifest key for `npm:` aliases
    pub package: String,
    pub version: String,
}

impl ScanTarget {
    pub fn new(package: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            version: version.into(),
        }
    }
}

/// Result of scanning many packages; failures never abort the batch.
/// Reports are keyed by manifest name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    pub reports: BTreeMap<String, VulnerabilityReport>,
    pub failures: Vec<ScanFailure>,
}

impl ScanSummary {
    pub fn vulnerable(&self) -> impl Iterator<Item = &VulnerabilityReport> {
        self.reports.values().filter(|r| r.has_vulnerabilities())
    }

    pub fn clean(&self) -> impl Iterator<Item = &VulnerabilityReport> {
        self.reports.values().filter(|r| !r.has_vulnerabilities())
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.reports.values().filter_map(|r| r.max_severity()).max()
    }

    /// Whether any finding is at or above `threshold`
    pub fn has_at_least(&self, threshold: Severity) -> bool {
        self.max_severity().is_some_and(|max| max >= threshold)
    }
}

pub struct VulnerabilityReporter {
    scanner: VulnerabilityScanner,
}

impl VulnerabilityReporter {
    pub fn new(scanner: VulnerabilityScanner) -> Self {
        Self { scanner }
    }

    pub async fn generate_report(
        &self,
        ecosystem: Ecosystem,
        package: &str,
        version: &str,
    ) -> Result<VulnerabilityReport, crate::advisory::error::AdvisoryError> {
        let vulnerabilities = self.scanner.scan_package(ecosystem, package, version).await?;
        Ok(VulnerabilityReport::new(package, version, vulnerabilities))
    }

    /// Scans every target concurrently with staggered starts. Reports are
    /// keyed like `targets`. A target that fails is recorded and the rest
    /// continue.
    pub async fn report_multiple(
        &self,
        ecosystem: Ecosystem,
        targets: &BTreeMap<String, ScanTarget>,
    ) -> ScanSummary {
        info!("Scanning {} packages", targets.len());

        let futures = targets.iter().enumerate().map(|(i, (key, target))| {
            let delay = Duration::from_millis(FETCH_STAGGER_DELAY_MS * i as u64);
            async move {
                sleep(delay).await;
                let result = self
                    .generate_report(ecosystem, &target.package, &target.version)
                    .await;
                (key, target, result)
            }
        });

        let mut summary = ScanSummary::default();
        for (key, target, result) in join_all(futures).await {
            match result {
                Ok(report) => {
                    summary.reports.insert(key.clone(), report);
                }
                Err(e) => {
                    warn!("Error scanning {}@{}: {}", target.package, target.version, e);
                    summary.failures.push(ScanFailure {
                        package: target.package.clone(),
                        version: target.version.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        summary
    }
}

/// Human-readable summary of a whole scan
pub fn write_console_report<W: Write>(w: &mut W, summary: &ScanSummary) -> io::Result<()> {
    let vulnerable: Vec<&VulnerabilityReport> = summary.vulnerable().collect();
    let clean: Vec<&VulnerabilityReport> = summary.clean().collect();

    writeln!(w, "Vulnerability Scan Summary")?;
    writeln!(w, "{}", "=".repeat(40))?;
    writeln!(w, "Total packages scanned: {}", summary.reports.len())?;
    writeln!(w, "Vulnerable packages: {}", vulnerable.len())?;
    writeln!(w, "Clean packages: {}", clean.len())?;
    if !summary.failures.is_empty() {
        writeln!(w, "Failed to scan: {}", summary.failures.len())?;
    }
    writeln!(w)?;

    if !vulnerable.is_empty() {
        writeln!(w, "Vulnerable Packages:")?;
        writeln!(w, "{}", "-".repeat(40))?;
        for report in &vulnerable {
            writeln!(
                w,
                "- {}@{}: {} vulnerabilities",
                report.package,
                report.version,
                report.vulnerabilities.len()
            )?;

            let counts = report.count_by_severity();
            let breakdown: Vec<String> = Severity::DESCENDING
                .iter()
                .filter(|s| **s != Severity::Unknown)
                .filter_map(|s| counts.get(s).map(|count| format!("{count} {s}")))
                .collect();
            if !breakdown.is_empty() {
                writeln!(w, "  ({})", breakdown.join(", "))?;
            }
        }
        writeln!(w)?;
    }

    if !clean.is_empty() {
        writeln!(w, "Clean Packages:")?;
        writeln!(w, "{}", "-".repeat(40))?;
        for chunk in clean.chunks(5) {
            let line: Vec<String> = chunk
                .iter()
                .map(|r| format!("{}@{}", r.package, r.version))
                .collect();
            writeln!(w, "- {}", line.join("  "))?;
        }
        writeln!(w)?;
    }

    if !summary.failures.is_empty() {
        writeln!(w, "Scan Failures:")?;
        writeln!(w, "{}", "-".repeat(40))?;
        for failure in &summary.failures {
            writeln!(
                w,
                "- {}@{}: {}",
                failure.package, failure.version, failure.reason
            )?;
        }
        writeln!(w)?;
    }

    if !vulnerable.is_empty() {
        writeln!(w, "Detailed Vulnerability Reports")?;
        writeln!(w, "{}", "=".repeat(40))?;
        writeln!(w)?;

        for report in vulnerable {
            let mut report = report.clone();
            report.sort_by_severity();

            writeln!(w, "{}", "-".repeat(80))?;
            writeln!(
                w,
                "Security Vulnerability Report for {}@{}",
                report.package, report.version
            )?;
            writeln!(w, "Generated: {}", report.timestamp.to_rfc2822())?;
            writeln!(w)?;
            writeln!(w, "Found {} vulnerabilities:", report.vulnerabilities.len())?;
            report.write_severity_counts(w, "  ")?;
            writeln!(w)?;
            report.write_details(w)?;
        }
    }

    Ok(())
}
