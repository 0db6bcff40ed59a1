//! Advisory layer: affected-range evaluation, advisory database clients and
//! vulnerability reports
//!
//! - [`range`]: bounded and comparator-string ranges, `is_affected`
//! - [`source`]: `AdvisorySource` trait
//! - [`github`], [`nvd`]: concrete sources
//! - [`scanner`]: queries all sources for one package and merges findings
//! - [`report`]: severities, per-package reports and the console summary

pub mod error;
pub mod github;
pub mod nvd;
pub mod range;
pub mod report;
pub mod scanner;
pub mod source;

pub use error::AdvisoryError;
pub use github::GitHubAdvisoryClient;
pub use nvd::NvdClient;
pub use range::{BoundedRange, VersionRange, is_affected, is_affected_raw};
pub use report::{
    ScanSummary, Severity, Vulnerability, VulnerabilityReport, VulnerabilityReporter,
    write_console_report,
};
pub use scanner::VulnerabilityScanner;
pub use source::AdvisorySource;
