//! Fan-out over advisory sources

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::advisory::error::AdvisoryError;
use crate::advisory::report::Vulnerability;
use crate::advisory::source::AdvisorySource;
use crate::parser::types::Ecosystem;
use crate::version::semver::parse_version;

/// Queries every configured source for one package and merges the results.
///
/// A failing source is logged and skipped; the scan only fails when every
/// source failed.
pub struct VulnerabilityScanner {
    sources: Vec<Arc<dyn AdvisorySource>>,
}

impl VulnerabilityScanner {
    pub fn new(sources: Vec<Arc<dyn AdvisorySource>>) -> Self {
        Self { sources }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Findings are ordered by source, then as each source returned them.
    /// An advisory id reported by several sources is kept once.
    pub async fn scan_package(
        &self,
        ecosystem: Ecosystem,
        package: &str,
        version: &str,
    ) -> Result<Vec<Vulnerability>, AdvisoryError> {
        let installed = parse_version(version)?;

        let results = join_all(
            self.sources
                .iter()
                .map(|source| source.find_vulnerabilities(ecosystem, package, &installed)),
        )
        .await;

        let mut seen = HashSet::new();
        let mut vulnerabilities = Vec::new();
        let mut failures = Vec::new();

        for (source, result) in self.sources.iter().zip(results) {
            match result {
                Ok(found) => {
                    debug!(
                        "{} reported {} advisories for {}@{}",
                        source.name(),
                        found.len(),
                        package,
                        version
                    );
                    for vuln in found {
                        if seen.insert(vuln.id.clone()) {
                            vulnerabilities.push(vuln);
                        }
                    }
                }
                Err(e) => {
                    warn!("{} failed for {}@{}: {}", source.name(), package, version, e);
                    failures.push(format!("{}: {}", source.name(), e));
                }
            }
        }

        if !self.sources.is_empty() && failures.len() == self.sources.len() {
            return Err(AdvisoryError::AllSourcesFailed(failures.join("; ")));
        }

        Ok(vulnerabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisory::report::Severity;
    use crate::advisory::source::MockAdvisorySource;

    fn vuln(id: &str, source: &'static str) -> Vulnerability {
        Vulnerability {
            id: id.to_string(),
            package: "lodash".to_string(),
            version: "4.17.19".to_string(),
            description: String::new(),
            severity: Severity::High,
            published: None,
            references: vec![],
            fixed_version: None,
            source,
        }
    }

    fn source_returning(
        name: &'static str,
        result: fn() -> Result<Vec<Vulnerability>, AdvisoryError>,
    ) -> Arc<dyn AdvisorySource> {
        let mut mock = MockAdvisorySource::new();
        mock.expect_name().return_const(name);
        mock.expect_find_vulnerabilities()
            .returning(move |_, _, _| result());
        Arc::new(mock)
    }

    #[tokio::test]
    async fn scan_package_merges_and_deduplicates_by_id() {
        let scanner = VulnerabilityScanner::new(vec![
            source_returning("github", || {
                Ok(vec![vuln("GHSA-1", "github"), vuln("CVE-2020-8203", "github")])
            }),
            source_returning("nvd", || {
                Ok(vec![vuln("CVE-2020-8203", "nvd"), vuln("CVE-2021-23337", "nvd")])
            }),
        ]);

        let found = scanner
            .scan_package(Ecosystem::Npm, "lodash", "4.17.19")
            .await
            .unwrap();

        let ids: Vec<(&str, &str)> = found.iter().map(|v| (v.id.as_str(), v.source)).collect();
        assert_eq!(
            ids,
            vec![
                ("GHSA-1", "github"),
                ("CVE-2020-8203", "github"),
                ("CVE-2021-23337", "nvd"),
            ]
        );
    }

    #[tokio::test]
    async fn scan_package_tolerates_one_failing_source() {
        let scanner = VulnerabilityScanner::new(vec![
            source_returning("github", || {
                Err(AdvisoryError::Status {
                    source_name: "github",
                    status: 503,
                })
            }),
            source_returning("nvd", || Ok(vec![vuln("CVE-1", "nvd")])),
        ]);

        let found = scanner
            .scan_package(Ecosystem::Npm, "lodash", "4.17.19")
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn scan_package_fails_when_every_source_fails() {
        let scanner = VulnerabilityScanner::new(vec![
            source_returning("github", || {
                Err(AdvisoryError::InvalidResponse("bad".to_string()))
            }),
            source_returning("nvd", || {
                Err(AdvisoryError::Status {
                    source_name: "nvd",
                    status: 403,
                })
            }),
        ]);

        let result = scanner.scan_package(Ecosystem::Npm, "lodash", "4.17.19").await;

        assert!(matches!(result, Err(AdvisoryError::AllSourcesFailed(_))));
    }

    #[tokio::test]
    async fn scan_package_rejects_malformed_installed_version() {
        let mut mock = MockAdvisorySource::new();
        mock.expect_find_vulnerabilities().never();
        let scanner = VulnerabilityScanner::new(vec![Arc::new(mock)]);

        let result = scanner.scan_package(Ecosystem::Npm, "lodash", "latest").await;

        assert!(matches!(result, Err(AdvisoryError::Version(_))));
    }

    #[tokio::test]
    async fn scan_package_without_sources_is_clean() {
        let scanner = VulnerabilityScanner::new(vec![]);
        let found = scanner
            .scan_package(Ecosystem::Npm, "lodash", "4.17.19")
            .await
            .unwrap();
        assert!(found.is_empty());
    }
}
