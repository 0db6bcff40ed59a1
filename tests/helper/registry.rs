//! Registry and advisory test doubles

use std::collections::HashMap;

use async_trait::async_trait;

use dai::advisory::error::AdvisoryError;
use dai::advisory::report::{Severity, Vulnerability};
use dai::advisory::source::AdvisorySource;
use dai::parser::types::Ecosystem;
use dai::version::error::RegistryError;
use dai::version::registry::Registry;
use dai::version::semver::Version;
use dai::version::types::PackageVersions;

/// Registry serving a fixed set of packages; unknown names are `NotFound`
#[derive(Default)]
pub struct MockRegistry {
    versions: HashMap<String, Vec<String>>,
    latest: HashMap<String, String>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_versions(mut self, package: &str, versions: Vec<&str>) -> Self {
        self.versions.insert(
            package.to_string(),
            versions.into_iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    /// Sets the `latest` dist-tag for a package
    pub fn with_latest(mut self, package: &str, latest: &str) -> Self {
        self.latest.insert(package.to_string(), latest.to_string());
        self
    }
}

#[async_trait]
impl Registry for MockRegistry {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch_all_versions(
        &self,
        package_name: &str,
    ) -> Result<PackageVersions, RegistryError> {
        let versions = self
            .versions
            .get(package_name)
            .ok_or_else(|| RegistryError::NotFound(package_name.to_string()))?;

        let dist_tags = self
            .latest
            .get(package_name)
            .map(|latest| HashMap::from([("latest".to_string(), latest.clone())]))
            .unwrap_or_default();

        Ok(PackageVersions::new(versions.clone()).with_dist_tags(dist_tags))
    }
}

/// Advisory source backed by a fixed list; only findings whose package and
/// version match the query are returned
#[derive(Default)]
pub struct StaticAdvisorySource {
    name: &'static str,
    findings: Vec<Vulnerability>,
    failing: Vec<String>,
}

impl StaticAdvisorySource {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    pub fn with_finding(
        mut self,
        id: &str,
        package: &str,
        version: &str,
        severity: Severity,
    ) -> Self {
        self.findings.push(Vulnerability {
            id: id.to_string(),
            package: package.to_string(),
            version: version.to_string(),
            description: format!("{id} affects {package}"),
            severity,
            published: None,
            references: vec![],
            fixed_version: None,
            source: self.name,
        });
        self
    }

    /// Queries for `package` fail with a 500 status
    pub fn failing_for(mut self, package: &str) -> Self {
        self.failing.push(package.to_string());
        self
    }
}

#[async_trait]
impl AdvisorySource for StaticAdvisorySource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn find_vulnerabilities(
        &self,
        _ecosystem: Ecosystem,
        package: &str,
        version: &Version,
    ) -> Result<Vec<Vulnerability>, AdvisoryError> {
        if self.failing.iter().any(|p| p == package) {
            return Err(AdvisoryError::Status {
                source_name: self.name,
                status: 500,
            });
        }

        let version = version.to_string();
        Ok(self
            .findings
            .iter()
            .filter(|v| v.package == package && v.version == version)
            .cloned()
            .collect())
    }
}
