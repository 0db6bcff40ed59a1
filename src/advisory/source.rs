//! AdvisorySource trait definition

#[cfg(test)]
use mockall::automock;

use crate::advisory::error::AdvisoryError;
use crate::advisory::report::Vulnerability;
use crate::parser::types::Ecosystem;
use crate::version::semver::Version;

/// A vulnerability database that can be asked about one installed package
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait AdvisorySource: Send + Sync {
    /// Short name used in logs and reports (e.g. "github", "nvd")
    fn name(&self) -> &'static str;

    /// Advisories whose affected range contains `version`
    async fn find_vulnerabilities(
        &self,
        ecosystem: Ecosystem,
        package: &str,
        version: &Version,
    ) -> Result<Vec<Vulnerability>, AdvisoryError>;
}
