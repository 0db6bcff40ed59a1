//! Registry trait for fetching package versions

#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;
use crate::version::types::PackageVersions;

/// Trait for fetching package versions from a registry
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Short identifier used in logs (e.g. "npm")
    fn name(&self) -> &'static str;

    /// Fetches all versions for a package from the registry
    ///
    /// # Arguments
    /// * `package_name` - The name of the package (e.g., "lodash", "@types/node")
    ///
    /// # Returns
    /// * `Ok(PackageVersions)` - List of versions, ordered from oldest to newest
    /// * `Err(RegistryError)` - If the fetch fails
    async fn fetch_all_versions(
        &self,
        package_name: &str,
    ) -> Result<PackageVersions, RegistryError>;
}
