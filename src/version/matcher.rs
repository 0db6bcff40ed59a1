//! Version matching abstraction for different ecosystems

use crate::parser::types::Ecosystem;

/// Where the registry's latest version sits relative to a declared spec
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareResult {
    /// Latest is inside the declared range
    Latest,
    /// Latest is beyond the declared range
    Outdated,
    /// Declared base version is ahead of latest (pre-release or unpublished)
    Newer,
    /// Either side failed to parse
    Invalid,
}

/// Trait for ecosystem-specific version matching logic
pub trait VersionMatcher: Send + Sync {
    /// Returns the ecosystem this matcher handles
    fn ecosystem(&self) -> Ecosystem;

    /// Check if a version specification matches any available version
    ///
    /// For npm: ^1.0.0 matches 1.0.0, 1.1.0, 1.9.9, but not 2.0.0
    fn version_exists(&self, version_spec: &str, available_versions: &[String]) -> bool;

    /// Compare the current version specification to the latest version
    fn compare_to_latest(&self, current_version: &str, latest_version: &str) -> CompareResult;
}
