//! npm version matcher
//!
//! Supports the single-operator constraints npm manifests declare:
//! - `1.2.3`, `=1.2.3` - exact match
//! - `^1.2.3` - compatible with version (>=1.2.3 <2.0.0)
//! - `~1.2.3` - approximately equivalent (>=1.2.3 <1.3.0)
//! - `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3` - comparison operators

use tracing::warn;

use crate::parser::types::Ecosystem;
use crate::version::constraint::parse_constraint;
use crate::version::matcher::{CompareResult, VersionMatcher};
use crate::version::semver::parse_version;

pub struct NpmVersionMatcher;

impl VersionMatcher for NpmVersionMatcher {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    fn version_exists(&self, version_spec: &str, available_versions: &[String]) -> bool {
        let Ok(constraint) = parse_constraint(version_spec) else {
            return false;
        };

        available_versions.iter().any(|v| {
            parse_version(v)
                .map(|ver| constraint.satisfies(&ver))
                .unwrap_or(false)
        })
    }

    fn compare_to_latest(&self, current_version: &str, latest_version: &str) -> CompareResult {
        let Ok(constraint) = parse_constraint(current_version).inspect_err(|e| {
            warn!("Failed to parse constraint '{}': {}", current_version, e);
        }) else {
            return CompareResult::Invalid;
        };

        let Ok(latest) = parse_version(latest_version) else {
            return CompareResult::Invalid;
        };

        if constraint.satisfies(&latest) {
            return CompareResult::Latest;
        }

        if constraint.version < latest {
            CompareResult::Outdated
        } else {
            CompareResult::Newer
        }
    }
}
