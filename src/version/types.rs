//! Common types shared by registries and the upgrade planner

use std::collections::HashMap;

use crate::version::semver::find_semantic_max;

/// Versions published for one package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageVersions {
    /// Raw version strings, ordered from oldest to newest
    pub versions: Vec<String>,
    /// Registry dist-tags (e.g. {"latest": "4.17.21", "next": "5.0.0-rc.1"})
    pub dist_tags: HashMap<String, String>,
}

impl PackageVersions {
    pub fn new(versions: Vec<String>) -> Self {
        Self {
            versions,
            dist_tags: HashMap::new(),
        }
    }

    pub fn with_dist_tags(mut self, dist_tags: HashMap<String, String>) -> Self {
        self.dist_tags = dist_tags;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// The version the registry advertises as latest.
    ///
    /// Prioritizes dist-tag "latest" over the semantic max version.
    pub fn latest(&self) -> Option<String> {
        if let Some(latest) = self.dist_tags.get("latest") {
            return Some(latest.clone());
        }
        find_semantic_max(&self.versions)
    }
}
