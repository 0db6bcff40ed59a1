//! package-lock.json reader
//!
//! Only the installed version of top-level packages is needed, so both
//! lockfile layouts are reduced to a name -> version map:
//! - v2/v3: `packages["node_modules/<name>"].version`
//! - v1: `dependencies["<name>"].version`

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::parser::error::ManifestError;

pub const LOCK_FILE: &str = "package-lock.json";

const NODE_MODULES_PREFIX: &str = "node_modules/";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLockfile {
    #[serde(default)]
    lockfile_version: Option<u32>,
    #[serde(default)]
    packages: HashMap<String, LockEntry>,
    #[serde(default)]
    dependencies: HashMap<String, LockEntry>,
}

#[derive(Debug, Deserialize)]
struct LockEntry {
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PackageLock {
    lockfile_version: Option<u32>,
    installed: HashMap<String, String>,
}

impl PackageLock {
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let raw: RawLockfile =
            serde_json::from_str(content).map_err(|e| ManifestError::json(LOCK_FILE, e))?;

        let mut installed: HashMap<String, String> = raw
            .dependencies
            .into_iter()
            .filter_map(|(name, entry)| entry.version.map(|v| (name, v)))
            .collect();

        // `packages` is authoritative when both are present
        for (key, entry) in raw.packages {
            let Some(name) = key.strip_prefix(NODE_MODULES_PREFIX) else {
                continue;
            };
            // nested installs look like node_modules/a/node_modules/b
            if name.contains("/node_modules/") {
                continue;
            }
            if let Some(version) = entry.version {
                installed.insert(name.to_string(), version);
            }
        }

        Ok(Self {
            lockfile_version: raw.lockfile_version,
            installed,
        })
    }

    pub fn read(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::io(path, e))?;
        Self::parse(&content)
    }

    /// Reads the lockfile next to `manifest`, if one exists
    pub fn read_beside(manifest: &Path) -> Result<Option<Self>, ManifestError> {
        let path = manifest.with_file_name(LOCK_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        Self::read(&path).map(Some)
    }

    pub fn lockfile_version(&self) -> Option<u32> {
        self.lockfile_version
    }

    pub fn installed_version(&self, name: &str) -> Option<&str> {
        self.installed.get(name).map(String::as_str)
    }
}
