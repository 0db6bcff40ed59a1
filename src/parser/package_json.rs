//! package.json reader and writer
//!
//! The document is held as an ordered JSON object so that writing it back
//! only changes the dependency values that were updated.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::parser::error::ManifestError;
use crate::parser::types::{Dependency, DependencyKind};

pub const MANIFEST_FILE: &str = "package.json";
pub const BACKUP_FILE: &str = "package.json.bak";

#[derive(Debug, Clone, PartialEq)]
pub struct PackageJson {
    document: Map<String, Value>,
}

impl PackageJson {
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let value: Value =
            serde_json::from_str(content).map_err(|e| ManifestError::json(MANIFEST_FILE, e))?;

        match value {
            Value::Object(document) => Ok(Self { document }),
            _ => Err(ManifestError::NotAnObject(MANIFEST_FILE.to_string())),
        }
    }

    pub fn read(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::io(path, e))?;
        Self::parse(&content)
    }

    pub fn name(&self) -> Option<&str> {
        self.document.get("name").and_then(Value::as_str)
    }

    pub fn version(&self) -> Option<&str> {
        self.document.get("version").and_then(Value::as_str)
    }

    /// String-valued entries of one dependency section, in declaration order.
    /// Non-string values are skipped.
    pub fn section(&self, kind: DependencyKind) -> IndexMap<String, String> {
        let Some(Value::Object(entries)) = self.document.get(kind.field()) else {
            return IndexMap::new();
        };

        entries
            .iter()
            .filter_map(|(name, value)| match value.as_str() {
                Some(constraint) => Some((name.clone(), constraint.to_string())),
                None => {
                    warn!(
                        "Ignoring non-string {} entry for {}",
                        kind.field(),
                        name
                    );
                    None
                }
            })
            .collect()
    }

    /// Declared dependencies, production first
    pub fn dependencies(&self, include_dev: bool) -> Vec<Dependency> {
        let mut kinds = vec![DependencyKind::Dependencies];
        if include_dev {
            kinds.push(DependencyKind::DevDependencies);
        }

        kinds
            .into_iter()
            .flat_map(|kind| {
                self.section(kind)
                    .into_iter()
                    .map(move |(name, constraint)| Dependency::new(&name, &constraint, kind))
            })
            .collect()
    }

    /// Replace the declared value of `name` in the `kind` section.
    /// Returns false when the dependency is not declared there.
    pub fn update_dependency(&mut self, kind: DependencyKind, name: &str, value: &str) -> bool {
        let Some(Value::Object(entries)) = self.document.get_mut(kind.field()) else {
            return false;
        };

        match entries.get_mut(name) {
            Some(slot) => {
                debug!("{}: {} -> {}", name, slot, value);
                *slot = Value::String(value.to_string());
                true
            }
            None => false,
        }
    }

    /// Pretty JSON with two-space indentation and a trailing newline
    pub fn to_json_string(&self) -> Result<String, ManifestError> {
        let mut rendered = serde_json::to_string_pretty(&self.document)
            .map_err(|e| ManifestError::json(MANIFEST_FILE, e))?;
        rendered.push('\n');
        Ok(rendered)
    }

    pub fn write_to_file(&self, path: &Path) -> Result<(), ManifestError> {
        let rendered = self.to_json_string()?;
        std::fs::write(path, rendered).map_err(|e| ManifestError::io(path, e))
    }
}

/// Look for package.json in `start` and its parents
pub fn find_package_json(start: &Path) -> Result<PathBuf, ManifestError> {
    start
        .ancestors()
        .map(|dir| dir.join(MANIFEST_FILE))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| ManifestError::NotFound(start.to_path_buf()))
}

/// Copy `manifest` to `package.json.bak` next to it
pub fn create_backup(manifest: &Path) -> Result<PathBuf, ManifestError> {
    let backup = manifest.with_file_name(BACKUP_FILE);
    std::fs::copy(manifest, &backup).map_err(|e| ManifestError::io(manifest, e))?;
    Ok(backup)
}

/// Line-by-line diff of two renderings of the same manifest.
///
/// Lines are paired by position, which is enough for in-place value edits
/// that never add or remove lines in the middle of the file.
pub fn generate_diff(original: &str, modified: &str) -> String {
    let original_lines: Vec<&str> = original.lines().collect();
    let modified_lines: Vec<&str> = modified.lines().collect();

    let mut diff = String::from("--- package.json (original)\n+++ package.json (modified)\n");

    for (i, line) in original_lines.iter().enumerate() {
        match modified_lines.get(i) {
            Some(updated) if updated == line => {}
            Some(updated) => {
                diff.push_str(&format!("- {line}\n+ {updated}\n"));
            }
            None => diff.push_str(&format!("- {line}\n")),
        }
    }

    for line in modified_lines.iter().skip(original_lines.len()) {
        diff.push_str(&format!("+ {line}\n"));
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"{
  "name": "web-app",
  "version": "1.0.0",
  "private": true,
  "dependencies": {
    "react": "^17.0.1",
    "lodash": "4.17.19",
    "my-fetch": "npm:node-fetch@^2.6.0",
    "local": {
      "path": "../local"
    }
  },
  "devDependencies": {
    "typescript": "~4.9.5"
  },
  "scripts": {
    "build": "tsc"
  }
}
"#;

    #[test]
    fn parse_reads_metadata_and_sections() {
        let manifest = PackageJson::parse(MANIFEST).unwrap();

        assert_eq!(manifest.name(), Some("web-app"));
        assert_eq!(manifest.version(), Some("1.0.0"));

        let deps = manifest.section(DependencyKind::Dependencies);
        assert_eq!(
            deps.keys().collect::<Vec<_>>(),
            vec!["react", "lodash", "my-fetch"]
        );
    }

    #[test]
    fn dependencies_respects_include_dev_and_aliases() {
        let manifest = PackageJson::parse(MANIFEST).unwrap();

        let prod_only = manifest.dependencies(false);
        assert_eq!(prod_only.len(), 3);
        assert_eq!(prod_only[2].package, "node-fetch");
        assert_eq!(prod_only[2].constraint, "^2.6.0");

        let all = manifest.dependencies(true);
        assert_eq!(all.len(), 4);
        assert_eq!(all[3].name, "typescript");
        assert_eq!(all[3].kind, DependencyKind::DevDependencies);
    }

    #[test]
    fn parse_rejects_non_object_and_invalid_json() {
        assert!(matches!(
            PackageJson::parse("[]"),
            Err(ManifestError::NotAnObject(_))
        ));
        assert!(matches!(
            PackageJson::parse("{ nope"),
            Err(ManifestError::Json { .. })
        ));
    }

    #[test]
    fn missing_sections_are_empty() {
        let manifest = PackageJson::parse(r#"{ "name": "bare" }"#).unwrap();
        assert!(manifest.dependencies(true).is_empty());
    }

    #[test]
    fn update_dependency_preserves_layout_of_untouched_fields() {
        let mut manifest = PackageJson::parse(MANIFEST).unwrap();

        assert!(manifest.update_dependency(DependencyKind::Dependencies, "react", "^17.0.2"));
        assert!(!manifest.update_dependency(DependencyKind::DevDependencies, "react", "^18.0.0"));
        assert!(!manifest.update_dependency(DependencyKind::Dependencies, "missing", "1.0.0"));

        let rendered = manifest.to_json_string().unwrap();
        assert_eq!(rendered, MANIFEST.replace("^17.0.1", "^17.0.2"));
    }

    #[test]
    fn write_backup_and_diff_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        std::fs::write(&path, "{\n  \"dependencies\": {\n    \"react\": \"^17.0.1\"\n  }\n}\n").unwrap();

        let backup = create_backup(&path).unwrap();
        assert_eq!(backup, dir.path().join(BACKUP_FILE));

        let mut manifest = PackageJson::read(&path).unwrap();
        manifest.update_dependency(DependencyKind::Dependencies, "react", "^17.0.2");
        manifest.write_to_file(&path).unwrap();

        let original = std::fs::read_to_string(&backup).unwrap();
        let modified = std::fs::read_to_string(&path).unwrap();
        let diff = generate_diff(&original, &modified);

        assert_eq!(
            diff,
            "--- package.json (original)\n+++ package.json (modified)\n\
             -     \"react\": \"^17.0.1\"\n\
             +     \"react\": \"^17.0.2\"\n"
        );
    }

    #[test]
    fn generate_diff_reports_added_and_removed_tail_lines() {
        let diff = generate_diff("a\nb\nc", "a\nx");
        assert!(diff.contains("- b\n+ x\n"));
        assert!(diff.contains("- c\n"));

        let diff = generate_diff("a", "a\nb");
        assert!(diff.ends_with("+ b\n"));
    }

    #[test]
    fn find_package_json_walks_up_parents() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("packages/app/src");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "{}").unwrap();

        assert_eq!(
            find_package_json(&nested).unwrap(),
            dir.path().join(MANIFEST_FILE)
        );
    }
}
