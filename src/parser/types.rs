//! Common types for manifest parsing

use serde::Serialize;

/// Package ecosystem, as advisory databases name it.
///
/// Only npm manifests are read, so npm is the only ecosystem scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Npm,
}

impl Ecosystem {
    /// Returns the string representation of the ecosystem
    pub fn as_str(&self) -> &'static str {
        match self {
            Ecosystem::Npm => "npm",
        }
    }
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which manifest section a dependency was declared in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyKind {
    Dependencies,
    DevDependencies,
}

impl DependencyKind {
    /// Key of the section in package.json
    pub fn field(&self) -> &'static str {
        match self {
            DependencyKind::Dependencies => "dependencies",
            DependencyKind::DevDependencies => "devDependencies",
        }
    }
}

/// A dependency declared in a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    /// Key in the manifest section
    pub name: String,
    /// Name to look up in registries; differs from `name` for `npm:` aliases
    pub package: String,
    /// Declared constraint string (e.g. "^1.2.3"), alias prefix removed
    pub constraint: String,
    pub kind: DependencyKind,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub alias: bool,
}

impl Dependency {
    pub fn new(name: &str, constraint: &str, kind: DependencyKind) -> Self {
        match parse_npm_alias(constraint) {
            Some((package, constraint)) => Self {
                name: name.to_string(),
                package,
                constraint,
                kind,
                alias: true,
            },
            None => Self {
                name: name.to_string(),
                package: name.to_string(),
                constraint: constraint.to_string(),
                kind,
                alias: false,
            },
        }
    }

    /// Manifest value for a new constraint, keeping the alias wrapper
    pub fn render(&self, constraint: &str) -> String {
        if self.alias {
            format!("npm:{}@{}", self.package, constraint)
        } else {
            constraint.to_string()
        }
    }
}

/// Parse npm alias format: npm:package@version or npm:@scope/package@version
/// Returns (actual_package_name, version)
pub fn parse_npm_alias(value: &str) -> Option<(String, String)> {
    let rest = value.strip_prefix("npm:")?;

    // Handle scoped packages: @scope/package@version
    if rest.starts_with('@') {
        let slash_pos = rest.find('/')?;
        let after_slash = &rest[slash_pos + 1..];

        if let Some(at_pos) = after_slash.find('@') {
            let package_name = &rest[..slash_pos + 1 + at_pos];
            let version = &after_slash[at_pos + 1..];
            Some((package_name.to_string(), version.to_string()))
        } else {
            // No version: @scope/package -> use "latest"
            Some((rest.to_string(), "latest".to_string()))
        }
    } else if let Some(at_pos) = rest.find('@') {
        let package_name = &rest[..at_pos];
        let version = &rest[at_pos + 1..];
        Some((package_name.to_string(), version.to_string()))
    } else {
        Some((rest.to_string(), "latest".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn ecosystem_renders_advisory_name() {
        assert_eq!(Ecosystem::Npm.to_string(), "npm");
        assert_eq!(serde_json::to_value(Ecosystem::Npm).unwrap(), "npm");
    }

    #[rstest]
    #[case("npm:lodash@^4.17.0", Some(("lodash", "^4.17.0")))]
    #[case("npm:@types/node@~20.1.0", Some(("@types/node", "~20.1.0")))]
    #[case("npm:@types/node", Some(("@types/node", "latest")))]
    #[case("npm:lodash", Some(("lodash", "latest")))]
    #[case("^4.17.0", None)]
    fn parse_npm_alias_returns_expected(
        #[case] input: &str,
        #[case] expected: Option<(&str, &str)>,
    ) {
        assert_eq!(
            parse_npm_alias(input),
            expected.map(|(p, v)| (p.to_string(), v.to_string()))
        );
    }

    #[test]
    fn dependency_render_keeps_alias_wrapper() {
        let aliased = Dependency::new("my-lodash", "npm:lodash@^4.17.0", DependencyKind::Dependencies);
        assert_eq!(aliased.package, "lodash");
        assert_eq!(aliased.constraint, "^4.17.0");
        assert_eq!(aliased.render("^4.17.21"), "npm:lodash@^4.17.21");

        let plain = Dependency::new("react", "^18.0.0", DependencyKind::DevDependencies);
        assert_eq!(plain.package, "react");
        assert_eq!(plain.render("^18.2.0"), "^18.2.0");
    }
}
