use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::version::error::VersionError;

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^v?(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-([0-9A-Za-z.-]+))?(?:\+([0-9A-Za-z.-]+))?$",
    )
    .expect("version pattern is valid")
});

/// Parsed dotted version.
///
/// Ordering compares major, minor and patch numerically. A release outranks
/// any pre-release of the same triple, and two pre-releases compare by plain
/// byte order of their identifier strings (so `rc.10 < rc.9`). Build metadata
/// is kept for display but never takes part in ordering or equality.
#[derive(Debug, Clone, Default)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: String,
    pub build: String,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            ..Self::default()
        }
    }

    pub fn is_prerelease(&self) -> bool {
        !self.prerelease.is_empty()
    }
}

/// Parse a version string, normalizing partial versions.
///
/// Accepts an optional leading `v` and pads missing components with zeros:
/// - "1" -> 1.0.0
/// - "v1.2" -> 1.2.0
/// - "1.2.3-beta.1+build.5" -> 1.2.3 with pre-release and build metadata
pub fn parse_version(version: &str) -> Result<Version, VersionError> {
    let malformed = || VersionError::MalformedVersion(version.to_string());

    let captures = VERSION_PATTERN
        .captures(version.trim())
        .ok_or_else(malformed)?;

    let component = |index: usize| -> Result<u64, VersionError> {
        match captures.get(index) {
            Some(m) => m.as_str().parse::<u64>().map_err(|_| malformed()),
            None => Ok(0),
        }
    };
    let text = |index: usize| {
        captures
            .get(index)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    };

    Ok(Version {
        major: component(1)?,
        minor: component(2)?,
        patch: component(3)?,
        prerelease: text(4),
        build: text(5),
    })
}

/// Total order over two versions; see [`Version`] for the rules.
pub fn compare(a: &Version, b: &Version) -> Ordering {
    a.major
        .cmp(&b.major)
        .then(a.minor.cmp(&b.minor))
        .then(a.patch.cmp(&b.patch))
        .then_with(|| match (a.is_prerelease(), b.is_prerelease()) {
            (false, false) => Ordering::Equal,
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            // Lexical on purpose: numeric-aware identifier comparison is not applied.
            (true, true) => a.prerelease.as_bytes().cmp(b.prerelease.as_bytes()),
        })
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major.hash(state);
        self.minor.hash(state);
        self.patch.hash(state);
        self.prerelease.hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.prerelease.is_empty() {
            write!(f, "-{}", self.prerelease)?;
        }
        if !self.build.is_empty() {
            write!(f, "+{}", self.build)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_version(s)
    }
}

/// Find the semantically maximum version from a list
///
/// Returns the original string of the winner. Invalid versions are skipped.
pub fn find_semantic_max(versions: &[String]) -> Option<String> {
    versions
        .iter()
        .filter_map(|v| parse_version(v).ok().map(|parsed| (v, parsed)))
        .max_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(original, _)| original.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn v(s: &str) -> Version {
        parse_version(s).unwrap()
    }

    #[rstest]
    #[case("1.2.3", 1, 2, 3, "", "")]
    #[case("v1.2.3", 1, 2, 3, "", "")]
    #[case("1", 1, 0, 0, "", "")]
    #[case("1.2", 1, 2, 0, "", "")]
    #[case("  4.17.21 ", 4, 17, 21, "", "")]
    #[case("1.0.0-beta.1", 1, 0, 0, "beta.1", "")]
    #[case("1.0.0+build.5", 1, 0, 0, "", "build.5")]
    #[case("2.0.0-rc-1+sha.abc", 2, 0, 0, "rc-1", "sha.abc")]
    fn parse_version_accepts_grammar(
        #[case] input: &str,
        #[case] major: u64,
        #[case] minor: u64,
        #[case] patch: u64,
        #[case] prerelease: &str,
        #[case] build: &str,
    ) {
        let parsed = parse_version(input).unwrap();
        assert_eq!(
            (parsed.major, parsed.minor, parsed.patch),
            (major, minor, patch)
        );
        assert_eq!(parsed.prerelease, prerelease);
        assert_eq!(parsed.build, build);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("latest")]
    #[case("1.2.3.4")]
    #[case("1.x")]
    #[case("^1.2.3")]
    #[case("1.2.3-")]
    #[case("1.2.3-beta_1")]
    #[case("99999999999999999999999.0.0")]
    fn parse_version_rejects_malformed(#[case] input: &str) {
        assert!(matches!(
            parse_version(input),
            Err(VersionError::MalformedVersion(raw)) if raw == input
        ));
    }

    #[rstest]
    #[case("1.0.0", "2.0.0", Ordering::Less)]
    #[case("1.2.0", "1.10.0", Ordering::Less)]
    #[case("1.2.3", "1.2.4", Ordering::Less)]
    #[case("1.2.3", "1.2.3", Ordering::Equal)]
    #[case("1.2.3", "v1.2.3", Ordering::Equal)]
    #[case("1.0.0", "1.0.0-rc.1", Ordering::Greater)]
    #[case("1.0.0-alpha", "1.0.0-beta", Ordering::Less)]
    #[case("1.0.0-alpha", "1.0.0-alpha", Ordering::Equal)]
    // byte ordering, not numeric-aware identifier comparison
    #[case("1.0.0-rc.10", "1.0.0-rc.9", Ordering::Less)]
    #[case("1.0.0+a", "1.0.0+b", Ordering::Equal)]
    #[case("0.9.9", "1.0.0-alpha", Ordering::Less)]
    fn compare_orders_versions(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        assert_eq!(compare(&v(a), &v(b)), expected);
        assert_eq!(compare(&v(b), &v(a)), expected.reverse());
    }

    #[test]
    fn compare_is_transitive_and_sorts() {
        let mut versions: Vec<Version> = [
            "2.0.0",
            "1.0.0-beta",
            "1.0.0",
            "0.1.0",
            "1.0.0-alpha",
            "1.10.0",
            "1.2.0",
        ]
        .iter()
        .map(|s| v(s))
        .collect();
        versions.sort();

        let rendered: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "0.1.0",
                "1.0.0-alpha",
                "1.0.0-beta",
                "1.0.0",
                "1.2.0",
                "1.10.0",
                "2.0.0"
            ]
        );
        for window in versions.windows(3) {
            assert!(window[0] <= window[1] && window[1] <= window[2]);
            assert!(window[0] <= window[2]);
        }
    }

    #[rstest]
    #[case("1.2.3")]
    #[case("0.0.0")]
    #[case("10.20.30-rc.1")]
    #[case("1.0.0-x-y.z")]
    fn display_round_trips_without_build(#[case] input: &str) {
        let parsed = v(input);
        assert_eq!(parsed.to_string(), input);
        assert_eq!(v(&parsed.to_string()), parsed);
    }

    #[test]
    fn display_normalizes_partial_and_prefixed_versions() {
        assert_eq!(v("v2").to_string(), "2.0.0");
        assert_eq!(v("1.0.0+build.1").to_string(), "1.0.0+build.1");
    }

    #[rstest]
    #[case(vec![], None)]
    #[case(vec!["v1.0.0", "v2.0.0", "v1.5.0"], Some("v2.0.0"))]
    #[case(vec!["1.0.0", "2.0.0-rc.1", "1.5.0"], Some("2.0.0-rc.1"))]
    #[case(vec!["2.0.0-rc.1", "2.0.0"], Some("2.0.0"))]
    #[case(vec!["invalid", "v1.0.0", "not-semver"], Some("v1.0.0"))]
    #[case(vec!["invalid", "not-semver"], None)]
    fn find_semantic_max_returns_expected(
        #[case] versions: Vec<&str>,
        #[case] expected: Option<&str>,
    ) {
        let versions: Vec<String> = versions.into_iter().map(|s| s.to_string()).collect();
        assert_eq!(
            find_semantic_max(&versions),
            expected.map(|s| s.to_string())
        );
    }
}
