//! Affected-version ranges as advisory databases publish them
//!
//! Two shapes are supported:
//! - bounded ranges (NVD CPE matches): up to four optional start/end bounds
//! - comparator strings (GitHub advisories): `"< 4.17.21"`, `">= 1.0.0, < 1.2.4"`
//!
//! An installed version is affected by a bounded range when it passes every
//! bound that is present, and by a comparator list when any one entry matches.

use crate::version::constraint::{Operator, parse_constraint};
use crate::version::error::VersionError;
use crate::version::semver::{Version, parse_version};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundedRange {
    pub start_excluding: Option<Version>,
    pub start_including: Option<Version>,
    pub end_excluding: Option<Version>,
    pub end_including: Option<Version>,
}

impl BoundedRange {
    /// Builds a range from raw bound strings. Empty or whitespace-only strings
    /// count as absent; any other bound that fails to parse is an error.
    pub fn from_raw(
        start_excluding: Option<&str>,
        start_including: Option<&str>,
        end_excluding: Option<&str>,
        end_including: Option<&str>,
    ) -> Result<Self, VersionError> {
        Ok(Self {
            start_excluding: parse_bound(start_excluding)?,
            start_including: parse_bound(start_including)?,
            end_excluding: parse_bound(end_excluding)?,
            end_including: parse_bound(end_including)?,
        })
    }

    /// A range with no bounds affects every version
    pub fn is_unbounded(&self) -> bool {
        self.start_excluding.is_none()
            && self.start_including.is_none()
            && self.end_excluding.is_none()
            && self.end_including.is_none()
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.start_excluding.as_ref().is_none_or(|b| version > b)
            && self.start_including.as_ref().is_none_or(|b| version >= b)
            && self.end_excluding.as_ref().is_none_or(|b| version < b)
            && self.end_including.as_ref().is_none_or(|b| version <= b)
    }
}

fn parse_bound(raw: Option<&str>) -> Result<Option<Version>, VersionError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(bound) => parse_version(bound).map(Some),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRange {
    Bounded(BoundedRange),
    /// Entries are alternatives; comparators inside one entry must all hold
    Comparators(Vec<String>),
}

/// Whether `version` lies inside `range`
pub fn is_affected(version: &Version, range: &VersionRange) -> bool {
    match range {
        VersionRange::Bounded(bounded) => bounded.contains(version),
        VersionRange::Comparators(entries) => entries
            .iter()
            .any(|entry| comparator_entry_matches(version, entry)),
    }
}

/// Like [`is_affected`], parsing the installed version first
pub fn is_affected_raw(version: &str, range: &VersionRange) -> Result<bool, VersionError> {
    let version = parse_version(version)?;
    Ok(is_affected(&version, range))
}

/// One comparator entry, e.g. `">= 1.0.0, < 1.2.4"`. Entries that are empty or
/// contain a token that does not parse never match.
fn comparator_entry_matches(version: &Version, entry: &str) -> bool {
    let tokens = comparator_tokens(entry);
    if tokens.is_empty() {
        return false;
    }

    let mut all_hold = true;
    for token in &tokens {
        match parse_constraint(token) {
            Ok(constraint) => all_hold &= constraint.satisfies(version),
            Err(_) => return false,
        }
    }
    all_hold
}

/// Splits on whitespace and commas, gluing a bare operator (`>=`) to the
/// version token that follows it.
fn comparator_tokens(entry: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut pending_operator: Option<&str> = None;

    for piece in entry
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|p| !p.is_empty())
    {
        let (operator, rest) = Operator::split_prefix(piece);
        match pending_operator.take() {
            Some(op) => tokens.push(format!("{op}{piece}")),
            None if operator != Operator::None && rest.is_empty() => {
                pending_operator = Some(piece);
            }
            None => tokens.push(piece.to_string()),
        }
    }

    // dangling operator with no version
    if let Some(op) = pending_operator {
        tokens.push(op.to_string());
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn v(s: &str) -> Version {
        parse_version(s).unwrap()
    }

    fn bounded(
        start_excluding: Option<&str>,
        start_including: Option<&str>,
        end_excluding: Option<&str>,
        end_including: Option<&str>,
    ) -> VersionRange {
        VersionRange::Bounded(
            BoundedRange::from_raw(start_excluding, start_including, end_excluding, end_including)
                .unwrap(),
        )
    }

    fn comparators(entries: &[&str]) -> VersionRange {
        VersionRange::Comparators(entries.iter().map(|s| s.to_string()).collect())
    }

    #[rstest]
    #[case("1.5.0", true)]
    #[case("1.0.0", true)]
    #[case("2.0.0", false)]
    #[case("0.9.9", false)]
    #[case("2.0.0-rc.1", true)]
    fn bounded_start_including_end_excluding(#[case] version: &str, #[case] expected: bool) {
        let range = bounded(None, Some("1.0.0"), Some("2.0.0"), None);
        assert_eq!(is_affected(&v(version), &range), expected);
    }

    #[rstest]
    #[case("1.0.0", false)]
    #[case("1.0.1", true)]
    #[case("2.0.0", true)]
    #[case("2.0.1", false)]
    fn bounded_start_excluding_end_including(#[case] version: &str, #[case] expected: bool) {
        let range = bounded(Some("1.0.0"), None, None, Some("2.0.0"));
        assert_eq!(is_affected(&v(version), &range), expected);
    }

    #[rstest]
    #[case("4.17.19", true)]
    #[case("4.17.20", false)]
    fn bounded_end_excluding_only(#[case] version: &str, #[case] expected: bool) {
        let range = bounded(None, None, Some("4.17.20"), None);
        assert_eq!(is_affected(&v(version), &range), expected);
    }

    #[rstest]
    #[case("0.0.1")]
    #[case("99.0.0")]
    #[case("1.0.0-alpha")]
    fn bounded_without_bounds_affects_everything(#[case] version: &str) {
        let range = bounded(None, Some(""), Some("  "), None);
        assert!(is_affected(&v(version), &range));
    }

    #[test]
    fn bounded_from_raw_rejects_malformed_bound() {
        assert_eq!(
            BoundedRange::from_raw(None, Some("1.x"), None, None),
            Err(VersionError::MalformedVersion("1.x".to_string()))
        );
    }

    #[rstest]
    #[case(&["< 4.17.21"], "4.17.20", true)]
    #[case(&["< 4.17.21"], "4.17.21", false)]
    #[case(&["<= 4.17.21"], "4.17.21", true)]
    #[case(&["> 1.0.0"], "1.0.0", false)]
    #[case(&[">= 1.0.0, < 1.2.4"], "1.2.3", true)]
    #[case(&[">= 1.0.0, < 1.2.4"], "1.2.4", false)]
    #[case(&[">= 1.0.0, < 1.2.4"], "0.9.0", false)]
    #[case(&[">=1.0.0 <2.0.0"], "1.5.0", true)]
    #[case(&[">=1.0.0 <2.0.0"], "2.0.0", false)]
    #[case(&["= 1.2.3"], "1.2.3", true)]
    #[case(&["1.2.3"], "1.2.3", true)]
    #[case(&["1.2.3"], "1.2.4", false)]
    #[case(&["< 1.0.0", ">= 2.0.0, < 2.1.0"], "2.0.5", true)]
    #[case(&["< 1.0.0", ">= 2.0.0, < 2.1.0"], "1.5.0", false)]
    #[case(&[">= 1.0.0, < 2.0.0, != 1.5.0"], "1.2.0", false)]
    #[case(&["<1.0.0", ">=1.2.0 <1.3.0"], "1.2.3", true)]
    #[case(&["garbage", "< 2.0.0"], "1.0.0", true)]
    #[case(&["garbage"], "1.0.0", false)]
    #[case(&[""], "1.0.0", false)]
    #[case(&[">="], "1.0.0", false)]
    #[case(&[], "1.0.0", false)]
    fn comparator_ranges(
        #[case] entries: &[&str],
        #[case] version: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(is_affected(&v(version), &comparators(entries)), expected);
    }

    #[test]
    fn is_affected_raw_rejects_malformed_version() {
        let range = comparators(&["< 2.0.0"]);
        assert_eq!(
            is_affected_raw("not-a-version", &range),
            Err(VersionError::MalformedVersion("not-a-version".to_string()))
        );
        assert_eq!(is_affected_raw("v1.0.0", &range), Ok(true));
    }

    #[rstest]
    #[case(">= 1.0.0, < 2.0.0", vec![">=1.0.0", "<2.0.0"])]
    #[case(">=1.0.0 <2.0.0", vec![">=1.0.0", "<2.0.0"])]
    #[case("<  4.17.21", vec!["<4.17.21"])]
    #[case("1.2.3", vec!["1.2.3"])]
    #[case(">=", vec![">="])]
    fn comparator_tokens_glue_operators(#[case] entry: &str, #[case] expected: Vec<&str>) {
        assert_eq!(comparator_tokens(entry), expected);
    }
}
