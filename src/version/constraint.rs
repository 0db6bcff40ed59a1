//! Declared dependency constraints (`^1.2.3`, `~1.2.3`, `>=1.0.0`, `1.2.3`)
//!
//! A constraint is a single operator applied to a single version. Compound
//! npm ranges (`||`, hyphen ranges, wildcards) are not constraints in this
//! sense; they fail to parse and are reported per package.

use std::fmt;
use std::str::FromStr;

use crate::version::error::VersionError;
use crate::version::semver::{Version, parse_version};

/// Operator prefix of a constraint.
///
/// `None` and `Eq` both mean exact match; they are kept apart so the
/// operator can be written back exactly as it was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    None,
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Caret,
    Tilde,
}

impl Operator {
    /// Prefix tokens in longest-match order so `>=` is never split into `>` + `=`.
    const PREFIXES: [(&'static str, Operator); 7] = [
        (">=", Operator::Gte),
        ("<=", Operator::Lte),
        (">", Operator::Gt),
        ("<", Operator::Lt),
        ("=", Operator::Eq),
        ("^", Operator::Caret),
        ("~", Operator::Tilde),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::None => "",
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Caret => "^",
            Operator::Tilde => "~",
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Operator::None | Operator::Eq)
    }

    /// Split a leading operator token off `input`.
    pub fn split_prefix(input: &str) -> (Operator, &str) {
        Self::PREFIXES
            .iter()
            .find_map(|(token, op)| input.strip_prefix(token).map(|rest| (*op, rest)))
            .unwrap_or((Operator::None, input))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constraint {
    pub operator: Operator,
    pub version: Version,
}

impl Constraint {
    pub fn new(operator: Operator, version: Version) -> Self {
        Self { operator, version }
    }

    /// Check if `version` falls inside this constraint's range
    pub fn satisfies(&self, version: &Version) -> bool {
        let base = &self.version;
        match self.operator {
            Operator::None | Operator::Eq => version == base,
            Operator::Gt => version > base,
            Operator::Gte => version >= base,
            Operator::Lt => version < base,
            Operator::Lte => version <= base,
            Operator::Caret => {
                // ^0.0.x pins the patch exactly, so its pre-releases stay in
                caret_compatible(version, base)
                    && ((base.major == 0 && base.minor == 0) || version >= base)
            }
            Operator::Tilde => {
                // ~1.2.3 -> >=1.2.3 <1.3.0
                version.major == base.major && version.minor == base.minor && version >= base
            }
        }
    }
}

/// Same leftmost non-zero component as `base`.
///
/// ^1.2.3 -> same major
/// ^0.2.3 -> major 0, same minor
/// ^0.0.3 -> major 0, minor 0, same patch
pub(crate) fn caret_compatible(version: &Version, base: &Version) -> bool {
    if base.major > 0 {
        version.major == base.major
    } else if base.minor > 0 {
        version.major == 0 && version.minor == base.minor
    } else {
        version.major == 0 && version.minor == 0 && version.patch == base.patch
    }
}

/// Parse an operator-prefixed constraint such as `^1.2.3` or `>= 2.0`.
pub fn parse_constraint(input: &str) -> Result<Constraint, VersionError> {
    let (operator, body) = Operator::split_prefix(input.trim());
    let version = parse_version(body.trim())
        .map_err(|_| VersionError::MalformedConstraint(input.to_string()))?;
    Ok(Constraint { operator, version })
}

/// Whether `version` satisfies `constraint`.
pub fn satisfies(version: &Version, constraint: &Constraint) -> bool {
    constraint.satisfies(version)
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.operator, self.version)
    }
}

impl FromStr for Constraint {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_constraint(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn v(s: &str) -> Version {
        parse_version(s).unwrap()
    }

    fn c(s: &str) -> Constraint {
        parse_constraint(s).unwrap()
    }

    #[rstest]
    #[case("^1.2.3", Operator::Caret, "1.2.3")]
    #[case("~1.2.3", Operator::Tilde, "1.2.3")]
    #[case(">=1.0.0", Operator::Gte, "1.0.0")]
    #[case("<=1.0.0", Operator::Lte, "1.0.0")]
    #[case(">1.0.0", Operator::Gt, "1.0.0")]
    #[case("<1.0.0", Operator::Lt, "1.0.0")]
    #[case("=1.0.0", Operator::Eq, "1.0.0")]
    #[case("1.0.0", Operator::None, "1.0.0")]
    #[case(">= 1.2", Operator::Gte, "1.2.0")]
    #[case("^v0.14", Operator::Caret, "0.14.0")]
    #[case(" ~1.2.3-beta.2 ", Operator::Tilde, "1.2.3-beta.2")]
    fn parse_constraint_splits_operator(
        #[case] input: &str,
        #[case] operator: Operator,
        #[case] version: &str,
    ) {
        let parsed = c(input);
        assert_eq!(parsed.operator, operator);
        assert_eq!(parsed.version, v(version));
    }

    #[rstest]
    #[case("")]
    #[case("^")]
    #[case(">=")]
    #[case("*")]
    #[case("latest")]
    #[case("^1.x")]
    #[case(">=1.0.0 <2.0.0")]
    #[case("^1.0.0 || ^2.0.0")]
    #[case("=>1.0.0")]
    #[case("workspace:*")]
    fn parse_constraint_rejects_malformed(#[case] input: &str) {
        assert_eq!(
            parse_constraint(input),
            Err(VersionError::MalformedConstraint(input.to_string()))
        );
    }

    #[rstest]
    #[case("1.2.3", "^1.2.0", true)]
    #[case("1.9.9", "^1.2.3", true)]
    #[case("1.2.3", "^1.2.3", true)]
    #[case("1.2.2", "^1.2.3", false)]
    #[case("2.0.0", "^1.2.3", false)]
    #[case("0.2.5", "^0.2.3", true)]
    #[case("0.2.3", "^0.2.3", true)]
    #[case("0.2.2", "^0.2.3", false)]
    #[case("0.3.0", "^0.2.3", false)]
    #[case("1.2.5", "^0.2.3", false)]
    #[case("0.0.3", "^0.0.3", true)]
    #[case("0.0.4", "^0.0.3", false)]
    #[case("0.1.3", "^0.0.3", false)]
    #[case("0.0.3-rc.1", "^0.0.3", true)]
    #[case("0.0.2", "^0.0.3", false)]
    #[case("2.0.0-rc.1", "^1.2.3", false)]
    #[case("1.5.0-rc.1", "^1.2.3", true)]
    fn caret_boundaries(#[case] version: &str, #[case] constraint: &str, #[case] expected: bool) {
        assert_eq!(satisfies(&v(version), &c(constraint)), expected);
    }

    #[rstest]
    #[case("1.2.3", "~1.2.3", true)]
    #[case("1.2.4", "~1.2.3", true)]
    #[case("1.2.99", "~1.2.3", true)]
    #[case("1.2.2", "~1.2.3", false)]
    #[case("1.3.0", "~1.2.3", false)]
    #[case("2.2.3", "~1.2.3", false)]
    #[case("1.2.3-beta", "~1.2.3", false)]
    #[case("0.2.0", "~0.2", true)]
    fn tilde_boundaries(#[case] version: &str, #[case] constraint: &str, #[case] expected: bool) {
        assert_eq!(satisfies(&v(version), &c(constraint)), expected);
    }

    #[rstest]
    #[case("1.0.0", ">=1.0.0", true)]
    #[case("0.9.9", ">=1.0.0", false)]
    #[case("1.0.1", ">1.0.0", true)]
    #[case("1.0.0", ">1.0.0", false)]
    #[case("1.0.0", "<=1.0.0", true)]
    #[case("1.0.1", "<=1.0.0", false)]
    #[case("0.9.9", "<1.0.0", true)]
    #[case("1.0.0", "<1.0.0", false)]
    #[case("1.0.0-rc.1", "<1.0.0", true)]
    #[case("1.0.0", "1.0.0", true)]
    #[case("1.0.0", "=1.0.0", true)]
    #[case("1.0.0+build", "1.0.0", true)]
    #[case("1.0.1", "=1.0.0", false)]
    fn comparison_and_exact_operators(
        #[case] version: &str,
        #[case] constraint: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(satisfies(&v(version), &c(constraint)), expected);
    }

    #[rstest]
    #[case("^1.2.3")]
    #[case("=1.0.0")]
    #[case("1.0.0")]
    #[case(">=2.0.0-rc.1")]
    fn display_preserves_declared_operator(#[case] input: &str) {
        assert_eq!(c(input).to_string(), input);
    }
}
