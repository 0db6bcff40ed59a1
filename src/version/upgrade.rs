//! Best-upgrade selection for a declared constraint

use std::fmt;

use tracing::debug;

use crate::version::constraint::{Constraint, Operator, caret_compatible};
use crate::version::semver::{Version, parse_version};

/// Outcome of upgrade selection. None of these is an error: a constraint
/// with no eligible candidate simply has nothing to offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeDecision {
    /// Re-prefixed with the declared operator, e.g. `^17.0.2`
    Upgrade(Constraint),
    /// Exact pin with nothing newer on its major line
    AlreadyLatest,
    NoEligibleUpgrade,
}

impl UpgradeDecision {
    pub fn upgrade(&self) -> Option<&Constraint> {
        match self {
            UpgradeDecision::Upgrade(constraint) => Some(constraint),
            _ => None,
        }
    }
}

impl fmt::Display for UpgradeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeDecision::Upgrade(constraint) => write!(f, "{constraint}"),
            UpgradeDecision::AlreadyLatest => f.write_str("already at latest"),
            UpgradeDecision::NoEligibleUpgrade => f.write_str("no eligible upgrade"),
        }
    }
}

/// Whether `candidate` is a strictly newer replacement that stays inside the
/// range the declared operator allows.
fn is_eligible(constraint: &Constraint, candidate: &Version) -> bool {
    let base = &constraint.version;
    if candidate <= base {
        return false;
    }
    match constraint.operator {
        Operator::Caret => caret_compatible(candidate, base),
        Operator::Tilde => candidate.major == base.major && candidate.minor == base.minor,
        Operator::Gt | Operator::Gte => true,
        // Upper bounds cannot be satisfied by anything above their own version.
        Operator::Lt | Operator::Lte => constraint.satisfies(candidate),
        // Exact pins move forward within their major line.
        Operator::None | Operator::Eq => candidate.major == base.major,
    }
}

/// Pick the greatest eligible candidate for `constraint`.
///
/// When several candidates compare equal the first one encountered wins, so
/// the winner among equal versions (e.g. differing only in build metadata)
/// depends on candidate order.
pub fn select_best_upgrade(constraint: &Constraint, candidates: &[Version]) -> UpgradeDecision {
    if candidates.is_empty() {
        return UpgradeDecision::NoEligibleUpgrade;
    }

    let best = candidates
        .iter()
        .filter(|candidate| is_eligible(constraint, candidate))
        .fold(None::<&Version>, |best, candidate| match best {
            Some(current) if candidate <= current => Some(current),
            _ => Some(candidate),
        });

    match best {
        Some(version) => {
            debug!("best upgrade for {}: {}", constraint, version);
            UpgradeDecision::Upgrade(Constraint::new(constraint.operator, version.clone()))
        }
        None if constraint.operator.is_exact() => UpgradeDecision::AlreadyLatest,
        None => UpgradeDecision::NoEligibleUpgrade,
    }
}

/// Same as [`select_best_upgrade`] over raw registry strings. Unparseable
/// entries are skipped.
pub fn select_best_upgrade_from_strings(
    constraint: &Constraint,
    candidates: &[String],
) -> UpgradeDecision {
    let parsed: Vec<Version> = candidates
        .iter()
        .filter_map(|raw| parse_version(raw).ok())
        .collect();

    if parsed.is_empty() && !candidates.is_empty() {
        debug!(
            "none of {} candidates for {} parsed as versions",
            candidates.len(),
            constraint
        );
    }

    select_best_upgrade(constraint, &parsed)
}
