//! Upgrade planning across a manifest's dependencies
//!
//! Groups a registry and a version matcher, fetches published versions for
//! every dependency with bounded concurrency and runs upgrade selection on
//! each. A package that cannot be planned (malformed constraint, registry
//! error) is recorded as a failure; the others are unaffected.

use std::fmt::Display;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Serialize, Serializer};
use tracing::{debug, error, info};

use crate::parser::package_json::PackageJson;
use crate::parser::types::Dependency;
use crate::version::constraint::parse_constraint;
use crate::version::matcher::{CompareResult, VersionMatcher};
use crate::version::matchers::NpmVersionMatcher;
use crate::version::registry::Registry;
use crate::version::upgrade::{UpgradeDecision, select_best_upgrade_from_strings};

fn serialize_display<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(flatten)]
    pub dependency: Dependency,
    #[serde(serialize_with = "serialize_display")]
    pub decision: UpgradeDecision,
    /// Registry's latest version, if it advertises one
    pub latest: Option<String>,
    /// Where `latest` sits relative to the declared constraint
    pub status: CompareResult,
    /// Whether any published version satisfies the declared constraint
    pub published: bool,
}

impl Recommendation {
    /// New manifest value when this is an upgrade
    pub fn new_value(&self) -> Option<String> {
        self.decision
            .upgrade()
            .map(|constraint| self.dependency.render(&constraint.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageFailure {
    pub name: String,
    /// Declared constraint as written in the manifest
    pub raw: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpgradePlan {
    pub recommendations: Vec<Recommendation>,
    pub failures: Vec<PackageFailure>,
}

impl UpgradePlan {
    pub fn upgrades(&self) -> impl Iterator<Item = &Recommendation> {
        self.recommendations
            .iter()
            .filter(|r| matches!(r.decision, UpgradeDecision::Upgrade(_)))
    }

    pub fn has_upgrades(&self) -> bool {
        self.upgrades().next().is_some()
    }

    /// Writes every `Upgrade` decision into `manifest`; returns how many
    /// entries changed
    pub fn apply(&self, manifest: &mut PackageJson) -> usize {
        self.upgrades()
            .filter_map(|r| r.new_value().map(|value| (r, value)))
            .filter(|(r, value)| {
                manifest.update_dependency(r.dependency.kind, &r.dependency.name, value)
            })
            .count()
    }
}

enum Planned {
    Recommendation(Recommendation),
    Failure(PackageFailure),
}

pub struct UpgradePlanner {
    registry: Arc<dyn Registry>,
    matcher: Arc<dyn VersionMatcher>,
    concurrency: usize,
}

impl UpgradePlanner {
    pub fn new(registry: Arc<dyn Registry>, concurrency: usize) -> Self {
        Self::with_matcher(registry, Arc::new(NpmVersionMatcher), concurrency)
    }

    pub fn with_matcher(
        registry: Arc<dyn Registry>,
        matcher: Arc<dyn VersionMatcher>,
        concurrency: usize,
    ) -> Self {
        Self {
            registry,
            matcher,
            concurrency: concurrency.max(1),
        }
    }

    /// Plans every dependency; the result keeps the input order
    pub async fn plan(&self, dependencies: &[Dependency]) -> UpgradePlan {
        info!(
            "Planning upgrades for {} packages via {}",
            dependencies.len(),
            self.registry.name()
        );

        let mut planned: Vec<(usize, Planned)> = stream::iter(dependencies.iter().enumerate())
            .map(|(i, dependency)| async move { (i, self.plan_one(dependency).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        planned.sort_by_key(|(i, _)| *i);

        let mut plan = UpgradePlan::default();
        for (_, outcome) in planned {
            match outcome {
                Planned::Recommendation(r) => plan.recommendations.push(r),
                Planned::Failure(f) => plan.failures.push(f),
            }
        }
        plan
    }

    async fn plan_one(&self, dependency: &Dependency) -> Planned {
        let failure = |reason: String| {
            Planned::Failure(PackageFailure {
                name: dependency.name.clone(),
                raw: dependency.constraint.clone(),
                reason,
            })
        };

        let constraint = match parse_constraint(&dependency.constraint) {
            Ok(constraint) => constraint,
            Err(e) => {
                debug!("{}: {}", dependency.name, e);
                return failure(e.to_string());
            }
        };

        let versions = match self.registry.fetch_all_versions(&dependency.package).await {
            Ok(versions) => versions,
            Err(e) => {
                error!("Failed to fetch versions for {}: {}", dependency.package, e);
                return failure(e.to_string());
            }
        };

        let decision = select_best_upgrade_from_strings(&constraint, &versions.versions);
        let latest = versions.latest();
        let status = latest
            .as_deref()
            .map(|latest| self.matcher.compare_to_latest(&dependency.constraint, latest))
            .unwrap_or(CompareResult::Invalid);
        let published = self
            .matcher
            .version_exists(&dependency.constraint, &versions.versions);

        debug!("{}: {} -> {}", dependency.name, dependency.constraint, decision);

        Planned::Recommendation(Recommendation {
            dependency: dependency.clone(),
            decision,
            latest,
            status,
            published,
        })
    }
}
