//! `dai upgrade`

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::cli::{OutputFormat, UpgradeArgs};
use crate::config::Config;
use crate::parser::package_json::{PackageJson, create_backup, find_package_json, generate_diff};
use crate::parser::types::Dependency;
use crate::planner::{UpgradePlan, UpgradePlanner};
use crate::version::matcher::CompareResult;
use crate::version::registries::NpmRegistry;

/// Narrows `dependencies` to the requested packages. A request matches
/// either the manifest key or, for aliases, the real package name.
pub fn select_dependencies(
    dependencies: Vec<Dependency>,
    requested: &[String],
) -> Result<Vec<Dependency>> {
    if requested.is_empty() {
        return Ok(dependencies);
    }

    for name in requested {
        if !dependencies
            .iter()
            .any(|d| &d.name == name || &d.package == name)
        {
            warn!("{} is not a dependency in package.json", name);
        }
    }

    let selected: Vec<Dependency> = dependencies
        .into_iter()
        .filter(|d| requested.iter().any(|r| r == &d.name || r == &d.package))
        .collect();

    if selected.is_empty() {
        bail!("none of the requested packages are dependencies in package.json");
    }
    Ok(selected)
}

pub fn write_plan<W: Write>(w: &mut W, plan: &UpgradePlan, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        serde_json::to_writer_pretty(&mut *w, plan)?;
        writeln!(w)?;
        return Ok(());
    }

    let width = plan
        .recommendations
        .iter()
        .map(|r| r.dependency.name.len())
        .chain(plan.failures.iter().map(|f| f.name.len()))
        .max()
        .unwrap_or(0);

    for recommendation in &plan.recommendations {
        let dependency = &recommendation.dependency;
        let mut line = format!(
            "{:width$}  {} -> {}",
            dependency.name, dependency.constraint, recommendation.decision
        );
        if let Some(latest) = &recommendation.latest
            && recommendation.status == CompareResult::Outdated
        {
            line.push_str(&format!(" (latest: {latest})"));
        }
        if !recommendation.published {
            line.push_str(" [no published version satisfies the current constraint]");
        }
        writeln!(w, "{line}")?;
    }

    for failure in &plan.failures {
        writeln!(
            w,
            "{:width$}  {} -> error: {}",
            failure.name, failure.raw, failure.reason
        )?;
    }

    let upgrades = plan.upgrades().count();
    writeln!(w)?;
    writeln!(
        w,
        "{} of {} packages can be upgraded",
        upgrades,
        plan.recommendations.len() + plan.failures.len()
    )?;
    Ok(())
}

pub async fn run<W: Write>(args: &UpgradeArgs, config: &Config, out: &mut W) -> Result<u8> {
    let manifest_path = find_package_json(&args.path)
        .with_context(|| format!("no package.json found from {}", args.path.display()))?;
    let mut manifest = PackageJson::read(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;

    let include_dev = config.include_dev && !args.no_dev;
    let requested = if args.all { &[][..] } else { &args.packages[..] };
    let dependencies = select_dependencies(manifest.dependencies(include_dev), requested)?;

    let registry_url = args.registry.as_deref().unwrap_or(&config.registry_url);
    let registry = NpmRegistry::new(
        registry_url,
        Duration::from_secs(config.request_timeout_secs),
    )
    .context("failed to create registry client")?;

    let planner = UpgradePlanner::new(Arc::new(registry), config.concurrency);
    let plan = planner.plan(&dependencies).await;

    write_plan(out, &plan, args.format)?;

    if !args.apply && !args.dry_run {
        return Ok(0);
    }

    let original = manifest.to_json_string()?;
    let changed = plan.apply(&mut manifest);
    if changed == 0 {
        writeln!(out, "No upgrades to apply")?;
        return Ok(0);
    }
    let modified = manifest.to_json_string()?;

    if args.dry_run {
        writeln!(out, "Dry run: {changed} change(s) would be written")?;
    } else {
        let backup = create_backup(&manifest_path).context("failed to back up package.json")?;
        manifest
            .write_to_file(&manifest_path)
            .with_context(|| format!("failed to write {}", manifest_path.display()))?;
        info!("Updated {} dependencies in {}", changed, manifest_path.display());
        writeln!(
            out,
            "Updated {} dependencies (backup: {})",
            changed,
            backup.display()
        )?;
    }
    write!(out, "{}", generate_diff(&original, &modified))?;

    Ok(0)
}
