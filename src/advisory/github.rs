//! GitHub Advisory Database client
//!
//! `GET /advisories?ecosystem=<eco>&affects=<package>` returns reviewed
//! advisories whose `vulnerabilities[].vulnerable_version_range` is a
//! comparator string such as `">= 1.0.0, < 1.2.4"`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::advisory::error::AdvisoryError;
use crate::advisory::range::{VersionRange, is_affected};
use crate::advisory::report::{Severity, Vulnerability, parse_cvss_score};
use crate::advisory::source::AdvisorySource;
use crate::parser::types::Ecosystem;
use crate::version::semver::Version;

pub const DEFAULT_BASE_URL: &str = "https://api.github.com/advisories";

const API_VERSION: &str = "2022-11-28";
const PER_PAGE: &str = "100";

/// The list endpoint returns a bare array; some mirrors wrap it
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AdvisoryPayload {
    List(Vec<GitHubAdvisory>),
    Wrapped { advisories: Vec<GitHubAdvisory> },
}

impl AdvisoryPayload {
    fn into_advisories(self) -> Vec<GitHubAdvisory> {
        match self {
            AdvisoryPayload::List(advisories) => advisories,
            AdvisoryPayload::Wrapped { advisories } => advisories,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitHubAdvisory {
    ghsa_id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    cvss: Option<Cvss>,
    #[serde(default)]
    references: Vec<String>,
    #[serde(default)]
    vulnerabilities: Vec<AffectedPackage>,
}

#[derive(Debug, Deserialize)]
struct Cvss {
    #[serde(default)]
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AffectedPackage {
    package: PackageRef,
    #[serde(default)]
    vulnerable_version_range: Option<OneOrMany>,
    #[serde(default)]
    first_patched_version: Option<PatchedVersion>,
}

#[derive(Debug, Deserialize)]
struct PackageRef {
    ecosystem: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn to_range(&self) -> VersionRange {
        match self {
            OneOrMany::One(entry) => VersionRange::Comparators(vec![entry.clone()]),
            OneOrMany::Many(entries) => VersionRange::Comparators(entries.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PatchedVersion {
    Plain(String),
    Identified { identifier: String },
}

impl PatchedVersion {
    fn into_string(self) -> String {
        match self {
            PatchedVersion::Plain(v) => v,
            PatchedVersion::Identified { identifier } => identifier,
        }
    }
}

/// Ecosystem names as the advisory database spells them
fn github_ecosystem(ecosystem: Ecosystem) -> &'static str {
    match ecosystem {
        Ecosystem::Npm => "npm",
    }
}

pub struct GitHubAdvisoryClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubAdvisoryClient {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AdvisoryError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("dai/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn matching_advisory(
        advisory: GitHubAdvisory,
        ecosystem: &str,
        package: &str,
        version: &Version,
    ) -> Option<Vulnerability> {
        let GitHubAdvisory {
            ghsa_id,
            summary,
            description,
            severity,
            published_at,
            cvss,
            references,
            vulnerabilities,
        } = advisory;

        // a package may be listed several times; the first entry whose range matches wins
        let affected = vulnerabilities
            .into_iter()
            .filter(|v| {
                v.package.ecosystem.eq_ignore_ascii_case(ecosystem) && v.package.name == package
            })
            .find(|v| {
                v.vulnerable_version_range
                    .as_ref()
                    .is_some_and(|range| is_affected(version, &range.to_range()))
            })?;

        let severity = match severity.as_deref().map(Severity::parse) {
            Some(severity) if severity != Severity::Unknown => severity,
            _ => cvss
                .and_then(|c| c.score)
                .map(parse_cvss_score)
                .unwrap_or_default(),
        };

        Some(Vulnerability {
            id: ghsa_id,
            package: package.to_string(),
            version: version.to_string(),
            description: description
                .filter(|d| !d.is_empty())
                .or(summary)
                .unwrap_or_default(),
            severity,
            published: published_at,
            references,
            fixed_version: affected
                .first_patched_version
                .map(PatchedVersion::into_string),
            source: "github",
        })
    }
}

#[async_trait::async_trait]
impl AdvisorySource for GitHubAdvisoryClient {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn find_vulnerabilities(
        &self,
        ecosystem: Ecosystem,
        package: &str,
        version: &Version,
    ) -> Result<Vec<Vulnerability>, AdvisoryError> {
        let gh_ecosystem = github_ecosystem(ecosystem);
        let url = reqwest::Url::parse_with_params(
            &self.base_url,
            &[
                ("ecosystem", gh_ecosystem),
                ("affects", package),
                ("per_page", PER_PAGE),
            ],
        )
        .map_err(|e| AdvisoryError::InvalidUrl(e.to_string()))?;

        debug!("fetching {}", url);
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("GitHub advisories returned status {} for {}", status, package);
            return Err(AdvisoryError::Status {
                source_name: "github",
                status: status.as_u16(),
            });
        }

        let payload: AdvisoryPayload = response.json().await.map_err(|e| {
            warn!("Failed to parse GitHub advisory response: {}", e);
            AdvisoryError::InvalidResponse(e.to_string())
        })?;

        Ok(payload
            .into_advisories()
            .into_iter()
            .filter_map(|advisory| {
                Self::matching_advisory(advisory, gh_ecosystem, package, version)
            })
            .collect())
    }
}
