//! NVD CVE API 2.0 client
//!
//! CVEs are found by keyword search and then narrowed to CPE matches for the
//! package (`cpe:2.3:a:<pkg>:<pkg>:...`) that are flagged vulnerable. Each
//! match carries up to four version bounds, evaluated as a [`BoundedRange`].

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::advisory::error::AdvisoryError;
use crate::advisory::range::{BoundedRange, VersionRange, is_affected};
use crate::advisory::report::{Severity, Vulnerability, parse_cvss_score};
use crate::advisory::source::AdvisorySource;
use crate::parser::types::Ecosystem;
use crate::version::semver::Version;

pub const DEFAULT_BASE_URL: &str = "https://services.nvd.nist.gov/rest/json/cves/2.0";

#[derive(Debug, Deserialize)]
struct NvdResponse {
    #[serde(default)]
    vulnerabilities: Vec<NvdVulnerability>,
}

#[derive(Debug, Deserialize)]
struct NvdVulnerability {
    cve: CveItem,
}

#[derive(Debug, Deserialize)]
struct CveItem {
    id: String,
    #[serde(default)]
    published: Option<String>,
    #[serde(default)]
    descriptions: Vec<CveDescription>,
    #[serde(default)]
    metrics: CveMetrics,
    #[serde(default)]
    configurations: Vec<CveConfig>,
    #[serde(default)]
    references: Vec<CveReference>,
}

#[derive(Debug, Deserialize)]
struct CveDescription {
    lang: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CveMetrics {
    #[serde(default)]
    cvss_metric_v31: Vec<CvssMetric>,
    #[serde(default)]
    cvss_metric_v30: Vec<CvssMetric>,
    #[serde(default)]
    cvss_metric_v2: Vec<CvssMetric>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CvssMetric {
    cvss_data: CvssData,
    /// v2 puts the severity here
    #[serde(default)]
    base_severity: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CvssData {
    #[serde(default)]
    base_score: Option<f64>,
    /// v3.x puts the severity here
    #[serde(default)]
    base_severity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CveConfig {
    #[serde(default)]
    nodes: Vec<CveNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CveNode {
    #[serde(default)]
    cpe_match: Vec<CpeMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CpeMatch {
    #[serde(default)]
    vulnerable: bool,
    criteria: String,
    #[serde(default)]
    version_start_excluding: Option<String>,
    #[serde(default)]
    version_start_including: Option<String>,
    #[serde(default)]
    version_end_excluding: Option<String>,
    #[serde(default)]
    version_end_including: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CveReference {
    url: String,
}

/// CPE 2.3 application prefix for a package, including the trailing
/// separator so `lodash` does not match `lodash_extra`.
pub fn cpe_prefix(ecosystem: Ecosystem, package: &str) -> Option<String> {
    match ecosystem {
        // scoped npm names have no vendor:product form
        Ecosystem::Npm if package.starts_with('@') => None,
        Ecosystem::Npm => Some(format!("cpe:2.3:a:{package}:{package}:")),
    }
}

/// CVSS v2 has no Critical band
fn cvss_v2_severity(score: f64) -> Severity {
    match score {
        s if s >= 7.0 => Severity::High,
        s if s >= 4.0 => Severity::Medium,
        _ => Severity::Low,
    }
}

impl CveMetrics {
    /// v3.1, then v3.0, then v2
    fn severity(&self) -> Severity {
        let v3 = self
            .cvss_metric_v31
            .first()
            .or_else(|| self.cvss_metric_v30.first());

        if let Some(metric) = v3 {
            let named = metric
                .cvss_data
                .base_severity
                .as_deref()
                .map(Severity::parse)
                .unwrap_or_default();
            if named != Severity::Unknown {
                return named;
            }
            return metric
                .cvss_data
                .base_score
                .map(parse_cvss_score)
                .unwrap_or_default();
        }

        if let Some(metric) = self.cvss_metric_v2.first() {
            if let Some(score) = metric.cvss_data.base_score {
                return cvss_v2_severity(score);
            }
            return metric
                .base_severity
                .as_deref()
                .map(Severity::parse)
                .unwrap_or_default();
        }

        Severity::Unknown
    }
}

/// NVD timestamps usually lack an offset (`2021-02-15T13:15:12.560`); they are UTC
fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

pub struct NvdClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl NvdClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AdvisoryError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("dai/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    /// First vulnerable CPE match for the package whose bounds contain `version`.
    /// A match with a malformed bound is skipped.
    fn affected_match<'a>(
        cve: &'a CveItem,
        prefix: &str,
        version: &Version,
    ) -> Option<&'a CpeMatch> {
        cve.configurations
            .iter()
            .flat_map(|config| &config.nodes)
            .flat_map(|node| &node.cpe_match)
            .filter(|m| m.vulnerable && m.criteria.starts_with(prefix))
            .find(|m| {
                match BoundedRange::from_raw(
                    m.version_start_excluding.as_deref(),
                    m.version_start_including.as_deref(),
                    m.version_end_excluding.as_deref(),
                    m.version_end_including.as_deref(),
                ) {
                    Ok(range) => is_affected(version, &VersionRange::Bounded(range)),
                    Err(e) => {
                        debug!("{}: skipping CPE match {}: {}", cve.id, m.criteria, e);
                        false
                    }
                }
            })
    }

    fn to_vulnerability(
        cve: CveItem,
        fixed_version: Option<String>,
        package: &str,
        version: &Version,
    ) -> Vulnerability {
        let description = cve
            .descriptions
            .iter()
            .find(|d| d.lang == "en")
            .or_else(|| cve.descriptions.first())
            .map(|d| d.value.clone())
            .unwrap_or_default();

        Vulnerability {
            severity: cve.metrics.severity(),
            published: cve.published.as_deref().and_then(parse_published),
            references: cve.references.into_iter().map(|r| r.url).collect(),
            fixed_version,
            id: cve.id,
            package: package.to_string(),
            version: version.to_string(),
            description,
            source: "nvd",
        }
    }
}

#[async_trait::async_trait]
impl AdvisorySource for NvdClient {
    fn name(&self) -> &'static str {
        "nvd"
    }

    async fn find_vulnerabilities(
        &self,
        ecosystem: Ecosystem,
        package: &str,
        version: &Version,
    ) -> Result<Vec<Vulnerability>, AdvisoryError> {
        let Some(prefix) = cpe_prefix(ecosystem, package) else {
            debug!("No CPE mapping for {} package {}", ecosystem, package);
            return Ok(Vec::new());
        };

        let url = reqwest::Url::parse_with_params(&self.base_url, &[("keywordSearch", package)])
            .map_err(|e| AdvisoryError::InvalidUrl(e.to_string()))?;

        debug!("fetching {}", url);
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("apiKey", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("NVD returned status {} for {}", status, package);
            return Err(AdvisoryError::Status {
                source_name: "nvd",
                status: status.as_u16(),
            });
        }

        let body: NvdResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse NVD response: {}", e);
            AdvisoryError::InvalidResponse(e.to_string())
        })?;

        let mut found = Vec::new();
        for item in body.vulnerabilities {
            let cve = item.cve;
            let Some(cpe) = Self::affected_match(&cve, &prefix, version) else {
                continue;
            };
            let fixed_version = cpe
                .version_end_excluding
                .clone()
                .filter(|v| !v.trim().is_empty());
            found.push(Self::to_vulnerability(cve, fixed_version, package, version));
        }

        Ok(found)
    }
}
