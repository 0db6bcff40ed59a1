//! npm registry API implementation

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::semver::{Version, parse_version};
use crate::version::types::PackageVersions;

/// Default base URL for npm registry
pub const DEFAULT_BASE_URL: &str = "https://registry.npmjs.org";

/// Response from npm registry API
#[derive(Debug, Deserialize)]
struct NpmPackageResponse {
    #[serde(default)]
    versions: HashMap<String, serde_json::Value>,
    #[serde(default, rename = "dist-tags")]
    dist_tags: HashMap<String, String>,
}

/// Registry implementation for npm registry API
pub struct NpmRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl NpmRegistry {
    /// Creates a new NpmRegistry against `base_url` (no trailing slash needed)
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("dai/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Encode package name for URL (handles scoped packages)
    fn encode_package_name(package_name: &str) -> String {
        if package_name.starts_with('@') {
            // Scoped package: @scope/name -> @scope%2Fname
            package_name.replace('/', "%2F")
        } else {
            package_name.to_string()
        }
    }

    fn retry_after(response: &reqwest::Response) -> Option<u64> {
        response
            .headers()
            .get(reqwest::header::RETRY_AFTER)?
            .to_str()
            .ok()?
            .trim()
            .parse()
            .ok()
    }
}

#[async_trait::async_trait]
impl Registry for NpmRegistry {
    fn name(&self) -> &'static str {
        "npm"
    }

    async fn fetch_all_versions(
        &self,
        package_name: &str,
    ) -> Result<PackageVersions, RegistryError> {
        let encoded_name = Self::encode_package_name(package_name);
        let url = format!("{}/{}", self.base_url, encoded_name);

        debug!("fetching {}", url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(package_name.to_string()));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(RegistryError::RateLimited {
                retry_after_secs: Self::retry_after(&response),
            });
        }

        if !status.is_success() {
            warn!("npm registry returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let package_info: NpmPackageResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse npm registry response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        // Sort versions (lowest first, highest last), dropping ones that do not parse
        let mut versions: Vec<(String, Version)> = package_info
            .versions
            .into_keys()
            .filter_map(|v| parse_version(&v).ok().map(|parsed| (v, parsed)))
            .collect();

        versions.sort_by(|(_, a), (_, b)| a.cmp(b));

        let versions: Vec<String> = versions.into_iter().map(|(v, _)| v).collect();

        Ok(PackageVersions::new(versions).with_dist_tags(package_info.dist_tags))
    }
}
