use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::advisory::{github, nvd};
use crate::version::registries::npm;

// =============================================================================
// Request-related constants
// =============================================================================

/// Delay between starting each fetch request to avoid rate limiting (10ms)
pub const FETCH_STAGGER_DELAY_MS: u64 = 10;

/// Default number of registry requests in flight at once
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Default timeout for a single HTTP request in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_LOG_LEVEL: &str = "warn";

const APP_DIR: &str = "dai";
const CONFIG_FILE: &str = "config.json";
/// Log file name inside [`data_dir`]
pub const LOG_FILE: &str = "dai.log";

// =============================================================================
// Environment variables
// =============================================================================

pub const ENV_GITHUB_TOKEN: &str = "DAI_GITHUB_TOKEN";
pub const ENV_NVD_API_KEY: &str = "DAI_NVD_API_KEY";
pub const ENV_REGISTRY_URL: &str = "DAI_REGISTRY_URL";
pub const ENV_LOG_LEVEL: &str = "DAI_LOG_LEVEL";

/// Unprefixed fallbacks, consulted when the prefixed variable is unset
const ENV_GITHUB_TOKEN_FALLBACK: &str = "GITHUB_TOKEN";
const ENV_NVD_API_KEY_FALLBACK: &str = "NVD_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown config key: {0}")]
    UnknownKey(String),

    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err("expected 'text' or 'json'".to_string()),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub registry_url: String,
    pub github_advisory_url: String,
    pub nvd_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nvd_api_key: Option<String>,
    pub concurrency: usize,
    pub request_timeout_secs: u64,
    pub include_dev: bool,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Also append logs to `<data_dir>/dai.log`
    pub log_file: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry_url: npm::DEFAULT_BASE_URL.to_string(),
            github_advisory_url: github::DEFAULT_BASE_URL.to_string(),
            nvd_url: nvd::DEFAULT_BASE_URL.to_string(),
            github_token: None,
            nvd_api_key: None,
            concurrency: DEFAULT_CONCURRENCY,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            include_dev: true,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::Text,
            log_file: false,
        }
    }
}

/// Keys accepted by [`Config::set`]
pub const CONFIG_KEYS: [&str; 11] = [
    "registryUrl",
    "githubAdvisoryUrl",
    "nvdUrl",
    "githubToken",
    "nvdApiKey",
    "concurrency",
    "requestTimeoutSecs",
    "includeDev",
    "logLevel",
    "logFormat",
    "logFile",
];

impl Config {
    /// Reads `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Config file at the default location, then environment overrides
    pub fn load_with_env() -> Result<Self, ConfigError> {
        let mut config = Self::load(&config_path())?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut rendered = serde_json::to_string_pretty(self).map_err(|source| {
            ConfigError::Json {
                path: path.to_path_buf(),
                source,
            }
        })?;
        rendered.push('\n');

        std::fs::write(path, rendered).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overrides fields from environment variables; empty values are ignored
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(key))
                .find(|value| !value.is_empty())
        };

        if let Some(token) = get(&[ENV_GITHUB_TOKEN, ENV_GITHUB_TOKEN_FALLBACK]) {
            self.github_token = Some(token);
        }
        if let Some(key) = get(&[ENV_NVD_API_KEY, ENV_NVD_API_KEY_FALLBACK]) {
            self.nvd_api_key = Some(key);
        }
        if let Some(url) = get(&[ENV_REGISTRY_URL]) {
            self.registry_url = url;
        }
        if let Some(level) = get(&[ENV_LOG_LEVEL]) {
            self.log_level = level;
        }
    }

    /// Sets one field by its camelCase key
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };
        let optional = |value: &str| Some(value.to_string()).filter(|v| !v.is_empty());

        match key {
            "registryUrl" => self.registry_url = value.to_string(),
            "githubAdvisoryUrl" => self.github_advisory_url = value.to_string(),
            "nvdUrl" => self.nvd_url = value.to_string(),
            "githubToken" => self.github_token = optional(value),
            "nvdApiKey" => self.nvd_api_key = optional(value),
            "concurrency" => {
                self.concurrency = match value.parse::<usize>() {
                    Ok(0) => return Err(invalid("must be at least 1")),
                    Ok(n) => n,
                    Err(_) => return Err(invalid("expected a positive integer")),
                }
            }
            "requestTimeoutSecs" => {
                self.request_timeout_secs = match value.parse::<u64>() {
                    Ok(0) => return Err(invalid("must be at least 1")),
                    Ok(n) => n,
                    Err(_) => return Err(invalid("expected a positive integer")),
                }
            }
            "includeDev" => {
                self.include_dev = value.parse().map_err(|_| invalid("expected true or false"))?
            }
            "logLevel" => self.log_level = value.to_string(),
            "logFormat" => self.log_format = value.parse().map_err(|e: String| invalid(&e))?,
            "logFile" => {
                self.log_file = value.parse().map_err(|_| invalid("expected true or false"))?
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Key/value pairs for display, with secrets masked
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let secret = |value: &Option<String>| mask_secret(value.as_deref().unwrap_or(""));

        vec![
            ("registryUrl", self.registry_url.clone()),
            ("githubAdvisoryUrl", self.github_advisory_url.clone()),
            ("nvdUrl", self.nvd_url.clone()),
            ("githubToken", secret(&self.github_token)),
            ("nvdApiKey", secret(&self.nvd_api_key)),
            ("concurrency", self.concurrency.to_string()),
            ("requestTimeoutSecs", self.request_timeout_secs.to_string()),
            ("includeDev", self.include_dev.to_string()),
            ("logLevel", self.log_level.clone()),
            (
                "logFormat",
                match self.log_format {
                    LogFormat::Text => "text".to_string(),
                    LogFormat::Json => "json".to_string(),
                },
            ),
            ("logFile", self.log_file.to_string()),
        ]
    }
}

/// Shows the first and last three characters of a secret
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    match chars.len() {
        0 => "(not set)".to_string(),
        n if n <= 8 => "****".to_string(),
        n => {
            let head: String = chars[..3].iter().collect();
            let tail: String = chars[n - 3..].iter().collect();
            format!("{head}...{tail}")
        }
    }
}

/// Returns the path to the config directory for dai.
/// Uses $XDG_CONFIG_HOME/dai if XDG_CONFIG_HOME is set,
/// otherwise falls back to ~/.config/dai,
/// or ./.dai if neither is available.
pub fn config_dir() -> PathBuf {
    config_dir_with_env(std::env::var("XDG_CONFIG_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the config file.
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

/// Returns the path to the data directory for dai.
/// Uses $XDG_DATA_HOME/dai if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/dai,
/// or ./dai if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

fn config_dir_with_env(xdg_config_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    xdg_config_home
        .filter(|dir| !dir.is_empty())
        .map(|dir| PathBuf::from(dir).join(APP_DIR))
        .or_else(|| home_dir.map(|home| home.join(".config").join(APP_DIR)))
        .unwrap_or_else(|| PathBuf::from(".dai"))
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join(APP_DIR)
}
