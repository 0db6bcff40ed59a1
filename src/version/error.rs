use thiserror::Error;

/// Parse failures for versions and constraints. The raw input is carried so
/// callers can report exactly which declaration was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("malformed version: {0:?}")]
    MalformedVersion(String),

    #[error("malformed constraint: {0:?}")]
    MalformedConstraint(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Rate limited: retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Package not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
