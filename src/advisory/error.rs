use thiserror::Error;

use crate::version::error::VersionError;

#[derive(Debug, Error)]
pub enum AdvisoryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{source_name} returned status {status}")]
    Status {
        source_name: &'static str,
        status: u16,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("All advisory sources failed: {0}")]
    AllSourcesFailed(String),
}
