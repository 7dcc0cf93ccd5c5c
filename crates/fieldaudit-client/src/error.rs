//! Client error types.

use crate::config::ConfigError;

/// Errors from calls against the API under audit.
///
/// None of these abort an audit run: the prober records them as the
/// endpoint's outcome and the seeder leaves the affected seed unset.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Configured timeout.
        timeout_secs: u64,
    },
    /// Connection or protocol failure.
    #[error("HTTP error calling {url}: {source}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying error.
        source: reqwest::Error,
    },
    /// The response body could not be read.
    #[error("failed to read response body from {url}: {source}")]
    Body {
        /// Requested URL.
        url: String,
        /// Underlying error.
        source: reqwest::Error,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    ClientInit(reqwest::Error),
}
