//! Audit run configuration.
//!
//! Defaults target a locally running explorer API. Override via environment
//! variables or explicit construction; CLI flags override both.

use std::collections::BTreeSet;

use url::Url;
use zeroize::Zeroizing;

use fieldaudit_core::OpenPrefixes;

/// Default base URL of the API under audit.
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8080/api";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of concurrent probes.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Response envelopes that are intentionally left untyped.
pub const DEFAULT_OPEN_PREFIXES: &[&str] = &["_meta", "_links"];

/// Configuration for one audit run.
///
/// Custom `Debug` implementation redacts the `bearer_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct AuditConfig {
    /// Base URL of the API, including any path prefix such as `/api`.
    pub base_url: Url,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum number of endpoints probed at once. Never below 1.
    pub concurrency: usize,
    /// Prefixes added to every endpoint's open set.
    pub open_prefixes: OpenPrefixes,
    /// Optional bearer token sent with every request.
    pub bearer_token: Option<Zeroizing<String>>,
}

impl std::fmt::Debug for AuditConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditConfig")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("open_prefixes", &self.open_prefixes)
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl AuditConfig {
    /// Configuration with defaults for everything but the base URL.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            concurrency: DEFAULT_CONCURRENCY,
            open_prefixes: default_open_prefixes(),
            bearer_token: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `FIELDAUDIT_API_BASE` (default: `http://127.0.0.1:8080/api`)
    /// - `FIELDAUDIT_TIMEOUT_SECS` (default: 10)
    /// - `FIELDAUDIT_CONCURRENCY` (default: 5)
    /// - `FIELDAUDIT_API_TOKEN` (optional)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new(env_url("FIELDAUDIT_API_BASE", DEFAULT_API_BASE)?);
        config.timeout_secs = env_parse("FIELDAUDIT_TIMEOUT_SECS").unwrap_or(DEFAULT_TIMEOUT_SECS);
        config = config.with_concurrency(env_parse("FIELDAUDIT_CONCURRENCY").unwrap_or(DEFAULT_CONCURRENCY));
        config.bearer_token = std::env::var("FIELDAUDIT_API_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .map(Zeroizing::new);
        Ok(config)
    }

    /// Set the concurrency limit, clamped to at least 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Base URL without a trailing slash, as used for joining paths.
    pub fn base(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }
}

/// The default open prefixes as a set.
pub fn default_open_prefixes() -> OpenPrefixes {
    DEFAULT_OPEN_PREFIXES.iter().map(|p| p.to_string()).collect::<BTreeSet<_>>()
}

/// Parse a base URL given on the command line or in the environment.
pub fn parse_base_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    parse_base_url(var, &raw)
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|s| s.trim().parse().ok())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A URL setting did not parse.
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    /// The bearer token cannot be sent as a header value.
    #[error("bearer token contains characters not allowed in an HTTP header")]
    InvalidToken,
}
