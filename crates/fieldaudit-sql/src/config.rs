//! Data source configuration.

use std::collections::BTreeMap;

use zeroize::Zeroizing;

/// Source names read by [`DataSourceConfig::from_env`].
pub const DEFAULT_SOURCES: &[&str] = &["flowindex", "blockscout"];

/// Database URLs keyed by source name.
///
/// Custom `Debug` implementation lists source names only; URLs carry
/// credentials.
#[derive(Clone, Default)]
pub struct DataSourceConfig {
    sources: BTreeMap<String, Zeroizing<String>>,
}

impl std::fmt::Debug for DataSourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSourceConfig")
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DataSourceConfig {
    /// Load URLs for the default sources from the environment.
    ///
    /// Variables:
    /// - `FIELDAUDIT_DB_FLOWINDEX_URL`
    /// - `FIELDAUDIT_DB_BLOCKSCOUT_URL`
    ///
    /// Unset or empty variables leave that source unconfigured.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        for name in DEFAULT_SOURCES {
            if let Ok(url) = std::env::var(env_var(name)) {
                if !url.trim().is_empty() {
                    config = config.with_source(*name, url);
                }
            }
        }
        config
    }

    /// Add or replace a source.
    pub fn with_source(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.sources.insert(name.into(), Zeroizing::new(url.into()));
        self
    }

    /// Iterate `(name, url)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sources.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Environment variable holding the URL of source `name`.
pub fn env_var(name: &str) -> String {
    format!("FIELDAUDIT_DB_{}_URL", name.to_ascii_uppercase())
}
