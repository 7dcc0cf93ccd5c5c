//! Named data sources.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::DataSourceConfig;
use crate::error::QueryError;
use crate::executor::{PgExecutor, QueryExecutor, QueryOutput};

/// Executors keyed by source name.
#[derive(Clone, Default)]
pub struct DataSources {
    executors: BTreeMap<String, Arc<dyn QueryExecutor>>,
}

impl std::fmt::Debug for DataSources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.executors.iter().map(|(k, v)| (k, v.executor_name())))
            .finish()
    }
}

impl DataSources {
    /// One lazily connected PostgreSQL executor per configured source.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn from_config(config: &DataSourceConfig) -> Result<Self, QueryError> {
        let mut sources = Self::default();
        for (name, url) in config.iter() {
            sources = sources.with_executor(name, Arc::new(PgExecutor::connect_lazy(url)?));
        }
        Ok(sources)
    }

    /// Register an executor under `name`.
    pub fn with_executor(mut self, name: impl Into<String>, executor: Arc<dyn QueryExecutor>) -> Self {
        self.executors.insert(name.into(), executor);
        self
    }

    /// The executor for `name`.
    pub fn get(&self, name: &str) -> Result<&dyn QueryExecutor, QueryError> {
        self.executors
            .get(name)
            .map(|e| e.as_ref())
            .ok_or_else(|| QueryError::NotConfigured {
                source_name: name.to_string(),
            })
    }

    /// Run a statement against the named source.
    pub async fn execute(
        &self,
        name: &str,
        statement: &str,
        timeout_secs: u64,
        max_rows: usize,
    ) -> Result<QueryOutput, QueryError> {
        let executor = self.get(name)?;
        tracing::debug!(source = name, timeout_secs, max_rows, "executing statement");
        executor.execute(statement, timeout_secs, max_rows).await
    }
}
