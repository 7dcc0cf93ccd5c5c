//! Query execution errors.

/// Errors from running a statement against a data source.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The statement contains a keyword that can modify state.
    #[error("only read-only SELECT statements are allowed (found {keyword})")]
    NotReadOnly {
        /// The offending keyword, upper case.
        keyword: String,
    },
    /// No executor is configured under this name.
    #[error("data source {source_name} is not configured")]
    NotConfigured {
        /// Requested source name.
        source_name: String,
    },
    /// The statement exceeded its time bound.
    #[error("statement exceeded its {timeout_secs}s time bound")]
    Timeout {
        /// Configured bound.
        timeout_secs: u64,
    },
    /// Driver or server error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
