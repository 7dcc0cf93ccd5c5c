//! # fieldaudit-sql — Read-Only Statement Execution
//!
//! A single capability for the query layer that sits on top of the indexer
//! databases: run one read-only statement against a named data source with a
//! time bound and a row bound, and get back column names and rows or a typed
//! error.
//!
//! ## Safety Layers
//!
//! 1. [`ReadOnlyGuard`] rejects statements containing mutating keywords and
//!    statements that start with transaction or session commands.
//! 2. [`PgExecutor`] runs inside `SET TRANSACTION READ ONLY` with a local
//!    `statement_timeout`, and always rolls back.
//! 3. At most `max_rows` rows are pulled from the server.

pub mod config;
pub mod error;
pub mod executor;
pub mod guard;
pub mod sources;

pub use config::DataSourceConfig;
pub use error::QueryError;
pub use executor::{PgExecutor, QueryExecutor, QueryOutput, StaticExecutor};
pub use guard::ReadOnlyGuard;
pub use sources::DataSources;
