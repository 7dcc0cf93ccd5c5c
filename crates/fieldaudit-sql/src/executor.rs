//! # Statement Execution
//!
//! [`QueryExecutor`] is the whole contract: run one read-only statement with
//! a time bound and a row bound, get back column names and rows.
//!
//! [`PgExecutor`] sends the statement over the simple-query protocol, so
//! every value arrives in PostgreSQL's text format and is converted to JSON
//! by column type. `bytea` values become `0x`-prefixed lowercase hex.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Executor, Row, TypeInfo};

use crate::error::QueryError;
use crate::guard::ReadOnlyGuard;

/// Slack on top of the server-side statement timeout before the client
/// gives up on its own.
const CLIENT_TIMEOUT_GRACE_SECS: u64 = 5;

/// SQLSTATE for a statement cancelled by `statement_timeout`.
const QUERY_CANCELED: &str = "57014";

/// Rows returned by one statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOutput {
    /// Column names in result order; empty when no rows came back.
    pub columns: Vec<String>,
    /// One ordered map per row.
    pub rows: Vec<Map<String, Value>>,
    /// Number of rows returned.
    pub row_count: usize,
}

impl QueryOutput {
    /// Build from rows, taking column names from the first row.
    pub fn from_rows(rows: Vec<Map<String, Value>>) -> Self {
        let columns = rows
            .first()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();
        Self {
            columns,
            row_count: rows.len(),
            rows,
        }
    }
}

/// Runs read-only statements against one data source.
///
/// Object-safe so sources can be selected at runtime.
pub trait QueryExecutor: Send + Sync {
    /// Run `statement`, returning at most `max_rows` rows.
    fn execute<'a>(
        &'a self,
        statement: &'a str,
        timeout_secs: u64,
        max_rows: usize,
    ) -> BoxFuture<'a, Result<QueryOutput, QueryError>>;

    /// Name of this executor implementation.
    fn executor_name(&self) -> &str;
}

/// PostgreSQL executor over a lazily connected pool.
#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    /// Create an executor; no connection is made until the first statement.
    pub fn connect_lazy(url: &str) -> Result<Self, QueryError> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(url)?;
        Ok(Self { pool })
    }

    async fn run(&self, statement: &str, timeout_secs: u64, max_rows: usize) -> Result<QueryOutput, QueryError> {
        let mut tx = self.pool.begin().await?;
        (&mut *tx).execute(sqlx::raw_sql("SET TRANSACTION READ ONLY")).await?;
        let set_timeout = format!("SET LOCAL statement_timeout = '{timeout_secs}s'");
        (&mut *tx).execute(sqlx::raw_sql(&set_timeout)).await?;

        let mut rows = Vec::new();
        {
            let mut stream = sqlx::raw_sql(statement).fetch(&mut *tx);
            while rows.len() < max_rows {
                match stream.try_next().await? {
                    Some(row) => rows.push(row_to_map(&row)),
                    None => break,
                }
            }
        }
        tx.rollback().await?;
        Ok(QueryOutput::from_rows(rows))
    }
}

impl QueryExecutor for PgExecutor {
    fn execute<'a>(
        &'a self,
        statement: &'a str,
        timeout_secs: u64,
        max_rows: usize,
    ) -> BoxFuture<'a, Result<QueryOutput, QueryError>> {
        Box::pin(async move {
            ReadOnlyGuard::check(statement)?;
            let bound = Duration::from_secs(timeout_secs + CLIENT_TIMEOUT_GRACE_SECS);
            let outcome = tokio::time::timeout(bound, self.run(statement, timeout_secs, max_rows))
                .await
                .map_err(|_| QueryError::Timeout { timeout_secs })?;
            match outcome {
                Err(QueryError::Database(sqlx::Error::Database(db)))
                    if db.code().as_deref() == Some(QUERY_CANCELED) =>
                {
                    Err(QueryError::Timeout { timeout_secs })
                }
                other => {
                    if let Ok(output) = &other {
                        tracing::debug!(rows = output.row_count, "statement complete");
                    }
                    other
                }
            }
        })
    }

    fn executor_name(&self) -> &str {
        "postgres"
    }
}

fn row_to_map(row: &PgRow) -> Map<String, Value> {
    let mut map = Map::new();
    for (index, column) in row.columns().iter().enumerate() {
        let text = row
            .try_get_unchecked::<Option<String>, _>(index)
            .ok()
            .flatten();
        let value = match text {
            Some(text) => text_to_json(column.type_info().name(), &text),
            None => Value::Null,
        };
        map.insert(column.name().to_string(), value);
    }
    map
}

/// Convert one value in PostgreSQL text format to JSON by its type name.
///
/// Types without a natural JSON form are kept as their text rendering.
pub fn text_to_json(type_name: &str, text: &str) -> Value {
    match type_name {
        "BOOL" => Value::Bool(text == "t" || text == "true"),
        "INT2" | "INT4" | "INT8" | "OID" => text
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(text.to_string())),
        "FLOAT4" | "FLOAT8" | "NUMERIC" => parse_number(text),
        "JSON" | "JSONB" => serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())),
        "BYTEA" => Value::String(bytea_hex(text)),
        _ => Value::String(text.to_string()),
    }
}

fn parse_number(text: &str) -> Value {
    if let Ok(i) = text.parse::<i64>() {
        return Value::from(i);
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        // NaN, Infinity and out-of-range numerics.
        .unwrap_or_else(|| Value::String(text.to_string()))
}

/// `\x0a0b` (PostgreSQL hex output) → `0x0a0b`.
fn bytea_hex(text: &str) -> String {
    match text.strip_prefix("\\x") {
        Some(hex) => format!("0x{}", hex.to_ascii_lowercase()),
        None => format!("0x{}", text.bytes().map(|b| format!("{b:02x}")).collect::<String>()),
    }
}

/// Executor returning canned output, for wiring and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticExecutor {
    output: QueryOutput,
}

impl StaticExecutor {
    /// Always answer with `output`, truncated to the row bound.
    pub fn new(output: QueryOutput) -> Self {
        Self { output }
    }
}

impl QueryExecutor for StaticExecutor {
    fn execute<'a>(
        &'a self,
        statement: &'a str,
        _timeout_secs: u64,
        max_rows: usize,
    ) -> BoxFuture<'a, Result<QueryOutput, QueryError>> {
        Box::pin(async move {
            ReadOnlyGuard::check(statement)?;
            let rows = self.output.rows.iter().take(max_rows).cloned().collect();
            Ok(QueryOutput::from_rows(rows))
        })
    }

    fn executor_name(&self) -> &str {
        "static"
    }
}
