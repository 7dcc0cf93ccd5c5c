//! # Query Subcommand
//!
//! Runs one read-only statement against a data source configured through
//! `FIELDAUDIT_DB_<NAME>_URL` and prints the rows as JSON.

use anyhow::{Context, Result};
use clap::Args;

use fieldaudit_sql::{DataSourceConfig, DataSources, QueryOutput};

/// Arguments for the `fieldaudit query` subcommand.
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Data source name (`flowindex` or `blockscout`).
    #[arg(long = "source", value_name = "NAME")]
    pub source_name: String,

    /// Server-side statement timeout in seconds.
    #[arg(long, value_name = "N", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Maximum rows returned.
    #[arg(long, value_name = "N", default_value_t = 500)]
    pub max_rows: usize,

    /// The statement to run.
    #[arg(value_name = "SQL")]
    pub statement: String,
}

/// Execute the query subcommand against sources from the environment.
pub async fn run_query(args: &QueryArgs) -> Result<u8> {
    let config = DataSourceConfig::from_env();
    tracing::debug!(?config, "data sources");
    let sources = DataSources::from_config(&config).context("failed to configure data sources")?;
    let output = query(&sources, args).await?;
    let rendered = serde_json::to_string_pretty(&output).context("failed to serialize rows")?;
    println!("{rendered}");
    Ok(0)
}

/// Run the statement in `args` against `sources`.
pub async fn query(sources: &DataSources, args: &QueryArgs) -> Result<QueryOutput> {
    let output = sources
        .execute(&args.source_name, &args.statement, args.timeout_secs, args.max_rows)
        .await
        .with_context(|| format!("query against {} failed", args.source_name))?;
    tracing::info!(source = %args.source_name, rows = output.row_count, "query complete");
    Ok(output)
}
