//! # Audit Subcommand
//!
//! Loads the specification document, runs the audit driver against the
//! live API, and writes the machine (JSON) and human (Markdown) reports.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;

use fieldaudit_client::config::parse_base_url;
use fieldaudit_client::{AuditConfig, AuditDriver, AuditReport};
use fieldaudit_schema::ApiSpec;

use crate::write_creating_dirs;

/// Default path of the machine report.
pub const DEFAULT_OUT_JSON: &str = "output/api-field-audit.json";

/// Default path of the Markdown report.
pub const DEFAULT_OUT_MD: &str = "docs/status/api-field-audit.md";

/// Arguments for the `fieldaudit audit` subcommand.
#[derive(Args, Debug, Clone)]
pub struct AuditArgs {
    /// Specification document (JSON or YAML).
    #[arg(long, value_name = "FILE")]
    pub spec: PathBuf,

    /// Base URL of the API, including any path prefix. Overrides
    /// FIELDAUDIT_API_BASE.
    #[arg(long, value_name = "URL")]
    pub base: Option<String>,

    /// Machine report output path.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_OUT_JSON)]
    pub out_json: PathBuf,

    /// Markdown report output path.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_OUT_MD)]
    pub out_md: PathBuf,

    /// Per-request timeout in seconds. Overrides FIELDAUDIT_TIMEOUT_SECS.
    #[arg(long, value_name = "N")]
    pub timeout_secs: Option<u64>,

    /// Endpoints probed at once. Overrides FIELDAUDIT_CONCURRENCY.
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,
}

/// Execute the audit subcommand.
///
/// Returns exit code 0 once both reports are written. Endpoint failures are
/// report content, not command failures.
pub async fn run_audit(args: &AuditArgs) -> Result<u8> {
    let config = build_config(args)?;
    tracing::info!(?config, "audit configuration");

    let spec = ApiSpec::load(&args.spec)
        .with_context(|| format!("failed to load specification {}", args.spec.display()))?;
    let driver = AuditDriver::new(config).context("failed to build HTTP client")?;

    let report = driver.run(Arc::new(spec)).await;
    tracing::info!(endpoints = report.endpoints.len(), "audit complete");

    write_reports(&report, &args.out_json, &args.out_md, Utc::now())?;
    println!("Wrote {}", args.out_json.display());
    println!("Wrote {}", args.out_md.display());
    Ok(0)
}

/// Environment configuration with command-line overrides applied.
pub fn build_config(args: &AuditArgs) -> Result<AuditConfig> {
    let mut config = AuditConfig::from_env().context("invalid audit configuration in environment")?;
    if let Some(base) = &args.base {
        config.base_url = parse_base_url("--base", base)?;
    }
    if let Some(timeout) = args.timeout_secs {
        config.timeout_secs = timeout;
    }
    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
    }
    Ok(config)
}

/// Write both reports, creating parent directories.
pub fn write_reports(
    report: &AuditReport,
    out_json: &Path,
    out_md: &Path,
    generated: DateTime<Utc>,
) -> Result<()> {
    let json = report.to_json_pretty().context("failed to serialize audit report")?;
    write_creating_dirs(out_json, &json)?;
    write_creating_dirs(out_md, &report.render_markdown(generated))?;
    tracing::info!(json = %out_json.display(), markdown = %out_md.display(), "reports written");
    Ok(())
}
