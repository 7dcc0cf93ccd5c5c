//! # Audit Reports
//!
//! The machine report is the serialized [`AuditReport`]. The human report is
//! Markdown: legend, seeds, one summary row per endpoint, then one detail
//! section per endpoint with collapsible field and extra-field tables.

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use fieldaudit_core::FieldStatus;

use crate::probe::EndpointResult;
use crate::seeds::Seeds;

/// Semantic warnings listed per endpoint before the rest are elided.
const MAX_LISTED_WARNINGS: usize = 25;

/// Result of one audit run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Base URL of the audited API.
    pub base: String,
    /// Specification document identifier.
    pub spec: String,
    /// Unix seconds at which the run finished.
    pub timestamp: i64,
    /// Seeds used to fill path parameters.
    pub seeds: Seeds,
    /// One result per GET endpoint, sorted by path.
    pub endpoints: Vec<EndpointResult>,
}

impl AuditReport {
    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Markdown rendering stamped with `generated`.
    pub fn render_markdown(&self, generated: DateTime<Utc>) -> String {
        let mut md = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_markdown(&mut md, generated);
        md
    }

    fn write_markdown(&self, md: &mut String, generated: DateTime<Utc>) -> std::fmt::Result {
        writeln!(md, "# API Field Audit")?;
        writeln!(md)?;
        writeln!(md, "- Generated: `{}`", generated.to_rfc3339_opts(SecondsFormat::Secs, true))?;
        writeln!(md, "- Base: `{}`", self.base)?;
        writeln!(md, "- Spec: `{}`", self.spec)?;
        writeln!(md)?;

        writeln!(md, "Legend:")?;
        for status in FieldStatus::ALL {
            writeln!(md, "- `{status}`: {}", legend(status))?;
        }
        writeln!(md)?;

        writeln!(md, "Sample Seeds (for path params):")?;
        for (name, value) in self.seeds.entries() {
            writeln!(md, "- `{name}`: `{}`", value.unwrap_or("null"))?;
        }
        writeln!(md)?;

        writeln!(md, "## Summary")?;
        writeln!(md)?;
        writeln!(
            md,
            "| Endpoint | HTTP | ms | expected | ok | missing | null | type_mismatch | unverified | extra | skip |"
        )?;
        writeln!(md, "|---|---:|---:|---:|---:|---:|---:|---:|---:|---:|---|")?;
        for ep in &self.endpoints {
            let name = format!("{} {}", ep.method, ep.path);
            if let Some(reason) = &ep.skip_reason {
                writeln!(md, "| `{name}` |  |  |  |  |  |  |  |  |  | `{}` |", escape(reason))?;
                continue;
            }
            let c = &ep.summary.counts;
            writeln!(
                md,
                "| `{name}` | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |",
                opt(ep.http_status),
                opt(ep.latency_ms),
                c.expected,
                c.ok,
                c.missing,
                c.null,
                c.type_mismatch,
                c.unverified_empty_array,
                c.extra,
                ep.error.as_deref().map(|e| format!("`{}`", escape(e))).unwrap_or_default(),
            )?;
        }
        writeln!(md)?;

        writeln!(md, "## Details")?;
        writeln!(md)?;
        for ep in &self.endpoints {
            write_endpoint(md, ep)?;
        }
        Ok(())
    }
}

fn write_endpoint(md: &mut String, ep: &EndpointResult) -> std::fmt::Result {
    writeln!(md, "### `{} {}`", ep.method, ep.path)?;
    if let Some(url) = &ep.url {
        writeln!(md, "- URL: `{url}`")?;
    }
    if let Some(reason) = &ep.skip_reason {
        writeln!(md, "- SKIP: `{}`", escape(reason))?;
        writeln!(md)?;
        return Ok(());
    }
    if let Some(error) = &ep.error {
        writeln!(md, "- ERROR: `{}`", escape(error))?;
        writeln!(md)?;
        return Ok(());
    }
    writeln!(md, "- HTTP: `{}`", opt(ep.http_status))?;
    writeln!(md, "- Latency: `{}ms`", opt(ep.latency_ms))?;
    let c = &ep.summary.counts;
    writeln!(
        md,
        "- Counts: expected={} ok={} missing={} null={} type_mismatch={} unverified={} extra={}",
        c.expected, c.ok, c.missing, c.null, c.type_mismatch, c.unverified_empty_array, c.extra
    )?;
    for err in &ep.schema_errors {
        writeln!(md, "- Schema error: `{}`", escape(err))?;
    }

    let warned: Vec<_> = ep.field_results.iter().filter(|fr| !fr.warnings.is_empty()).collect();
    if !warned.is_empty() {
        writeln!(md, "- Semantic warnings:")?;
        for fr in warned.iter().take(MAX_LISTED_WARNINGS) {
            writeln!(
                md,
                "  - `{}`: `{}` (sample=`{}`)",
                fr.field,
                join_warnings(&fr.warnings),
                escape(fr.sample.as_deref().unwrap_or(""))
            )?;
        }
        if warned.len() > MAX_LISTED_WARNINGS {
            writeln!(md, "  - (and {} more...)", warned.len() - MAX_LISTED_WARNINGS)?;
        }
    }

    writeln!(md)?;
    writeln!(md, "<details><summary>Field-Level Report (expected vs observed)</summary>")?;
    writeln!(md)?;
    writeln!(md, "| Field | Required | Expected | Observed | Status | Sample | Warnings |")?;
    writeln!(md, "|---|---:|---|---|---|---|---|")?;
    for fr in &ep.field_results {
        let observed = fr.observed_type.map_or("None".to_string(), |t| t.to_string());
        writeln!(
            md,
            "| `{}` | {} | `{}` | `{}` | `{}` | `{}` | `{}` |",
            fr.field,
            fr.required,
            fr.expected_type,
            observed,
            fr.status,
            escape(fr.sample.as_deref().unwrap_or("")),
            escape(&join_warnings(&fr.warnings)),
        )?;
    }
    writeln!(md)?;
    writeln!(md, "</details>")?;
    writeln!(md)?;

    if !ep.extra_fields.is_empty() {
        writeln!(md, "<details><summary>Extra Observed Fields (not in spec)</summary>")?;
        writeln!(md)?;
        writeln!(md, "| Field | Observed | Sample |")?;
        writeln!(md, "|---|---|---|")?;
        for of in &ep.extra_fields {
            writeln!(md, "| `{}` | `{}` | `{}` |", of.path, of.observed_type, escape(&of.sample))?;
        }
        writeln!(md)?;
        writeln!(md, "</details>")?;
        writeln!(md)?;
    }
    Ok(())
}

fn legend(status: FieldStatus) -> &'static str {
    match status {
        FieldStatus::Ok => "field exists and JSON type matches (integer allowed where spec says number)",
        FieldStatus::Null => "field exists but value is null",
        FieldStatus::Missing => "field absent in observed payload",
        FieldStatus::TypeMismatch => "field exists but JSON type differs from spec",
        FieldStatus::UnverifiedEmptyArray => {
            "field is inside an array item (or map value), but the container was empty in the sample payload"
        }
    }
}

fn join_warnings(warnings: &[fieldaudit_core::SemanticWarning]) -> String {
    warnings.iter().map(|w| w.as_str()).collect::<Vec<_>>().join(",")
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Escape a table cell.
pub fn escape(s: &str) -> String {
    s.replace('|', "\\|")
}
