//! # Endpoint Probing
//!
//! One endpoint, one GET. The prober fills parameters from seeds, issues the
//! request, expands the endpoint's response schema, flattens whatever body
//! came back, and classifies the two against each other.
//!
//! A non-2xx status does not short-circuit analysis: error bodies are
//! classified like any other payload. A transport failure or timeout is the
//! endpoint's outcome and carries no field analysis.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use fieldaudit_core::{classify, flatten, FieldCounts, FieldResult, ObservedField, OpenPrefixes};
use fieldaudit_schema::{ApiSpec, Endpoint, SchemaResolver};

use crate::http::ApiClient;
use crate::params::{build_query, encode_query, fill_path};
use crate::seeds::Seeds;

/// Per-endpoint counts plus the HTTP status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSummary {
    /// Status and extra-field counts.
    #[serde(flatten)]
    pub counts: FieldCounts,
    /// HTTP status, when a response was received.
    pub http_status: Option<u16>,
}

/// Outcome of probing one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointResult {
    /// HTTP method.
    pub method: String,
    /// Path template as declared.
    pub path: String,
    /// Requested URL; `None` when skipped.
    pub url: Option<String>,
    /// HTTP status; `None` when skipped or failed.
    pub http_status: Option<u16>,
    /// Wall-clock latency; `None` when skipped or failed.
    pub latency_ms: Option<u64>,
    /// Why the endpoint was not probed.
    pub skip_reason: Option<String>,
    /// Transport, timeout or internal failure.
    pub error: Option<String>,
    /// Counts.
    pub summary: EndpointSummary,
    /// One result per expected field.
    pub field_results: Vec<FieldResult>,
    /// Observed fields the schema does not declare.
    pub extra_fields: Vec<ObservedField>,
    /// References in the response schema that could not be followed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema_errors: Vec<String>,
}

impl EndpointResult {
    pub(crate) fn empty(endpoint: &Endpoint) -> Self {
        Self {
            method: endpoint.method.clone(),
            path: endpoint.path.clone(),
            url: None,
            http_status: None,
            latency_ms: None,
            skip_reason: None,
            error: None,
            summary: EndpointSummary::default(),
            field_results: Vec::new(),
            extra_fields: Vec::new(),
            schema_errors: Vec::new(),
        }
    }

    /// An endpoint that was never requested.
    pub fn skipped(endpoint: &Endpoint, reason: impl Into<String>) -> Self {
        Self {
            skip_reason: Some(reason.into()),
            ..Self::empty(endpoint)
        }
    }

    /// An endpoint whose probe failed before a response was analysed.
    pub fn failed(endpoint: &Endpoint, url: Option<String>, error: impl Into<String>) -> Self {
        Self {
            url,
            error: Some(error.into()),
            ..Self::empty(endpoint)
        }
    }

    /// Whether the endpoint was skipped.
    pub fn is_skipped(&self) -> bool {
        self.skip_reason.is_some()
    }
}

/// Probe one endpoint.
///
/// `extra_open` is merged into the open prefixes derived from the schema.
pub async fn probe(
    client: &ApiClient,
    spec: &ApiSpec,
    endpoint: &Endpoint,
    seeds: &Seeds,
    extra_open: &OpenPrefixes,
) -> EndpointResult {
    let filled = match fill_path(&endpoint.path, seeds) {
        Ok(filled) => filled,
        Err(reason) => {
            tracing::debug!(endpoint = %endpoint.path, %reason, "skipping endpoint");
            return EndpointResult::skipped(endpoint, reason.to_string());
        }
    };
    let query = match build_query(endpoint, seeds) {
        Ok(pairs) => encode_query(&pairs),
        Err(reason) => {
            tracing::debug!(endpoint = %endpoint.path, %reason, "skipping endpoint");
            return EndpointResult::skipped(endpoint, reason.to_string());
        }
    };
    let url = if query.is_empty() {
        client.url_for(&filled)
    } else {
        client.url_for(&format!("{filled}?{query}"))
    };

    let response = match client.get(&url).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(endpoint = %endpoint.path, "probe failed: {e}");
            return EndpointResult::failed(endpoint, Some(url), e.to_string());
        }
    };

    let empty_schema = Value::Object(Default::default());
    let schema = endpoint.response_schema.as_ref().unwrap_or(&empty_schema);
    let resolved = SchemaResolver::new(spec.root()).resolve(schema, "", false);

    let mut open = resolved.open_prefixes;
    open.extend(extra_open.iter().cloned());

    let observed = match &response.body {
        Some(body @ (Value::Object(_) | Value::Array(_))) => flatten(body, ""),
        _ => Default::default(),
    };

    let classification = classify(&resolved.fields, &open, &observed.fields, &observed.array_lengths);
    let counts = classification.counts();
    tracing::debug!(
        endpoint = %endpoint.path,
        status = response.status,
        latency_ms = response.latency_ms,
        expected = counts.expected,
        missing = counts.missing,
        type_mismatch = counts.type_mismatch,
        "endpoint analysed"
    );

    EndpointResult {
        method: endpoint.method.clone(),
        path: endpoint.path.clone(),
        url: Some(url),
        http_status: Some(response.status),
        latency_ms: Some(response.latency_ms),
        skip_reason: None,
        error: None,
        summary: EndpointSummary {
            counts,
            http_status: Some(response.status),
        },
        field_results: classification.field_results,
        extra_fields: classification.extra_fields,
        schema_errors: resolved.unresolved,
    }
}
