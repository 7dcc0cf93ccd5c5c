//! Path and query parameter filling.
//!
//! Path parameters must all resolve, because no placeholder forms a valid
//! path. Query parameters prefer a plausible value and fall back to a scalar
//! placeholder, so the endpoint can still be probed and its shape recorded.

use serde_json::Value;

use fieldaudit_schema::{Endpoint, Parameter, ParameterLocation};

use crate::seeds::{encode_segment, Seeds};

/// Date used wherever a date range is required.
const PLACEHOLDER_DATE: &str = "2020-01-01";

/// Why an endpoint cannot be probed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A `{name}` path segment has no value.
    MissingPathParam(String),
    /// Required query parameters with no placeholder.
    MissingQueryParams(Vec<String>),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPathParam(name) => write!(f, "missing path param {name}"),
            Self::MissingQueryParams(names) => {
                write!(f, "missing required query params: {}", names.join(", "))
            }
        }
    }
}

/// Names of the `{name}` segments of a path template, in order.
pub fn path_param_names(template: &str) -> Vec<&str> {
    template
        .split('/')
        .filter_map(|seg| seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
        .collect()
}

fn path_value(template: &str, name: &str, seeds: &Seeds) -> Option<String> {
    // Ambiguous names resolve by where they sit in the path.
    if name == "id" && template.contains("/contract/{identifier}/{id}") {
        return seeds.identifier.clone();
    }
    if name == "id" && template.contains("/nft/{nft_type}/item/{id}") {
        return seeds.nft_item_id.clone();
    }
    if name == "address" && template.contains("/evm/token/{address}") {
        return seeds.evm_token_address.clone();
    }

    let value = match name {
        "address" => seeds.address.as_deref(),
        "height" => seeds.height.as_deref(),
        "id" | "transaction_id" => seeds.tx_id.as_deref(),
        "token" => seeds.token.as_deref(),
        "nft_type" => seeds.nft_type.as_deref(),
        "identifier" => seeds.identifier.as_deref(),
        "hash" => seeds.evm_hash.as_deref(),
        "epoch" => Some("current"),
        "role" => Some("collection"),
        "node_id" => Some("0"),
        "timescale" => Some("daily"),
        _ => None,
    };
    value.map(String::from)
}

/// Substitute every `{name}` in `template`, percent-encoding each value as a
/// single segment.
pub fn fill_path(template: &str, seeds: &Seeds) -> Result<String, SkipReason> {
    let mut filled = template.to_string();
    for name in path_param_names(template) {
        let value =
            path_value(template, name, seeds).ok_or_else(|| SkipReason::MissingPathParam(name.to_string()))?;
        filled = filled.replace(&format!("{{{name}}}"), &encode_segment(&value));
    }
    Ok(filled)
}

/// Query pairs for an endpoint's declared query parameters, in declaration
/// order. Optional parameters without a conventional value are left unset.
pub fn build_query(endpoint: &Endpoint, seeds: &Seeds) -> Result<Vec<(String, String)>, SkipReason> {
    let mut pairs = Vec::new();
    let mut missing = Vec::new();

    for param in endpoint.parameters_in(ParameterLocation::Query) {
        match query_value(param, seeds) {
            QueryValue::Set(value) => pairs.push((param.name.clone(), value)),
            QueryValue::Unset => {}
            QueryValue::Missing => missing.push(param.name.clone()),
        }
    }

    if missing.is_empty() {
        Ok(pairs)
    } else {
        Err(SkipReason::MissingQueryParams(missing))
    }
}

enum QueryValue {
    Set(String),
    Unset,
    Missing,
}

fn query_value(param: &Parameter, seeds: &Seeds) -> QueryValue {
    let name = param.name.as_str();
    match name {
        "limit" => return QueryValue::Set("1".into()),
        "offset" => return QueryValue::Set("0".into()),
        _ => {}
    }
    if let Some(default) = param.default.as_ref().filter(|v| !v.is_null()) {
        return QueryValue::Set(render_scalar(default));
    }
    if let Some(first) = param.enum_values.first() {
        return QueryValue::Set(render_scalar(first));
    }

    let conventional = match name {
        "fromBlock" | "toBlock" => Some(seeds.height.clone().unwrap_or_else(|| "0".into())),
        "start_date" | "end_date" => Some(PLACEHOLDER_DATE.to_string()),
        "direction" => Some("in".to_string()),
        "id" => Some("0".to_string()),
        _ => None,
    };
    if let Some(value) = conventional {
        return QueryValue::Set(value);
    }

    if !param.required {
        return QueryValue::Unset;
    }
    match name {
        "from" | "to" => QueryValue::Set(PLACEHOLDER_DATE.into()),
        "events" => QueryValue::Set("Flow.AccountCreated".into()),
        _ => match param.schema_type.as_deref() {
            Some("array") | Some("object") => QueryValue::Missing,
            Some("boolean") => QueryValue::Set("false".into()),
            _ => QueryValue::Set("0".into()),
        },
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Encode query pairs as `a=1&b=2`.
pub fn encode_query(pairs: &[(String, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}
