//! # Specification Documents
//!
//! Loads an OpenAPI 3 or Swagger 2 document and enumerates its GET
//! operations as [`Endpoint`]s.
//!
//! Response schema selection prefers `200`, `201`, `202`, then the first
//! other `2xx` code in document order. Within an OpenAPI 3 response the
//! `application/json` media entry is preferred, then the first media entry.
//! A Swagger 2 response carries its schema directly.

use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::resolve::resolve_pointer;

const PREFERRED_RESPONSE_CODES: &[&str] = &["200", "201", "202"];
const JSON_MEDIA_TYPE: &str = "application/json";

/// A parsed specification document.
#[derive(Debug, Clone)]
pub struct ApiSpec {
    root: Value,
    source: String,
}

/// Where a parameter is carried in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    /// A `{name}` segment of the path template.
    Path,
    /// A query-string parameter.
    Query,
    /// A request header.
    Header,
    /// A cookie.
    Cookie,
    /// Anything else (Swagger 2 `body`/`formData`).
    Other,
}

impl ParameterLocation {
    fn parse(name: &str) -> Self {
        match name {
            "path" => Self::Path,
            "query" => Self::Query,
            "header" => Self::Header,
            "cookie" => Self::Cookie,
            _ => Self::Other,
        }
    }
}

/// A declared operation parameter, with `$ref` already resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Where the parameter goes.
    pub location: ParameterLocation,
    /// Whether the parameter is required.
    pub required: bool,
    /// Declared `type` keyword, if any.
    pub schema_type: Option<String>,
    /// Declared default value.
    pub default: Option<Value>,
    /// Declared enum values, in document order.
    pub enum_values: Vec<Value>,
}

/// One GET operation of the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Endpoint {
    /// HTTP method, upper case.
    pub method: String,
    /// Path template, e.g. `/flow/v1/account/{address}`.
    pub path: String,
    /// Path-item and operation parameters merged, operation winning.
    pub parameters: Vec<Parameter>,
    /// Selected success response schema, unresolved.
    pub response_schema: Option<Value>,
}

impl Endpoint {
    /// Parameters carried in the given location, in declaration order.
    pub fn parameters_in(&self, location: ParameterLocation) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(move |p| p.location == location)
    }
}

impl ApiSpec {
    /// Load a document from disk.
    ///
    /// A `.json` file is parsed as JSON; anything else is tried as JSON then
    /// YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let source = path.display().to_string();
        let text = std::fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let root = if is_json {
            serde_json::from_str(&text).map_err(|e| SchemaError::DocumentLoad {
                path: source.clone(),
                reason: e.to_string(),
            })?
        } else {
            match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(_) => {
                    let yaml: serde_yaml::Value =
                        serde_yaml::from_str(&text).map_err(|e| SchemaError::DocumentLoad {
                            path: source.clone(),
                            reason: e.to_string(),
                        })?;
                    yaml_to_json(&yaml).map_err(|reason| SchemaError::DocumentLoad {
                        path: source.clone(),
                        reason,
                    })?
                }
            }
        };
        Self::from_value(root, source)
    }

    /// Wrap an already-parsed document.
    pub fn from_value(root: Value, source: impl Into<String>) -> Result<Self, SchemaError> {
        let source = source.into();
        if !root.get("paths").is_some_and(Value::is_object) {
            return Err(SchemaError::MissingPaths { source_name: source });
        }
        Ok(Self { root, source })
    }

    /// The parsed document.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Identifier of the document (the path as given).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Every GET operation, in document order.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        let Some(paths) = self.root.get("paths").and_then(Value::as_object) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (path, item) in paths {
            let Some(item) = self.deref(item).and_then(Value::as_object) else {
                continue;
            };
            let Some(operation) = item.get("get").and_then(Value::as_object) else {
                continue;
            };
            out.push(Endpoint {
                method: "GET".to_string(),
                path: path.clone(),
                parameters: self.merged_parameters(item, operation),
                response_schema: self.response_schema(operation),
            });
        }
        out
    }

    fn deref<'a>(&'a self, node: &'a Value) -> Option<&'a Value> {
        match node.get("$ref").and_then(Value::as_str) {
            Some(reference) => match resolve_pointer(&self.root, reference) {
                Ok(target) => Some(target),
                Err(e) => {
                    tracing::warn!(reference, "skipping document node: {e}");
                    None
                }
            },
            None => Some(node),
        }
    }

    fn merged_parameters(&self, item: &Map<String, Value>, operation: &Map<String, Value>) -> Vec<Parameter> {
        let mut merged: Vec<Parameter> = Vec::new();
        let lists = [item.get("parameters"), operation.get("parameters")];
        for list in lists.into_iter().flatten().filter_map(Value::as_array) {
            for raw in list {
                let Some(param) = self.deref(raw).and_then(|p| self.parse_parameter(p)) else {
                    continue;
                };
                match merged
                    .iter_mut()
                    .find(|p| p.name == param.name && p.location == param.location)
                {
                    Some(existing) => *existing = param,
                    None => merged.push(param),
                }
            }
        }
        merged
    }

    fn parse_parameter(&self, raw: &Value) -> Option<Parameter> {
        let name = raw.get("name")?.as_str()?.to_string();
        let location = ParameterLocation::parse(raw.get("in").and_then(Value::as_str).unwrap_or(""));
        let required = raw.get("required").and_then(Value::as_bool).unwrap_or(false)
            || location == ParameterLocation::Path;

        // OpenAPI 3 nests type/default/enum under `schema`; Swagger 2 puts
        // them on the parameter.
        let attrs = raw
            .get("schema")
            .and_then(|s| self.deref(s))
            .filter(|s| s.is_object())
            .unwrap_or(raw);

        Some(Parameter {
            name,
            location,
            required,
            schema_type: attrs.get("type").and_then(Value::as_str).map(String::from),
            default: attrs.get("default").cloned(),
            enum_values: attrs
                .get("enum")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
        })
    }

    fn response_schema(&self, operation: &Map<String, Value>) -> Option<Value> {
        let responses = operation.get("responses")?.as_object()?;
        let code = PREFERRED_RESPONSE_CODES
            .iter()
            .find(|c| responses.contains_key(**c))
            .map(|c| c.to_string())
            .or_else(|| {
                responses
                    .keys()
                    .find(|k| k.len() == 3 && k.starts_with('2'))
                    .cloned()
            })?;
        let response = self.deref(responses.get(&code)?)?;

        if let Some(content) = response.get("content").and_then(Value::as_object) {
            let media = content
                .get(JSON_MEDIA_TYPE)
                .or_else(|| content.values().next())?;
            return media.get("schema").cloned();
        }
        response.get("schema").cloned()
    }
}

/// Convert a YAML tree to JSON.
///
/// Scalar map keys become strings, so unquoted response codes (`200:`)
/// come out as `"200"`. Tags are dropped.
fn yaml_to_json(yaml: &serde_yaml::Value) -> Result<Value, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::from(i))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::from(u))
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| format!("cannot represent number {n} in JSON"))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(items) => items
            .iter()
            .map(yaml_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        serde_yaml::Value::Mapping(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported map key {other:?}")),
                };
                out.insert(key, yaml_to_json(v)?);
            }
            Ok(Value::Object(out))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}
