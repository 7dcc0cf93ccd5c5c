//! # Schema Resolution
//!
//! Expands a response schema into the flat set of fields it promises.
//!
//! ## Rules
//!
//! - `$ref` (local only) is followed by JSON Pointer lookup. A reference
//!   already on the current chain is skipped, so self-referential schemas
//!   terminate while sibling branches may still expand the same reference.
//! - `allOf` branches are walked at the same path and merged field by field.
//! - Object properties land at `prefix.name`; `required` comes from the
//!   node's own `required` list.
//! - `additionalProperties` (anything but `false`) marks the prefix open; a
//!   sub-schema is expanded at `prefix.*`.
//! - Array items land at `prefix[]`.
//! - Without an explicit `type`: `properties`/`additionalProperties` imply
//!   object, `items` implies array, `allOf` implies object, otherwise unknown.

use serde::Serialize;
use serde_json::{Map, Value};

use fieldaudit_core::field::{child_path, item_path, WILDCARD_SEGMENT};
use fieldaudit_core::{ExpectedField, ExpectedFields, JsonType, OpenPrefixes};

use crate::error::SchemaError;

/// Expected fields, open prefixes, and reference failures for one schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedSchema {
    /// Every declared property path below the root.
    pub fields: ExpectedFields,
    /// Paths that permit undeclared keys.
    pub open_prefixes: OpenPrefixes,
    /// Descriptions of references that could not be followed.
    pub unresolved: Vec<String>,
}

/// Resolves schema nodes against one specification document.
#[derive(Debug, Clone, Copy)]
pub struct SchemaResolver<'a> {
    root: &'a Value,
}

impl<'a> SchemaResolver<'a> {
    /// Create a resolver over the document `root`.
    pub fn new(root: &'a Value) -> Self {
        Self { root }
    }

    /// Expand `node` at `prefix`. The node at a non-empty prefix is itself
    /// recorded with the given `required` flag.
    pub fn resolve(&self, node: &Value, prefix: &str, required: bool) -> ResolvedSchema {
        let mut out = ResolvedSchema::default();
        let mut chain = Vec::new();
        self.walk(node, prefix, required, &mut chain, &mut out);
        out
    }

    fn walk(
        &self,
        node: &Value,
        prefix: &str,
        required: bool,
        chain: &mut Vec<String>,
        out: &mut ResolvedSchema,
    ) {
        let Some(obj) = node.as_object() else {
            return;
        };

        if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
            if chain.iter().any(|seen| seen == reference) {
                tracing::trace!(reference, prefix, "reference cycle; already expanded on this chain");
                return;
            }
            match resolve_pointer(self.root, reference) {
                Ok(target) => {
                    chain.push(reference.to_string());
                    self.walk(target, prefix, required, chain, out);
                    chain.pop();
                }
                Err(e) => {
                    tracing::warn!(reference, prefix, "skipping schema branch: {e}");
                    let entry = e.to_string();
                    if !out.unresolved.contains(&entry) {
                        out.unresolved.push(entry);
                    }
                }
            }
            return;
        }

        if let Some(branches) = obj.get("allOf").and_then(Value::as_array) {
            for branch in branches {
                self.walk(branch, prefix, required, chain, out);
            }
            // Sibling keywords next to `allOf` act as one more branch.
            if !has_shape_keywords(obj) {
                record(obj, prefix, required, JsonType::Object, out);
                return;
            }
        }

        let expected_type = declared_type(obj);
        record(obj, prefix, required, expected_type, out);

        match expected_type {
            JsonType::Object => self.walk_object(obj, prefix, chain, out),
            JsonType::Array => {
                if let Some(items) = obj.get("items").filter(|v| v.is_object()) {
                    self.walk(items, &item_path(prefix), false, chain, out);
                }
            }
            _ => {}
        }
    }

    fn walk_object(
        &self,
        obj: &Map<String, Value>,
        prefix: &str,
        chain: &mut Vec<String>,
        out: &mut ResolvedSchema,
    ) {
        let required: Vec<&str> = obj
            .get("required")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        if let Some(properties) = obj.get("properties").and_then(Value::as_object) {
            for (name, child) in properties {
                let is_required = required.contains(&name.as_str());
                self.walk(child, &child_path(prefix, name), is_required, chain, out);
            }
        }

        match obj.get("additionalProperties") {
            None | Some(Value::Null) | Some(Value::Bool(false)) => {}
            Some(additional) => {
                out.open_prefixes.insert(prefix.to_string());
                if additional.is_object() {
                    self.walk(additional, &child_path(prefix, WILDCARD_SEGMENT), false, chain, out);
                }
            }
        }
    }
}

fn record(
    obj: &Map<String, Value>,
    prefix: &str,
    required: bool,
    expected_type: JsonType,
    out: &mut ResolvedSchema,
) {
    if prefix.is_empty() {
        return;
    }
    let field = ExpectedField {
        path: prefix.to_string(),
        expected_type,
        required,
        format: string_keyword(obj, "format"),
        description: string_keyword(obj, "description"),
    };
    match out.fields.get_mut(prefix) {
        Some(existing) => existing.merge(field),
        None => {
            out.fields.insert(prefix.to_string(), field);
        }
    }
}

fn has_shape_keywords(obj: &Map<String, Value>) -> bool {
    ["type", "properties", "additionalProperties", "items"]
        .iter()
        .any(|k| obj.contains_key(*k))
}

fn string_keyword(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(String::from)
}

/// Declared or inferred type of a schema node.
///
/// A list-valued `type` (`["string", "null"]`) uses its first non-null entry.
fn declared_type(obj: &Map<String, Value>) -> JsonType {
    match obj.get("type") {
        Some(Value::String(name)) => return JsonType::from_declared(name),
        Some(Value::Array(names)) => {
            if let Some(name) = names.iter().filter_map(Value::as_str).find(|n| *n != "null") {
                return JsonType::from_declared(name);
            }
        }
        _ => {}
    }
    if obj.contains_key("properties") || obj.contains_key("additionalProperties") {
        JsonType::Object
    } else if obj.contains_key("items") {
        JsonType::Array
    } else if obj.contains_key("allOf") {
        JsonType::Object
    } else {
        JsonType::Unknown
    }
}

/// Follow a local `#/...` reference into `root`.
///
/// Pointer segments are unescaped (`~1` → `/`, `~0` → `~`). Array segments
/// are indexed numerically.
pub fn resolve_pointer<'v>(root: &'v Value, reference: &str) -> Result<&'v Value, SchemaError> {
    let Some(pointer) = reference.strip_prefix('#') else {
        return Err(SchemaError::NonLocalReference {
            reference: reference.to_string(),
        });
    };
    if !pointer.is_empty() && !pointer.starts_with('/') {
        return Err(SchemaError::NonLocalReference {
            reference: reference.to_string(),
        });
    }
    root.pointer(pointer)
        .ok_or_else(|| SchemaError::UnresolvedReference {
            reference: reference.to_string(),
        })
}
