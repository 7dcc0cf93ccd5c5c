//! # Response Flattening
//!
//! Walks a live JSON payload and records every reachable value at its field
//! path. Arrays contribute their length and only their first element, so the
//! cost is bounded by the payload's shape rather than its size.

use serde::Serialize;
use serde_json::Value;

use crate::field::{child_path, item_path, ArrayLengths, JsonType, ObservedField, ObservedFields};

/// Maximum rendered length of a string sample, in characters.
pub const MAX_SAMPLE_CHARS: usize = 120;

/// Maximum number of object keys listed in an object sample.
pub const MAX_SAMPLE_KEYS: usize = 8;

/// Observed fields and array lengths of one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Flattened {
    /// Every observed value, keyed by path. The root sits at the prefix.
    pub fields: ObservedFields,
    /// Length of the array at each array-valued path.
    pub array_lengths: ArrayLengths,
}

/// Flatten `value` into observed fields rooted at `prefix`.
pub fn flatten(value: &Value, prefix: &str) -> Flattened {
    let mut out = Flattened::default();
    walk(value, prefix, &mut out);
    out
}

fn walk(value: &Value, path: &str, out: &mut Flattened) {
    out.fields.insert(
        path.to_string(),
        ObservedField {
            path: path.to_string(),
            observed_type: JsonType::of(value),
            sample: render_sample(value),
        },
    );

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                walk(child, &child_path(path, key), out);
            }
        }
        Value::Array(items) => {
            // Keep the first length seen; a nested array path is shared by
            // every element of its parent, but only element 0 is visited.
            out.array_lengths
                .entry(path.to_string())
                .or_insert(items.len());
            if let Some(first) = items.first() {
                walk(first, &item_path(path), out);
            }
        }
        _ => {}
    }
}

/// Render a short, human-readable sample of a value.
pub fn render_sample(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => truncate(s),
        Value::Array(items) => format!("array(len={})", items.len()),
        Value::Object(map) => {
            let mut keys = map
                .keys()
                .take(MAX_SAMPLE_KEYS)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(",");
            if map.len() > MAX_SAMPLE_KEYS {
                keys.push_str(",...");
            }
            format!("object(keys={keys})")
        }
    }
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_SAMPLE_CHARS {
        return s.to_string();
    }
    let mut out: String = s.chars().take(MAX_SAMPLE_CHARS - 3).collect();
    out.push_str("...");
    out
}
