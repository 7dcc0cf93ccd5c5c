//! # Field Model
//!
//! Field paths use a dotted/bracketed notation shared by the resolver and the
//! flattener:
//!
//! - `user.balance` is the `balance` key of the `user` object.
//! - `items[]` is the representative element of the `items` array.
//! - `items[].name` is the `name` key of that element.
//! - `labels.*` is any key of the `labels` map (expected side only).
//! - `[]` alone is the element of a root-level array.
//!
//! The empty string denotes the root value.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Expected fields of one response schema, keyed by field path.
pub type ExpectedFields = BTreeMap<String, ExpectedField>;

/// Observed fields of one live payload, keyed by field path.
pub type ObservedFields = BTreeMap<String, ObservedField>;

/// Length of the first array observed at each array-valued path.
pub type ArrayLengths = BTreeMap<String, usize>;

/// Field paths under which undeclared keys are permitted.
pub type OpenPrefixes = BTreeSet<String>;

/// Segment used for map values declared through `additionalProperties`.
pub const WILDCARD_SEGMENT: &str = "*";

/// Suffix marking the representative element of an array.
pub const ITEM_SUFFIX: &str = "[]";

/// JSON type of a field, declared or observed.
///
/// `Null` only appears on the observed side. `Unknown` only appears on the
/// expected side, for schema nodes that declare no inferable type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    /// JSON `null`.
    Null,
    /// JSON `true` / `false`.
    Boolean,
    /// A whole number.
    Integer,
    /// A non-integral number.
    Number,
    /// A JSON string.
    String,
    /// A JSON array.
    Array,
    /// A JSON object.
    Object,
    /// No declared type could be inferred.
    Unknown,
}

impl JsonType {
    /// Classify a runtime JSON value.
    ///
    /// Numbers that serde_json holds as `i64`/`u64` are integers; anything
    /// parsed as `f64` (including `1.0`) is a number.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    /// Parse a declared schema `type` keyword. Unrecognised names are `Unknown`.
    pub fn from_declared(name: &str) -> Self {
        match name {
            "null" => Self::Null,
            "boolean" => Self::Boolean,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "string" => Self::String,
            "array" => Self::Array,
            "object" => Self::Object,
            _ => Self::Unknown,
        }
    }

    /// The lowercase keyword for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
            Self::Unknown => "unknown",
        }
    }

    /// Whether a field declared as `self` accepts an observed value of type
    /// `observed`. Integers are a subtype of numbers; `Unknown` accepts all.
    pub fn accepts(self, observed: JsonType) -> bool {
        match (self, observed) {
            (Self::Unknown, _) => true,
            (Self::Number, Self::Integer) => true,
            (declared, observed) => declared == observed,
        }
    }
}

impl std::fmt::Display for JsonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field promised by the specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedField {
    /// Field path within the endpoint's response.
    pub path: String,
    /// Declared (or inferred) type.
    pub expected_type: JsonType,
    /// Whether the enclosing object lists this property as required.
    pub required: bool,
    /// Declared `format`, if any.
    pub format: Option<String>,
    /// Declared `description`, if any.
    pub description: Option<String>,
}

impl ExpectedField {
    /// Merge another branch's description of the same path into this one.
    ///
    /// A known type wins over `Unknown`, `required` is OR'd, and `format` /
    /// `description` keep the first non-empty value seen.
    pub fn merge(&mut self, other: ExpectedField) {
        if self.expected_type == JsonType::Unknown {
            self.expected_type = other.expected_type;
        }
        self.required |= other.required;
        if is_blank(&self.format) {
            self.format = other.format;
        }
        if is_blank(&self.description) {
            self.description = other.description;
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}

/// A field present in one live payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedField {
    /// Field path within the payload.
    pub path: String,
    /// Runtime type of the value.
    pub observed_type: JsonType,
    /// Truncated textual rendering of the value.
    pub sample: String,
}

/// Path of key `name` under `prefix`.
pub fn child_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Path of the representative element of the array at `prefix`.
pub fn item_path(prefix: &str) -> String {
    format!("{prefix}{ITEM_SUFFIX}")
}

/// Last dotted segment of a path (`data[].address` → `address`).
pub fn leaf_key(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// Array paths enclosing `path`, innermost first.
///
/// `a[].b[].c` yields `a[].b`, then `a`. A root array yields the empty path.
pub fn enclosing_arrays(path: &str) -> Vec<&str> {
    path.rmatch_indices(ITEM_SUFFIX)
        .map(|(idx, _)| &path[..idx])
        .collect()
}

/// Whether `path` equals an open prefix or lies beneath one, including
/// through an array-item path. The empty prefix covers every path.
pub fn is_under_open_prefix(path: &str, open: &OpenPrefixes) -> bool {
    open.iter().any(|prefix| {
        if prefix.is_empty() || path == prefix {
            return true;
        }
        path.strip_prefix(prefix.as_str())
            .is_some_and(|rest| rest.starts_with('.') || rest.starts_with(ITEM_SUFFIX))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn runtime_types_follow_json_shape() {
        assert_eq!(JsonType::of(&json!(null)), JsonType::Null);
        assert_eq!(JsonType::of(&json!(true)), JsonType::Boolean);
        assert_eq!(JsonType::of(&json!(42)), JsonType::Integer);
        assert_eq!(JsonType::of(&json!(-7)), JsonType::Integer);
        assert_eq!(JsonType::of(&json!(1.5)), JsonType::Number);
        assert_eq!(JsonType::of(&json!("x")), JsonType::String);
        assert_eq!(JsonType::of(&json!([])), JsonType::Array);
        assert_eq!(JsonType::of(&json!({})), JsonType::Object);
    }

    #[test]
    fn number_accepts_integer_but_not_the_reverse() {
        assert!(JsonType::Number.accepts(JsonType::Integer));
        assert!(!JsonType::Integer.accepts(JsonType::Number));
        assert!(!JsonType::String.accepts(JsonType::Integer));
        assert!(JsonType::Unknown.accepts(JsonType::Object));
    }

    #[test]
    fn merge_prefers_known_type_and_ors_required() {
        let mut a = ExpectedField {
            path: "x".into(),
            expected_type: JsonType::Unknown,
            required: false,
            format: None,
            description: Some("first".into()),
        };
        a.merge(ExpectedField {
            path: "x".into(),
            expected_type: JsonType::String,
            required: true,
            format: Some("date-time".into()),
            description: Some("second".into()),
        });
        assert_eq!(a.expected_type, JsonType::String);
        assert!(a.required);
        assert_eq!(a.format.as_deref(), Some("date-time"));
        assert_eq!(a.description.as_deref(), Some("first"));
    }

    #[test]
    fn merge_keeps_first_known_type() {
        let mut a = ExpectedField {
            path: "x".into(),
            expected_type: JsonType::Integer,
            required: true,
            format: None,
            description: None,
        };
        a.merge(ExpectedField {
            path: "x".into(),
            expected_type: JsonType::String,
            required: false,
            format: None,
            description: None,
        });
        assert_eq!(a.expected_type, JsonType::Integer);
        assert!(a.required);
    }

    #[test]
    fn enclosing_arrays_innermost_first() {
        assert_eq!(enclosing_arrays("a[].b[].c"), vec!["a[].b", "a"]);
        assert_eq!(enclosing_arrays("[].name"), vec![""]);
        assert!(enclosing_arrays("user.balance").is_empty());
    }

    #[test]
    fn open_prefix_covers_nested_and_item_paths() {
        let open: OpenPrefixes = ["_meta".to_string(), "labels".to_string()].into();
        assert!(is_under_open_prefix("_meta", &open));
        assert!(is_under_open_prefix("_meta.count", &open));
        assert!(is_under_open_prefix("labels[].k", &open));
        assert!(!is_under_open_prefix("_metadata", &open));
        assert!(!is_under_open_prefix("data", &open));

        let root: OpenPrefixes = [String::new()].into();
        assert!(is_under_open_prefix("anything.at.all", &root));
    }

    #[test]
    fn path_helpers() {
        assert_eq!(child_path("", "a"), "a");
        assert_eq!(child_path("a[]", "b"), "a[].b");
        assert_eq!(item_path(""), "[]");
        assert_eq!(leaf_key("data[].address"), "address");
        assert_eq!(leaf_key("height"), "height");
    }
}
