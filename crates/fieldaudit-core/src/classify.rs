//! # Conformance Classification
//!
//! Diffs the expected-field map of one endpoint against the observed-field
//! map of one live payload.
//!
//! | Status | Meaning |
//! |--------|---------|
//! | `OK` | present, type compatible with the declaration |
//! | `NULL` | present with value `null` (never a type mismatch) |
//! | `MISSING` | absent from the payload |
//! | `TYPE_MISMATCH` | present with an incompatible type |
//! | `UNVERIFIED_EMPTY_ARRAY` | absent, but the enclosing container was empty |
//!
//! Observed fields with no expectation and outside every open prefix are
//! reported as extras. Extras are informational.

use serde::{Deserialize, Serialize};

use crate::field::{
    enclosing_arrays, is_under_open_prefix, ArrayLengths, ExpectedField, ExpectedFields, JsonType,
    ObservedField, ObservedFields, OpenPrefixes, WILDCARD_SEGMENT,
};
use crate::semantic::{semantic_warnings, SemanticWarning};

/// Conformance status of one expected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldStatus {
    /// Present with a compatible type.
    Ok,
    /// Present with value `null`.
    Null,
    /// Absent from the payload.
    Missing,
    /// Present with an incompatible type.
    TypeMismatch,
    /// Absent because the enclosing container had no elements to inspect.
    UnverifiedEmptyArray,
}

impl FieldStatus {
    /// Every status, in legend order.
    pub const ALL: [FieldStatus; 5] = [
        Self::Ok,
        Self::Null,
        Self::Missing,
        Self::TypeMismatch,
        Self::UnverifiedEmptyArray,
    ];

    /// The report label for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Null => "NULL",
            Self::Missing => "MISSING",
            Self::TypeMismatch => "TYPE_MISMATCH",
            Self::UnverifiedEmptyArray => "UNVERIFIED_EMPTY_ARRAY",
        }
    }
}

impl std::fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification outcome for one expected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldResult {
    /// Expected field path.
    pub field: String,
    /// Whether the schema marks the field required.
    pub required: bool,
    /// Declared type.
    pub expected_type: JsonType,
    /// Observed type, when the field was found.
    pub observed_type: Option<JsonType>,
    /// Conformance status.
    pub status: FieldStatus,
    /// Observed sample, when the field was found.
    pub sample: Option<String>,
    /// Format warnings; never affect `status`.
    pub warnings: Vec<SemanticWarning>,
}

/// Per-status counts for one endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCounts {
    /// Number of expected fields.
    pub expected: usize,
    /// Fields classified `OK`.
    pub ok: usize,
    /// Fields classified `MISSING`.
    pub missing: usize,
    /// Fields classified `NULL`.
    pub null: usize,
    /// Fields classified `TYPE_MISMATCH`.
    pub type_mismatch: usize,
    /// Fields classified `UNVERIFIED_EMPTY_ARRAY`.
    pub unverified_empty_array: usize,
    /// Unexpected observed fields.
    pub extra: usize,
}

/// Field results and unexpected fields for one endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// One result per expected field, in lexicographic path order.
    pub field_results: Vec<FieldResult>,
    /// Observed fields absent from the expectation and outside open prefixes.
    pub extra_fields: Vec<ObservedField>,
}

impl Classification {
    /// Tally statuses and extras.
    pub fn counts(&self) -> FieldCounts {
        let mut counts = FieldCounts {
            expected: self.field_results.len(),
            extra: self.extra_fields.len(),
            ..FieldCounts::default()
        };
        for result in &self.field_results {
            match result.status {
                FieldStatus::Ok => counts.ok += 1,
                FieldStatus::Null => counts.null += 1,
                FieldStatus::Missing => counts.missing += 1,
                FieldStatus::TypeMismatch => counts.type_mismatch += 1,
                FieldStatus::UnverifiedEmptyArray => counts.unverified_empty_array += 1,
            }
        }
        counts
    }
}

/// Classify every expected field against one observed payload.
///
/// Pure: identical inputs yield identical output, including order.
pub fn classify(
    expected: &ExpectedFields,
    open_prefixes: &OpenPrefixes,
    observed: &ObservedFields,
    array_lengths: &ArrayLengths,
) -> Classification {
    let field_results = expected
        .values()
        .map(|field| classify_field(field, observed, array_lengths))
        .collect();

    let extra_fields = observed
        .values()
        .filter(|obs| !obs.path.is_empty())
        .filter(|obs| !is_expected(&obs.path, expected))
        .filter(|obs| !is_under_open_prefix(&obs.path, open_prefixes))
        .cloned()
        .collect();

    Classification {
        field_results,
        extra_fields,
    }
}

fn classify_field(
    field: &ExpectedField,
    observed: &ObservedFields,
    array_lengths: &ArrayLengths,
) -> FieldResult {
    let Some(obs) = lookup(&field.path, observed) else {
        return FieldResult {
            field: field.path.clone(),
            required: field.required,
            expected_type: field.expected_type,
            observed_type: None,
            status: absent_status(&field.path, observed, array_lengths),
            sample: None,
            warnings: Vec::new(),
        };
    };

    let status = if obs.observed_type == JsonType::Null {
        FieldStatus::Null
    } else if field.expected_type.accepts(obs.observed_type) {
        FieldStatus::Ok
    } else {
        FieldStatus::TypeMismatch
    };

    FieldResult {
        field: field.path.clone(),
        required: field.required,
        expected_type: field.expected_type,
        observed_type: Some(obs.observed_type),
        status,
        sample: Some(obs.sample.clone()),
        warnings: semantic_warnings(field, obs),
    }
}

/// Status of an expected field that no observed path matched.
fn absent_status(path: &str, observed: &ObservedFields, array_lengths: &ArrayLengths) -> FieldStatus {
    // The innermost enclosing array that was actually observed decides.
    for array in enclosing_arrays(path) {
        if let Some(&len) = array_lengths.get(array) {
            return if len == 0 {
                FieldStatus::UnverifiedEmptyArray
            } else {
                FieldStatus::Missing
            };
        }
    }

    // A map that was observed with no keys at all leaves its values unverified.
    if let Some((parent, scope)) = wildcard_scope(path) {
        let parent_is_object =
            lookup(parent, observed).is_some_and(|p| p.observed_type == JsonType::Object);
        if parent_is_object && lookup(scope, observed).is_none() {
            return FieldStatus::UnverifiedEmptyArray;
        }
    }

    FieldStatus::Missing
}

/// Find the observed field for an expected path, expanding `*` segments.
fn lookup<'a>(path: &str, observed: &'a ObservedFields) -> Option<&'a ObservedField> {
    if !has_wildcard(path) {
        return observed.get(path);
    }
    observed
        .values()
        .find(|obs| wildcard_matches(path, &obs.path))
}

fn is_expected(path: &str, expected: &ExpectedFields) -> bool {
    expected.contains_key(path)
        || expected
            .keys()
            .any(|pattern| has_wildcard(pattern) && wildcard_matches(pattern, path))
}

fn has_wildcard(path: &str) -> bool {
    path.split('.').any(is_wildcard_segment)
}

fn is_wildcard_segment(segment: &str) -> bool {
    segment.trim_end_matches("[]") == WILDCARD_SEGMENT
}

/// For a path containing a `*` segment: the map the last wildcard ranges
/// over, and the path up to and including that wildcard.
fn wildcard_scope(path: &str) -> Option<(&str, &str)> {
    let nested = path.rfind(".*").map(|idx| idx + 2).filter(|&end| {
        let rest = &path[end..];
        rest.is_empty() || rest.starts_with('.') || rest.starts_with("[]")
    });
    let root = (path == WILDCARD_SEGMENT || path.starts_with("*.") || path.starts_with("*[]")).then_some(1);
    let end = nested.or(root)?;
    let parent = if end == 1 { "" } else { &path[..end - 2] };
    Some((parent, &path[..end]))
}

/// Segment-wise match where a `*` segment matches any single key.
fn wildcard_matches(pattern: &str, path: &str) -> bool {
    let pattern_segments: Vec<&str> = pattern.split('.').collect();
    let path_segments: Vec<&str> = path.split('.').collect();
    if pattern_segments.len() != path_segments.len() {
        return false;
    }
    pattern_segments
        .iter()
        .zip(&path_segments)
        .all(|(pat, seg)| segment_matches(pat, seg))
}

fn segment_matches(pattern: &str, segment: &str) -> bool {
    let pat_items = pattern.len() - pattern.trim_end_matches("[]").len();
    let seg_items = segment.len() - segment.trim_end_matches("[]").len();
    if pat_items != seg_items {
        return false;
    }
    let pat_key = pattern.trim_end_matches("[]");
    let seg_key = segment.trim_end_matches("[]");
    if pat_key == WILDCARD_SEGMENT {
        // The root and array items have no key for `*` to stand for.
        !seg_key.is_empty()
    } else {
        pat_key == seg_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;
    use serde_json::json;

    fn field(path: &str, ty: JsonType, required: bool) -> ExpectedField {
        ExpectedField {
            path: path.into(),
            expected_type: ty,
            required,
            format: None,
            description: None,
        }
    }

    fn fields(list: Vec<ExpectedField>) -> ExpectedFields {
        list.into_iter().map(|f| (f.path.clone(), f)).collect()
    }

    fn run(expected: &ExpectedFields, open: &OpenPrefixes, payload: serde_json::Value) -> Classification {
        let flat = flatten(&payload, "");
        classify(expected, open, &flat.fields, &flat.array_lengths)
    }

    #[test]
    fn integer_field_present_is_ok_with_sample() {
        let expected = fields(vec![
            field("user", JsonType::Object, true),
            field("user.balance", JsonType::Integer, true),
        ]);
        let out = run(&expected, &OpenPrefixes::new(), json!({"user": {"balance": 42}}));
        let balance = &out.field_results[1];
        assert_eq!(balance.field, "user.balance");
        assert_eq!(balance.status, FieldStatus::Ok);
        assert_eq!(balance.sample.as_deref(), Some("42"));
        assert!(out.extra_fields.is_empty());
    }

    #[test]
    fn empty_array_leaves_item_fields_unverified() {
        let expected = fields(vec![
            field("items", JsonType::Array, false),
            field("items[]", JsonType::Object, false),
            field("items[].name", JsonType::String, false),
        ]);
        let out = run(&expected, &OpenPrefixes::new(), json!({"items": []}));
        let statuses: Vec<_> = out.field_results.iter().map(|r| (r.field.as_str(), r.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("items", FieldStatus::Ok),
                ("items[]", FieldStatus::UnverifiedEmptyArray),
                ("items[].name", FieldStatus::UnverifiedEmptyArray),
            ]
        );
    }

    #[test]
    fn absent_item_field_in_non_empty_array_is_missing() {
        let expected = fields(vec![field("items[].name", JsonType::String, true)]);
        let out = run(&expected, &OpenPrefixes::new(), json!({"items": [{"id": 1}]}));
        assert_eq!(out.field_results[0].status, FieldStatus::Missing);
    }

    #[test]
    fn nested_empty_outer_array_is_unverified() {
        let expected = fields(vec![field("a[].b[].c", JsonType::String, false)]);
        let out = run(&expected, &OpenPrefixes::new(), json!({"a": []}));
        assert_eq!(out.field_results[0].status, FieldStatus::UnverifiedEmptyArray);
    }

    #[test]
    fn null_is_never_a_type_mismatch() {
        for ty in [JsonType::String, JsonType::Integer, JsonType::Object, JsonType::Unknown] {
            let expected = fields(vec![field("x", ty, false)]);
            let out = run(&expected, &OpenPrefixes::new(), json!({"x": null}));
            assert_eq!(out.field_results[0].status, FieldStatus::Null, "declared {ty}");
        }
    }

    #[test]
    fn compatibility_rules() {
        let expected = fields(vec![
            field("n", JsonType::Number, false),
            field("s", JsonType::String, false),
            field("u", JsonType::Unknown, false),
        ]);
        let out = run(&expected, &OpenPrefixes::new(), json!({"n": 3, "s": 3, "u": [1]}));
        assert_eq!(out.field_results[0].status, FieldStatus::Ok);
        assert_eq!(out.field_results[1].status, FieldStatus::TypeMismatch);
        assert_eq!(out.field_results[2].status, FieldStatus::Ok);
    }

    #[test]
    fn date_time_warning_does_not_change_status() {
        let mut created = field("createdAt", JsonType::String, false);
        created.format = Some("date-time".into());
        let expected = fields(vec![created]);
        let out = run(&expected, &OpenPrefixes::new(), json!({"createdAt": "2024-13-01"}));
        assert_eq!(out.field_results[0].status, FieldStatus::Ok);
        assert_eq!(out.field_results[0].warnings, vec![SemanticWarning::TimestampNotRfc3339]);
    }

    #[test]
    fn extras_respect_open_prefixes() {
        let expected = fields(vec![field("id", JsonType::String, true)]);
        let open: OpenPrefixes = ["_meta".to_string()].into();
        let out = run(
            &expected,
            &open,
            json!({"id": "a", "_meta": {"count": 1}, "debug": {"trace": [1]}}),
        );
        let extras: Vec<&str> = out.extra_fields.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(extras, vec!["debug", "debug.trace", "debug.trace[]"]);
    }

    #[test]
    fn wildcard_fields_match_any_key() {
        let expected = fields(vec![
            field("labels", JsonType::Object, false),
            field("labels.*", JsonType::String, false),
        ]);
        let open: OpenPrefixes = ["labels".to_string()].into();

        let out = run(&expected, &open, json!({"labels": {"env": "prod"}}));
        assert_eq!(out.field_results[1].status, FieldStatus::Ok);
        assert_eq!(out.field_results[1].sample.as_deref(), Some("prod"));

        let out = run(&expected, &open, json!({"labels": {"env": 1}}));
        assert_eq!(out.field_results[1].status, FieldStatus::TypeMismatch);

        let out = run(&expected, &open, json!({"labels": {}}));
        assert_eq!(out.field_results[1].status, FieldStatus::UnverifiedEmptyArray);

        let out = run(&expected, &open, json!({}));
        assert_eq!(out.field_results[1].status, FieldStatus::Missing);
    }

    #[test]
    fn root_wildcard_never_matches_the_root_itself() {
        let expected = fields(vec![field("*", JsonType::Integer, false)]);

        let out = run(&expected, &OpenPrefixes::new(), json!({"a": 1, "b": 2}));
        assert_eq!(out.field_results[0].status, FieldStatus::Ok);
        assert_eq!(out.field_results[0].sample.as_deref(), Some("1"));
        assert!(out.extra_fields.is_empty());

        let out = run(&expected, &OpenPrefixes::new(), json!({}));
        assert_eq!(out.field_results[0].status, FieldStatus::UnverifiedEmptyArray);
    }

    #[test]
    fn wildcard_paths_are_not_extras() {
        let expected = fields(vec![
            field("m", JsonType::Object, false),
            field("m.*", JsonType::Object, false),
            field("m.*.v", JsonType::Integer, false),
        ]);
        let out = run(&expected, &OpenPrefixes::new(), json!({"m": {"a": {"v": 1}}}));
        assert!(out.extra_fields.is_empty(), "{:?}", out.extra_fields);
        assert!(out.field_results.iter().all(|r| r.status == FieldStatus::Ok));

        let out = run(&expected, &OpenPrefixes::new(), json!({"m": {"a": {"w": 1}}}));
        assert_eq!(out.field_results[2].field, "m.*.v");
        assert_eq!(out.field_results[2].status, FieldStatus::Missing);
    }

    #[test]
    fn counts_tally_every_status() {
        let expected = fields(vec![
            field("a", JsonType::String, true),
            field("b", JsonType::String, true),
            field("c", JsonType::String, true),
            field("d", JsonType::String, true),
            field("e[].f", JsonType::String, true),
        ]);
        let out = run(
            &expected,
            &OpenPrefixes::new(),
            json!({"a": "x", "b": null, "c": 1, "e": [], "z": true}),
        );
        let counts = out.counts();
        assert_eq!(counts.expected, 5);
        assert_eq!(counts.ok, 1);
        assert_eq!(counts.null, 1);
        assert_eq!(counts.type_mismatch, 1);
        assert_eq!(counts.missing, 1);
        assert_eq!(counts.unverified_empty_array, 1);
        // `e` and `z` are both undeclared.
        assert_eq!(counts.extra, 2);
    }

    #[test]
    fn status_labels_serialize_as_report_tags() {
        let labels: Vec<String> = FieldStatus::ALL
            .iter()
            .map(|s| serde_json::to_string(s).unwrap())
            .collect();
        assert_eq!(
            labels,
            vec!["\"OK\"", "\"NULL\"", "\"MISSING\"", "\"TYPE_MISMATCH\"", "\"UNVERIFIED_EMPTY_ARRAY\""]
        );
        for status in FieldStatus::ALL {
            assert_eq!(format!("\"{status}\""), serde_json::to_string(&status).unwrap());
        }
    }
}
