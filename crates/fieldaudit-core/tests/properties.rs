//! Property tests for flattening and classification.

use fieldaudit_core::{classify, flatten, ExpectedField, ExpectedFields, JsonType, OpenPrefixes};
use proptest::prelude::*;
use serde_json::Value;

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| serde_json::json!(n)),
        (-1.0e6f64..1.0e6).prop_map(|f| serde_json::json!(f)),
        "[a-zA-Z0-9_ ]{0,40}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..6).prop_map(|m| {
                let map: serde_json::Map<String, Value> = m.into_iter().collect();
                Value::Object(map)
            }),
        ]
    })
}

/// Every path reachable by key access or first-element access.
fn reachable(value: &Value, path: String, out: &mut Vec<String>) {
    out.push(path.clone());
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let child = if path.is_empty() { k.clone() } else { format!("{path}.{k}") };
                reachable(v, child, out);
            }
        }
        Value::Array(items) => {
            if let Some(first) = items.first() {
                reachable(first, format!("{path}[]"), out);
            }
        }
        _ => {}
    }
}

fn expectation_from(value: &Value) -> ExpectedFields {
    let flat = flatten(value, "");
    flat.fields
        .values()
        .filter(|f| !f.path.is_empty())
        .enumerate()
        .map(|(i, f)| {
            // Perturb every third declaration so mismatches show up too.
            let ty = if i % 3 == 0 { JsonType::String } else { f.observed_type };
            (
                f.path.clone(),
                ExpectedField {
                    path: f.path.clone(),
                    expected_type: ty,
                    required: i % 2 == 0,
                    format: None,
                    description: None,
                },
            )
        })
        .collect()
}

proptest! {
    /// Flattening records exactly the reachable paths.
    #[test]
    fn flatten_records_every_reachable_path(value in json_value()) {
        let flat = flatten(&value, "");
        let mut expected = Vec::new();
        reachable(&value, String::new(), &mut expected);
        expected.sort();
        expected.dedup();
        let got: Vec<String> = flat.fields.keys().cloned().collect();
        prop_assert_eq!(got, expected);
    }

    /// A non-empty array contributes exactly one item path regardless of length.
    #[test]
    fn array_length_does_not_change_item_paths(item in json_value(), len in 1usize..20) {
        let one = flatten(&Value::Array(vec![item.clone()]), "");
        let many = flatten(&Value::Array(vec![item; len]), "");
        let one_paths: Vec<&String> = one.fields.keys().collect();
        let many_paths: Vec<&String> = many.fields.keys().collect();
        prop_assert_eq!(one_paths, many_paths);
        prop_assert_eq!(many.array_lengths.get(""), Some(&len));
    }

    /// Classification is a pure function of its inputs.
    #[test]
    fn classification_is_deterministic(declared in json_value(), payload in json_value()) {
        let expected = expectation_from(&declared);
        let open = OpenPrefixes::new();
        let flat = flatten(&payload, "");
        let a = classify(&expected, &open, &flat.fields, &flat.array_lengths);
        let b = classify(&expected, &open, &flat.fields, &flat.array_lengths);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.field_results.len(), expected.len());
        let paths: Vec<&String> = a.field_results.iter().map(|r| &r.field).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        prop_assert_eq!(paths, sorted);
    }
}
