//! # Semantic Format Heuristics
//!
//! A small fixed set of string-format checks for the chain-explorer domain:
//! RFC 3339 timestamps, 8-byte chain addresses, 32-byte identifiers, EVM
//! hashes, and Cadence type identifiers (`A.<address>.<Contract>[.<Name>]`).
//!
//! Warnings never change a field's primary status; they are attached to the
//! field result for the operator to review.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::field::{leaf_key, ExpectedField, JsonType, ObservedField};

/// A named format warning on one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticWarning {
    /// Declared or named like a timestamp but not RFC 3339.
    TimestampNotRfc3339,
    /// Named like a chain address but not 16 lowercase hex digits.
    AddressFormat,
    /// Named like a block/collection/transaction id but not 64 lowercase hex digits.
    FlowIdFormat,
    /// Named like an EVM hash but not 64 lowercase hex digits.
    EvmHashFormat,
    /// Named like a typed-resource identifier but not starting with `A.`.
    CadenceTypeExpected,
    /// Starts with `A.` but does not follow `A.<address>.<Name>[.<Name>]`.
    CadenceTypeFormat,
}

impl SemanticWarning {
    /// The snake_case tag used in reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TimestampNotRfc3339 => "timestamp_not_rfc3339",
            Self::AddressFormat => "address_format",
            Self::FlowIdFormat => "flow_id_format",
            Self::EvmHashFormat => "evm_hash_format",
            Self::CadenceTypeExpected => "cadence_type_expected",
            Self::CadenceTypeFormat => "cadence_type_format",
        }
    }
}

impl std::fmt::Display for SemanticWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const TIMESTAMP_KEYS: &[&str] = &["timestamp", "created_at", "updated_at", "valid_from", "valid_to"];
const ADDRESS_KEYS: &[&str] = &[
    "address",
    "payer",
    "proposer",
    "primaryAddress",
    "secondaryAddress",
    "owner",
];
const FLOW_ID_KEYS: &[&str] = &["block_id", "collection_id", "transaction_id"];
const EVM_HASH_KEYS: &[&str] = &["hash", "transaction_hash", "tx_hash", "evm_hash"];
const CADENCE_TYPE_KEYS: &[&str] = &["token", "identifier", "nft_type"];

/// Whether `value` matches the built-in pattern `source`. A pattern that
/// fails to compile matches everything, so it never raises a warning.
fn conforms(cell: &'static OnceLock<Option<Regex>>, source: &str, value: &str) -> bool {
    cell.get_or_init(|| Regex::new(source).ok())
        .as_ref()
        .map_or(true, |re| re.is_match(value))
}

fn is_flow_address(value: &str) -> bool {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    conforms(&CELL, r"^(0x)?[0-9a-f]{16}$", value)
}

fn is_flow_id(value: &str) -> bool {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    conforms(&CELL, r"^[0-9a-f]{64}$", value)
}

fn is_evm_hash(value: &str) -> bool {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    conforms(&CELL, r"^(0x)?[0-9a-f]{64}$", value)
}

fn is_cadence_type(value: &str) -> bool {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    conforms(&CELL, r"^A\.[0-9a-f]{16}\.[A-Za-z0-9_]+(\.[A-Za-z0-9_]+)?$", value)
}

/// Whether `s` parses as an RFC 3339 date-time.
pub fn is_rfc3339(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
}

/// Format warnings for one observed field.
///
/// Only string values are checked. The check runs against the observed
/// sample; every pattern here is far shorter than the sample cap.
pub fn semantic_warnings(field: &ExpectedField, observed: &ObservedField) -> Vec<SemanticWarning> {
    if observed.observed_type != JsonType::String {
        return Vec::new();
    }
    let value = observed.sample.as_str();
    if value.is_empty() || value == "null" {
        return Vec::new();
    }

    let key = leaf_key(&field.path);
    let mut warnings = Vec::new();

    let timestamp_like = field.format.as_deref() == Some("date-time") || TIMESTAMP_KEYS.contains(&key);
    if timestamp_like && !is_rfc3339(value) {
        warnings.push(SemanticWarning::TimestampNotRfc3339);
    }
    if ADDRESS_KEYS.contains(&key) && !is_flow_address(value) {
        warnings.push(SemanticWarning::AddressFormat);
    }
    if FLOW_ID_KEYS.contains(&key) && !is_flow_id(value) {
        warnings.push(SemanticWarning::FlowIdFormat);
    }
    if EVM_HASH_KEYS.contains(&key) && !is_evm_hash(value) {
        warnings.push(SemanticWarning::EvmHashFormat);
    }
    if CADENCE_TYPE_KEYS.contains(&key) {
        if !value.starts_with("A.") {
            warnings.push(SemanticWarning::CadenceTypeExpected);
        } else if !is_cadence_type(value) {
            warnings.push(SemanticWarning::CadenceTypeFormat);
        }
    }
    warnings
}
