#![deny(missing_docs)]

//! # fieldaudit-core — Field Model and Conformance Classification
//!
//! This crate holds the pure half of the audit engine. It has no I/O and no
//! internal crate dependencies: given an expected-field map derived from a
//! specification and an observed-field map derived from one live payload, it
//! decides the conformance status of every expected field.
//!
//! ## Design Principles
//!
//! 1. **Closed type enumeration.** Both expected and observed types are a
//!    [`JsonType`]. Comparison is a total function over that enum.
//!
//! 2. **Deterministic output.** Every map is a `BTreeMap` keyed by field path,
//!    so classification order is lexicographic by construction.
//!
//! 3. **Read-only inputs.** [`classify`] borrows both maps and produces new
//!    results; neither map is mutated.

pub mod classify;
pub mod field;
pub mod flatten;
pub mod semantic;

pub use classify::{classify, Classification, FieldCounts, FieldResult, FieldStatus};
pub use field::{
    ArrayLengths, ExpectedField, ExpectedFields, JsonType, ObservedField, ObservedFields,
    OpenPrefixes,
};
pub use flatten::{flatten, Flattened};
pub use semantic::SemanticWarning;
