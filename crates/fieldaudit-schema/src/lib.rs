//! # fieldaudit-schema — Specification Documents & Schema Resolution
//!
//! Loads an OpenAPI-style specification document (JSON or YAML), enumerates
//! its GET endpoints, and expands response schemas into flat expected-field
//! maps.
//!
//! ## Responsibilities
//!
//! - **Documents:** [`ApiSpec`] owns the parsed document, lists
//!   [`Endpoint`]s with their merged parameters and selected response schema.
//! - **Resolution:** [`SchemaResolver`] walks a schema node, following local
//!   `$ref`s with per-chain cycle protection, merging `allOf` branches, and
//!   recording `additionalProperties` prefixes as open.
//!
//! ## Design
//!
//! The resolver never mutates the document. A reference that cannot be
//! followed is recorded in [`ResolvedSchema::unresolved`] and skipped; it
//! ends that expansion branch only.

pub mod document;
pub mod error;
pub mod resolve;

pub use document::{ApiSpec, Endpoint, Parameter, ParameterLocation};
pub use error::SchemaError;
pub use resolve::{resolve_pointer, ResolvedSchema, SchemaResolver};
