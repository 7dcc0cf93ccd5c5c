//! Schema and document error types.

use thiserror::Error;

/// Errors raised while loading a specification or following references.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The document could not be read or parsed.
    #[error("failed to load specification {path}: {reason}")]
    DocumentLoad {
        /// Path of the document.
        path: String,
        /// Human-readable reason for the failure.
        reason: String,
    },

    /// The document has no `paths` object.
    #[error("specification {source_name} has no `paths` object")]
    MissingPaths {
        /// Identifier of the document.
        source_name: String,
    },

    /// A local reference points at nothing in the document.
    #[error("unresolved reference {reference}")]
    UnresolvedReference {
        /// The `$ref` value.
        reference: String,
    },

    /// Only `#/...` references are followed.
    #[error("non-local reference {reference} is not supported")]
    NonLocalReference {
        /// The `$ref` value.
        reference: String,
    },

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
