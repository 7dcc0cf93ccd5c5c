//! # fieldaudit-cli — Field Audit Command-Line Interface
//!
//! Provides the `fieldaudit` binary.
//!
//! ## Subcommands
//!
//! - `fieldaudit audit`: probe a live API and write the JSON and Markdown
//!   audit reports.
//! - `fieldaudit query`: run one read-only statement against a configured
//!   indexer database and print the rows as JSON.
//!
//! ```bash
//! fieldaudit audit --spec openapi.yaml --base http://127.0.0.1:8080/api
//! fieldaudit -v query --source flowindex "SELECT height FROM blocks ORDER BY height DESC LIMIT 1"
//! ```
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from business logic.
//! - Handlers delegate to the library crates and return an exit code:
//!   0 on success, 1 on operational error.

pub mod audit;
pub mod query;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Write `contents` to `path`, creating parent directories first.
pub fn write_creating_dirs(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
