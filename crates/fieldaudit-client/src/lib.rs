//! # fieldaudit-client — Live API Probing and Reports
//!
//! Drives an audit of a live HTTP API against its specification document:
//!
//! 1. **Seeding** ([`seeds`]): a fixed, sequential sequence of best-effort
//!    list calls harvests identifiers for path parameters.
//! 2. **Probing** ([`probe`]): per endpoint, fill parameters, issue one GET,
//!    expand the response schema, flatten the body, classify.
//! 3. **Driving** ([`driver`]): a bounded worker pool runs every probe with
//!    panic isolation and sorts results by path.
//! 4. **Reporting** ([`report`]): pretty JSON and a Markdown summary.
//!
//! ## Failure Model
//!
//! Nothing below the driver aborts a run. Skips, transport errors, timeouts
//! and panics become fields of the affected endpoint's result. There is no
//! retry: every endpoint is requested at most once per run.

pub mod config;
pub mod driver;
pub mod error;
pub mod http;
pub mod params;
pub mod probe;
pub mod report;
pub mod seeds;

pub use config::{AuditConfig, ConfigError};
pub use driver::AuditDriver;
pub use error::ClientError;
pub use http::{ApiClient, ApiResponse};
pub use probe::{EndpointResult, EndpointSummary};
pub use report::AuditReport;
pub use seeds::Seeds;
