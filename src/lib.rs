//! bulkpost: validate tabular business records against a declarative field
//! schema, convert them to nested JSON, and batch-submit them to a remote
//! API under bounded concurrency with a test-first checkpoint and
//! index-addressable retry.

pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod ingest;
pub mod utils;

pub use crate::config::{ApiConfig, CliArgs};
pub use crate::core::outcome::ResultLog;
pub use crate::core::schema::Schema;
pub use crate::core::submitter::{plan_full, plan_retry, BatchSubmitter, SubmitOptions};
pub use crate::core::transformer::{transform, transform_all};
pub use crate::core::validator::{ValidationReport, Validator};
pub use crate::domain::model::{BatchResult, RawRecord, StructuredRecord, SubmissionOutcome};
