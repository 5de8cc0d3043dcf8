use async_trait::async_trait;

use crate::domain::model::{StructuredRecord, SubmissionOutcome, SubmitResponse};
use crate::utils::error::SubmitError;

/// Request-execution capability injected into the batch submitter. The
/// transport returns `Ok` for any HTTP response it received (status
/// interpretation happens in the protocol layer) and `Err` only for
/// transport-level faults such as timeouts or connection failures.
#[async_trait]
pub trait RecordSubmitter: Send + Sync {
    async fn submit(
        &self,
        request_id: &str,
        record: &StructuredRecord,
    ) -> Result<SubmitResponse, SubmitError>;
}

/// Confirmation capability consulted at most once per run, after the
/// test-first submission and before the worker pool starts. Returning false
/// aborts the run with only the test outcome recorded.
#[async_trait]
pub trait ContinueGate: Send + Sync {
    async fn confirm_continue(&self, tested: &SubmissionOutcome, remaining: usize) -> bool;
}
