//! Concurrent batch submission: test-first gate, fixed worker pool with
//! per-worker rate limiting, continue-on-error isolation, and retry
//! addressing by original record index.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::domain::model::{
    BatchDisposition, BatchResult, BatchSummary, StructuredRecord, SubmissionOutcome,
};
use crate::domain::ports::{ContinueGate, RecordSubmitter};

const PROGRESS_EVERY: usize = 10;

/// One unit of work: the record's original 1-based index and its body.
pub type WorkItem = (usize, StructuredRecord);

#[derive(Debug, Clone)]
pub struct SubmitOptions {
    /// Fixed worker pool size.
    pub workers: usize,
    /// Per-worker delay before each request. Aggregate steady-state
    /// throughput approaches workers / delay requests per second.
    pub delay: Duration,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            workers: 4,
            delay: Duration::from_millis(500),
        }
    }
}

/// The full batch as a working set, indexes assigned 1-based in input order.
pub fn plan_full(records: &[StructuredRecord]) -> Vec<WorkItem> {
    records
        .iter()
        .enumerate()
        .map(|(offset, record)| (offset + 1, record.clone()))
        .collect()
}

/// A retry working set restricted to the given 1-based indexes. Duplicates
/// are collapsed; out-of-range indexes are logged and skipped.
pub fn plan_retry(records: &[StructuredRecord], indexes: &[usize]) -> Vec<WorkItem> {
    let mut seen = HashSet::new();
    let mut working_set = Vec::new();
    for &index in indexes {
        if index == 0 || index > records.len() {
            tracing::warn!(index, max = records.len(), "retry index out of range, skipping");
            continue;
        }
        if !seen.insert(index) {
            continue;
        }
        working_set.push((index, records[index - 1].clone()));
    }
    working_set
}

/// Dispatches a working set to the remote service through an injected
/// transport, guarded by a confirmation gate.
pub struct BatchSubmitter<S, G> {
    transport: Arc<S>,
    gate: G,
    options: SubmitOptions,
}

impl<S, G> BatchSubmitter<S, G>
where
    S: RecordSubmitter + 'static,
    G: ContinueGate,
{
    pub fn new(transport: S, gate: G, options: SubmitOptions) -> Self {
        Self {
            transport: Arc::new(transport),
            gate,
            options,
        }
    }

    /// Runs the full protocol over one working set:
    ///
    /// 1. Submit the first record synchronously and consult the gate (the
    ///    gate is skipped when nothing would remain to confirm).
    /// 2. Dispatch the rest through the worker pool; each worker sleeps the
    ///    configured delay before each request.
    /// 3. Record one outcome per dispatched record; failures never halt
    ///    siblings.
    ///
    /// Every retry produces fresh outcomes carrying original indexes.
    pub async fn send_batch(&self, working_set: Vec<WorkItem>) -> BatchResult {
        let started = Instant::now();
        let mut queue: VecDeque<WorkItem> = working_set.into();

        let Some((test_index, test_record)) = queue.pop_front() else {
            tracing::warn!("empty working set, nothing to submit");
            return BatchResult {
                outcomes: Vec::new(),
                summary: BatchSummary::default(),
                disposition: BatchDisposition::Completed,
                duration: started.elapsed(),
            };
        };

        tracing::info!(record_index = test_index, "submitting test record");
        let tested = dispatch(self.transport.as_ref(), test_index, &test_record).await;
        log_test_outcome(&tested);

        if !queue.is_empty() && !self.gate.confirm_continue(&tested, queue.len()).await {
            tracing::warn!("batch cancelled at the test gate");
            let outcomes = vec![tested];
            let summary = BatchSummary::from_outcomes(&outcomes);
            return BatchResult {
                outcomes,
                summary,
                disposition: BatchDisposition::Aborted,
                duration: started.elapsed(),
            };
        }

        let mut outcomes = vec![tested];
        let remaining = queue.len();
        if remaining > 0 {
            tracing::info!(
                workers = self.options.workers,
                delay_ms = self.options.delay.as_millis() as u64,
                remaining,
                "dispatching worker pool"
            );
            self.run_pool(queue, remaining, &mut outcomes).await;
        }

        let summary = BatchSummary::from_outcomes(&outcomes);
        let result = BatchResult {
            outcomes,
            summary,
            disposition: BatchDisposition::Completed,
            duration: started.elapsed(),
        };
        tracing::info!(
            total = result.summary.total,
            successful = result.summary.successful,
            failed = result.summary.failed,
            duration_secs = format_args!("{:.2}", result.duration.as_secs_f64()),
            requests_per_min = format_args!("{:.1}", result.requests_per_minute()),
            "batch complete"
        );
        result
    }

    /// Fixed pool over a shared queue; workers emit outcomes onto a channel
    /// consumed here, so the collector is message-passing, not shared state.
    async fn run_pool(
        &self,
        queue: VecDeque<WorkItem>,
        expected: usize,
        outcomes: &mut Vec<SubmissionOutcome>,
    ) {
        let queue = Arc::new(Mutex::new(queue));
        let workers = self.options.workers.max(1);
        let (tx, mut rx) = mpsc::channel::<SubmissionOutcome>(workers);

        let mut pool: JoinSet<()> = JoinSet::new();
        for worker in 0..workers {
            let queue = Arc::clone(&queue);
            let transport = Arc::clone(&self.transport);
            let tx = tx.clone();
            let delay = self.options.delay;
            pool.spawn(async move {
                loop {
                    let item = queue.lock().await.pop_front();
                    let Some((index, record)) = item else { break };
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    let outcome = dispatch(transport.as_ref(), index, &record).await;
                    if tx.send(outcome).await.is_err() {
                        break;
                    }
                }
                tracing::trace!(worker, "worker drained");
            });
        }
        drop(tx);

        let mut done = 0;
        let mut succeeded = 0;
        while let Some(outcome) = rx.recv().await {
            done += 1;
            if outcome.success {
                succeeded += 1;
            }
            if done % PROGRESS_EVERY == 0 || done == expected {
                tracing::info!(
                    "[{done}/{expected}] processed - {succeeded} successful, {} failed",
                    done - succeeded
                );
            }
            outcomes.push(outcome);
        }
        while pool.join_next().await.is_some() {}
    }
}

/// One attempt: fresh request id, one outcome, regardless of how the
/// transport fares.
async fn dispatch<S>(transport: &S, index: usize, record: &StructuredRecord) -> SubmissionOutcome
where
    S: RecordSubmitter + ?Sized,
{
    let request_id = Uuid::new_v4().to_string();
    match transport.submit(&request_id, record).await {
        Ok(response) if response.is_success() => {
            SubmissionOutcome::delivered(index, request_id, record, &response)
        }
        Ok(response) => SubmissionOutcome::rejected(index, request_id, record, &response),
        Err(error) => {
            tracing::debug!(record_index = index, %error, "transport error");
            SubmissionOutcome::failed(index, request_id, record, &error)
        }
    }
}

fn log_test_outcome(outcome: &SubmissionOutcome) {
    if outcome.success {
        tracing::info!(
            status = outcome.status_code.unwrap_or_default(),
            request_id = %outcome.request_id,
            "test record accepted"
        );
    } else {
        tracing::error!(
            status = outcome.status_code.unwrap_or_default(),
            request_id = %outcome.request_id,
            error = outcome.error.as_deref().unwrap_or("unknown error"),
            "test record failed"
        );
    }
}
