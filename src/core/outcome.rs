//! Outcome partitioning: splits a batch run into success and failure
//! collections whose entries are directly replayable as retry input.

use crate::domain::model::{BatchResult, SubmissionOutcome};

/// Submission outcomes partitioned by success, keyed by original record
/// index. The failed half round-trips through the failed artifact back into
/// retry planning.
#[derive(Debug, Clone, Default)]
pub struct ResultLog {
    pub successful: Vec<SubmissionOutcome>,
    pub failed: Vec<SubmissionOutcome>,
}

impl ResultLog {
    pub fn from_result(result: &BatchResult) -> Self {
        Self::from_outcomes(result.outcomes.iter().cloned())
    }

    pub fn from_outcomes(outcomes: impl IntoIterator<Item = SubmissionOutcome>) -> Self {
        let mut log = Self::default();
        for outcome in outcomes {
            if outcome.success {
                log.successful.push(outcome);
            } else {
                log.failed.push(outcome);
            }
        }
        log
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_indexes(&self) -> Vec<usize> {
        failed_indexes(&self.failed)
    }
}

/// Sorted, deduplicated record indexes from a failed-outcome collection;
/// valid input for retry addressing.
pub fn failed_indexes(outcomes: &[SubmissionOutcome]) -> Vec<usize> {
    let mut indexes: Vec<usize> = outcomes.iter().map(|o| o.record_index).collect();
    indexes.sort_unstable();
    indexes.dedup();
    indexes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{StructuredRecord, SubmitResponse};

    fn outcome(index: usize, status: u16) -> SubmissionOutcome {
        let response = SubmitResponse { status, body: None };
        let record = StructuredRecord::default();
        if (200..300).contains(&status) {
            SubmissionOutcome::delivered(index, format!("req-{index}"), &record, &response)
        } else {
            SubmissionOutcome::rejected(index, format!("req-{index}"), &record, &response)
        }
    }

    #[test]
    fn test_partitions_by_success() {
        let log = ResultLog::from_outcomes(vec![
            outcome(1, 200),
            outcome(2, 500),
            outcome(3, 201),
            outcome(4, 422),
        ]);

        assert_eq!(log.successful.len(), 2);
        assert_eq!(log.failed.len(), 2);
        assert!(!log.is_clean());
        assert!(log.failed.iter().all(|o| !o.success));
    }

    #[test]
    fn test_failed_indexes_are_sorted_and_unique() {
        let log = ResultLog::from_outcomes(vec![
            outcome(78, 500),
            outcome(23, 500),
            outcome(45, 500),
            outcome(23, 500),
            outcome(2, 200),
        ]);
        assert_eq!(log.failed_indexes(), vec![23, 45, 78]);
    }
}
