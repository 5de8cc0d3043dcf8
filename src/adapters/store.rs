//! Timestamped JSON artifacts under one output directory: validated records,
//! success/failed outcome logs, and failed-artifact replay for retry runs.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use crate::core::outcome::ResultLog;
use crate::domain::model::{StructuredRecord, SubmissionOutcome};
use crate::utils::error::StoreError;

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    output_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Writes the converted records as `<stem>_<YYYYMMDD_HHMMSS>.json`.
    pub fn write_validated(
        &self,
        stem: &str,
        records: &[StructuredRecord],
    ) -> Result<PathBuf, StoreError> {
        self.write_json(&format!("{stem}_{}.json", timestamp()), records)
    }

    /// Writes `success_<ts>.json` and `failed_<ts>.json`; either side is
    /// skipped when empty. The failed artifact is valid retry input.
    pub fn write_outcomes(
        &self,
        log: &ResultLog,
    ) -> Result<(Option<PathBuf>, Option<PathBuf>), StoreError> {
        let ts = timestamp();
        let success = if log.successful.is_empty() {
            None
        } else {
            Some(self.write_json(&format!("success_{ts}.json"), &log.successful)?)
        };
        let failed = if log.failed.is_empty() {
            None
        } else {
            Some(self.write_json(&format!("failed_{ts}.json"), &log.failed)?)
        };
        Ok((success, failed))
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(data)?)?;
        Ok(path)
    }
}

/// Reads a `failed_*.json` artifact written by a previous run.
pub fn read_failed_artifact(path: &Path) -> Result<Vec<SubmissionOutcome>, StoreError> {
    let text = fs::read_to_string(path).map_err(|source| StoreError::Unreadable {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

fn timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::core::outcome::failed_indexes;
    use crate::domain::model::SubmitResponse;

    #[test]
    fn test_failed_artifact_round_trips_into_retry_input() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path());

        let record = StructuredRecord::default();
        let rejected = SubmissionOutcome::rejected(
            45,
            "req-45".to_string(),
            &record,
            &SubmitResponse {
                status: 500,
                body: None,
            },
        );
        let delivered = SubmissionOutcome::delivered(
            1,
            "req-1".to_string(),
            &record,
            &SubmitResponse {
                status: 200,
                body: None,
            },
        );

        let log = ResultLog::from_outcomes(vec![delivered, rejected]);
        let (success_path, failed_path) = store.write_outcomes(&log).unwrap();
        assert!(success_path.unwrap().exists());

        let failed_path = failed_path.unwrap();
        let replayed = read_failed_artifact(&failed_path).unwrap();
        assert_eq!(replayed.len(), 1);
        assert_eq!(failed_indexes(&replayed), vec![45]);
    }

    #[test]
    fn test_validated_records_written_with_timestamped_name() {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path());
        let path = store
            .write_validated("sample", &[StructuredRecord::default()])
            .unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("sample_"));
        assert!(name.ends_with(".json"));
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim(), "[\n  {}\n]");
    }
}
