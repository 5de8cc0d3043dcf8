use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::utils::error::SubmitError;

/// One CSV data row: header path → raw cell text, in file column order.
/// `row` is 1-based over data rows (the header row is not counted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    row: usize,
    fields: Vec<(String, String)>,
}

impl RawRecord {
    pub fn new(row: usize, fields: Vec<(String, String)>) -> Self {
        Self { row, fields }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    /// Raw value for a header path. Absent columns return None; callers
    /// treat None and "" the same way (empty).
    pub fn get(&self, path: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == path)
            .map(|(_, value)| value.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// Nested JSON object derived from one RawRecord, ready for submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredRecord {
    pub fields: Map<String, Value>,
}

impl StructuredRecord {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Looks up a dot-notation path in the nested structure.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut current: Option<&Value> = None;
        for part in path.split('.') {
            current = match current {
                None => self.fields.get(part),
                Some(Value::Object(map)) => map.get(part),
                Some(_) => return None,
            };
            current?;
        }
        current
    }
}

/// Raw HTTP answer for one submission attempt. Any response is Ok at the
/// transport level; 2xx interpretation happens here.
#[derive(Debug, Clone)]
pub struct SubmitResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl SubmitResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Result of exactly one submission attempt. Retries create new outcomes
/// with fresh request ids; outcomes are never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub record_index: usize,
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub request_body: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl SubmissionOutcome {
    pub fn delivered(
        index: usize,
        request_id: String,
        record: &StructuredRecord,
        response: &SubmitResponse,
    ) -> Self {
        Self {
            record_index: index,
            request_id,
            status_code: Some(response.status),
            success: true,
            error: None,
            request_body: record.to_value(),
            response_body: response.body.clone(),
            timestamp: Utc::now(),
        }
    }

    /// The service answered with a non-2xx status.
    pub fn rejected(
        index: usize,
        request_id: String,
        record: &StructuredRecord,
        response: &SubmitResponse,
    ) -> Self {
        let detail = response
            .body
            .as_ref()
            .map(|body| truncate(&body.to_string(), 500))
            .unwrap_or_default();
        Self {
            record_index: index,
            request_id,
            status_code: Some(response.status),
            success: false,
            error: Some(format!("HTTP {}: {}", response.status, detail)),
            request_body: record.to_value(),
            response_body: response.body.clone(),
            timestamp: Utc::now(),
        }
    }

    /// The request never produced an HTTP response.
    pub fn failed(
        index: usize,
        request_id: String,
        record: &StructuredRecord,
        error: &SubmitError,
    ) -> Self {
        Self {
            record_index: index,
            request_id,
            status_code: None,
            success: false,
            error: Some(error.to_string()),
            request_body: record.to_value(),
            response_body: None,
            timestamp: Utc::now(),
        }
    }

    pub fn response_preview(&self, max_chars: usize) -> String {
        match &self.response_body {
            Some(body) => {
                let rendered =
                    serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string());
                truncate(&rendered, max_chars)
            }
            None => "<no body>".to_string(),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchDisposition {
    /// The operator declined the test-first confirmation; only the test
    /// outcome was recorded.
    Aborted,
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[SubmissionOutcome]) -> Self {
        let successful = outcomes.iter().filter(|o| o.success).count();
        Self {
            total: outcomes.len(),
            successful,
            failed: outcomes.len() - successful,
        }
    }

    pub fn success_rate(&self) -> f64 {
        percentage(self.successful, self.total)
    }

    pub fn failure_rate(&self) -> f64 {
        percentage(self.failed, self.total)
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Everything one submission run produced. Outcome order follows completion
/// order, not input order; each outcome carries its original record index.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub outcomes: Vec<SubmissionOutcome>,
    pub summary: BatchSummary,
    pub disposition: BatchDisposition,
    pub duration: Duration,
}

impl BatchResult {
    pub fn requests_per_minute(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.summary.total as f64 / secs * 60.0
        } else {
            0.0
        }
    }
}
