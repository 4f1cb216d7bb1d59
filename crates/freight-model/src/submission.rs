//! Submission outcomes and the aggregated batch report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Final disposition of one record in a submission run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// The remote API confirmed the record with a 2xx response.
    Succeeded,
    /// The record was rejected permanently or exhausted its retries.
    Failed,
    /// The record was never dispatched (cancellation or budget expiry).
    Skipped,
}

/// Per-record result of the submission pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    /// Position of the record in the validated input batch.
    pub record_index: usize,
    pub status: RecordStatus,
    /// HTTP status of the final attempt, when one was made.
    pub http_status: Option<u16>,
    /// Remote error detail or transport error, truncated for display.
    pub error: Option<String>,
    /// Number of attempts made, including the final one.
    pub attempts: u32,
}

impl SubmissionOutcome {
    pub fn succeeded(record_index: usize, http_status: u16, attempts: u32) -> Self {
        Self {
            record_index,
            status: RecordStatus::Succeeded,
            http_status: Some(http_status),
            error: None,
            attempts,
        }
    }

    pub fn failed(
        record_index: usize,
        http_status: Option<u16>,
        error: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self {
            record_index,
            status: RecordStatus::Failed,
            http_status,
            error: Some(error.into()),
            attempts,
        }
    }

    pub fn skipped(record_index: usize) -> Self {
        Self {
            record_index,
            status: RecordStatus::Skipped,
            http_status: None,
            error: None,
            attempts: 0,
        }
    }
}

/// Aggregated result of one submission run.
///
/// Every input record appears in `outcomes` exactly once, ordered by
/// `record_index`, regardless of dispatch or completion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub outcomes: Vec<SubmissionOutcome>,
}

impl BatchReport {
    /// Builds a report from per-record outcomes, sorting by record index
    /// and recomputing the counters.
    pub fn from_outcomes(mut outcomes: Vec<SubmissionOutcome>) -> Self {
        outcomes.sort_by_key(|outcome| outcome.record_index);
        let mut report = Self {
            total: outcomes.len(),
            ..Self::default()
        };
        for outcome in &outcomes {
            match outcome.status {
                RecordStatus::Succeeded => report.succeeded += 1,
                RecordStatus::Failed => report.failed += 1,
                RecordStatus::Skipped => report.skipped += 1,
            }
        }
        report.outcomes = outcomes;
        report
    }

    /// Outcomes for records that failed, in record order.
    pub fn failed_records(&self) -> impl Iterator<Item = &SubmissionOutcome> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status == RecordStatus::Failed)
    }

    /// Record indices that failed, for a retry pass.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failed_records()
            .map(|outcome| outcome.record_index)
            .collect()
    }
}

/// Summary of one submission run, kept per brokerage for team visibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSummary {
    pub brokerage: String,
    pub configuration: String,
    /// Caller-supplied label for the uploaded file.
    pub file_label: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub uploaded_at: DateTime<Utc>,
}
