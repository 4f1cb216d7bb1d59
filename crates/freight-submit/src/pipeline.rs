//! Batch dispatch, retry, cancellation, and report aggregation.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Semaphore, mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use freight_model::{BatchReport, FieldMapping, RecordStatus, SubmissionOutcome, UploadRecord};

use crate::client::{LoadSubmitter, SubmitResponse, TransportError, snippet};
use crate::payload::build_payload;

/// Tuning for one submission run.
#[derive(Debug, Clone)]
pub struct SubmitOptions {
    /// Records per batch; a batch is the unit of dispatch and
    /// cancellation, sized to stay under the remote API's rate limits.
    pub batch_size: usize,
    /// Batches in flight at once.
    pub max_in_flight: usize,
    /// Attempts per record, the first included.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per subsequent attempt.
    pub base_backoff: Duration,
    /// Wall-clock budget for the whole run. Records not started when it
    /// expires are reported skipped.
    pub overall_budget: Option<Duration>,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            batch_size: 25,
            max_in_flight: 4,
            max_attempts: 4,
            base_backoff: Duration::from_millis(200),
            overall_budget: Some(Duration::from_secs(600)),
        }
    }
}

/// Cooperative cancellation flag.
///
/// Cancelling stops new batches from being issued; batches already in
/// flight run to completion. It is a signal observed between dispatches,
/// not an interrupt.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Live progress, published after every dispatch and batch completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubmitProgress {
    pub total_batches: usize,
    pub dispatched_batches: usize,
    pub completed_batches: usize,
    pub succeeded_records: usize,
    pub failed_records: usize,
}

/// Submits validated records and aggregates a batch report.
///
/// `records` pairs each record with its index in the validated input
/// batch; the report is ordered by that index whatever order batches
/// complete in. Every input record appears in the report exactly once.
pub async fn submit_records(
    submitter: &Arc<dyn LoadSubmitter>,
    mappings: &[FieldMapping],
    records: &[(usize, UploadRecord)],
    options: &SubmitOptions,
    cancel: &CancelToken,
    progress: Option<&watch::Sender<SubmitProgress>>,
) -> BatchReport {
    let deadline = options.overall_budget.map(|budget| Instant::now() + budget);
    let batch_size = options.batch_size.max(1);

    let payloads: Vec<(usize, Value)> = records
        .iter()
        .map(|(index, record)| (*index, build_payload(mappings, record)))
        .collect();
    let batches: Vec<Vec<(usize, Value)>> = payloads
        .chunks(batch_size)
        .map(<[(usize, Value)]>::to_vec)
        .collect();

    let mut state = SubmitProgress {
        total_batches: batches.len(),
        ..SubmitProgress::default()
    };
    publish(progress, state);
    info!(
        records = records.len(),
        batches = state.total_batches,
        "submission run starting"
    );

    let semaphore = Arc::new(Semaphore::new(options.max_in_flight.max(1)));
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<SubmissionOutcome>>();
    let mut outcomes: Vec<SubmissionOutcome> = Vec::with_capacity(records.len());
    let mut dispatched_indices: BTreeSet<usize> = BTreeSet::new();

    for batch in batches {
        if cancel.is_cancelled() || past(deadline) {
            outcomes.extend(batch.iter().map(|(index, _)| SubmissionOutcome::skipped(*index)));
            continue;
        }
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .expect("submission semaphore closed");
        // The wait for a slot may have outlived the run.
        if cancel.is_cancelled() || past(deadline) {
            drop(permit);
            outcomes.extend(batch.iter().map(|(index, _)| SubmissionOutcome::skipped(*index)));
            continue;
        }

        dispatched_indices.extend(batch.iter().map(|(index, _)| *index));
        state.dispatched_batches += 1;
        publish(progress, state);

        let tx = tx.clone();
        let submitter = Arc::clone(submitter);
        let max_attempts = options.max_attempts.max(1);
        let base_backoff = options.base_backoff;
        tokio::spawn(async move {
            let _permit = permit;
            let mut results = Vec::with_capacity(batch.len());
            for (index, payload) in &batch {
                if past(deadline) {
                    results.push(SubmissionOutcome::skipped(*index));
                    continue;
                }
                results.push(
                    submit_one(submitter.as_ref(), *index, payload, max_attempts, base_backoff)
                        .await,
                );
            }
            let _ = tx.send(results);
        });
    }
    drop(tx);

    while let Some(results) = rx.recv().await {
        state.completed_batches += 1;
        for outcome in &results {
            match outcome.status {
                RecordStatus::Succeeded => state.succeeded_records += 1,
                RecordStatus::Failed => state.failed_records += 1,
                RecordStatus::Skipped => {}
            }
        }
        publish(progress, state);
        outcomes.extend(results);
    }

    // A worker that died without reporting (panic) must not lose its
    // records from the accounting.
    let reported: BTreeSet<usize> = outcomes.iter().map(|o| o.record_index).collect();
    for index in dispatched_indices {
        if !reported.contains(&index) {
            warn!(record = index, "batch worker vanished; marking record failed");
            outcomes.push(SubmissionOutcome::failed(
                index,
                None,
                "submission worker failed before reporting",
                0,
            ));
        }
    }

    let report = BatchReport::from_outcomes(outcomes);
    info!(
        total = report.total,
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        "submission run finished"
    );
    report
}

/// Re-submits only the previously failed subset and folds the results
/// into the prior report. Succeeded and skipped records are never
/// re-sent; their prior outcomes carry over unchanged.
pub async fn retry_failed(
    submitter: &Arc<dyn LoadSubmitter>,
    mappings: &[FieldMapping],
    records: &[(usize, UploadRecord)],
    prior: &BatchReport,
    options: &SubmitOptions,
    cancel: &CancelToken,
    progress: Option<&watch::Sender<SubmitProgress>>,
) -> BatchReport {
    let failed: BTreeSet<usize> = prior.failed_indices().into_iter().collect();
    let subset: Vec<(usize, UploadRecord)> = records
        .iter()
        .filter(|(index, _)| failed.contains(index))
        .cloned()
        .collect();
    info!(retrying = subset.len(), "retrying failed subset");

    let rerun = submit_records(submitter, mappings, &subset, options, cancel, progress).await;

    let mut merged: Vec<SubmissionOutcome> = prior
        .outcomes
        .iter()
        .filter(|outcome| !failed.contains(&outcome.record_index))
        .cloned()
        .collect();
    merged.extend(rerun.outcomes);
    BatchReport::from_outcomes(merged)
}

/// One record: attempt, classify, back off, repeat up to the ceiling.
async fn submit_one(
    submitter: &dyn LoadSubmitter,
    index: usize,
    payload: &Value,
    max_attempts: u32,
    base_backoff: Duration,
) -> SubmissionOutcome {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let result = submitter.submit_load(payload).await;
        match classify(&result) {
            Disposition::Success(status) => {
                debug!(record = index, status, attempt, "record submitted");
                return SubmissionOutcome::succeeded(index, status, attempt);
            }
            Disposition::Permanent(status, detail) => {
                debug!(record = index, status, "record rejected permanently");
                return SubmissionOutcome::failed(index, Some(status), detail, attempt);
            }
            Disposition::Transient(status, detail) => {
                if attempt >= max_attempts {
                    warn!(record = index, attempts = attempt, "retries exhausted");
                    return SubmissionOutcome::failed(index, status, detail, attempt);
                }
                let delay = base_backoff * 2u32.saturating_pow(attempt - 1);
                debug!(
                    record = index,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "transient failure; backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

enum Disposition {
    Success(u16),
    Transient(Option<u16>, String),
    Permanent(u16, String),
}

/// 2xx is success; timeouts, connection failures, 408, 429, and 5xx are
/// transient; every other status is a permanent rejection.
fn classify(result: &Result<SubmitResponse, TransportError>) -> Disposition {
    match result {
        Ok(response) if (200..300).contains(&response.status) => {
            Disposition::Success(response.status)
        }
        Ok(response)
            if response.status == 408 || response.status == 429 || response.status >= 500 =>
        {
            Disposition::Transient(Some(response.status), snippet(&response.body_snippet))
        }
        Ok(response) => Disposition::Permanent(response.status, snippet(&response.body_snippet)),
        Err(transport) => Disposition::Transient(None, transport.message.clone()),
    }
}

fn past(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

fn publish(progress: Option<&watch::Sender<SubmitProgress>>, state: SubmitProgress) {
    if let Some(sender) = progress {
        sender.send_replace(state);
    }
}
