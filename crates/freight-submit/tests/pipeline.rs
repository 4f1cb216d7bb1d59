use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use freight_model::{FieldMapping, RecordStatus, UploadRecord};
use freight_submit::{
    CancelToken, LoadSubmitter, SubmitOptions, SubmitProgress, SubmitResponse, TransportError,
    retry_failed, submit_records,
};

/// Scripted submitter: per-reference status sequences, then a default.
/// Optionally flips a cancel token after the n-th delivered call.
struct ScriptedSubmitter {
    scripts: Mutex<BTreeMap<String, Vec<u16>>>,
    calls: Mutex<Vec<String>>,
    default_status: u16,
    cancel_after: Mutex<Option<(usize, CancelToken)>>,
}

impl ScriptedSubmitter {
    fn new(default_status: u16) -> Self {
        Self {
            scripts: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            default_status,
            cancel_after: Mutex::new(None),
        }
    }

    fn script(&self, reference: &str, statuses: &[u16]) {
        self.scripts
            .lock()
            .expect("scripts lock")
            .insert(reference.to_string(), statuses.to_vec());
    }

    fn cancel_after(&self, calls: usize, token: CancelToken) {
        *self.cancel_after.lock().expect("cancel lock") = Some((calls, token));
    }

    fn calls_for(&self, reference: &str) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|r| r.as_str() == reference)
            .count()
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }
}

#[async_trait]
impl LoadSubmitter for ScriptedSubmitter {
    async fn submit_load(&self, payload: &Value) -> Result<SubmitResponse, TransportError> {
        let reference = payload["load"]["brokerageLoadId"]
            .as_str()
            .unwrap_or("?")
            .to_string();
        let call_count = {
            let mut calls = self.calls.lock().expect("calls lock");
            calls.push(reference.clone());
            calls.len()
        };
        if let Some((threshold, token)) = &*self.cancel_after.lock().expect("cancel lock")
            && call_count >= *threshold
        {
            token.cancel();
        }
        let status = {
            let mut scripts = self.scripts.lock().expect("scripts lock");
            match scripts.get_mut(&reference) {
                Some(queue) if !queue.is_empty() => queue.remove(0),
                _ => self.default_status,
            }
        };
        Ok(SubmitResponse {
            status,
            body_snippet: format!("status {status}"),
        })
    }
}

fn mappings() -> Vec<FieldMapping> {
    vec![FieldMapping {
        source_column: "load_id".to_string(),
        target_path: "load.brokerageLoadId".to_string(),
        required: true,
    }]
}

fn records(count: usize) -> Vec<(usize, UploadRecord)> {
    (0..count)
        .map(|i| {
            let mut values = BTreeMap::new();
            values.insert("load_id".to_string(), format!("L{}", i + 1));
            (i, UploadRecord::new(values))
        })
        .collect()
}

fn fast_options() -> SubmitOptions {
    SubmitOptions {
        batch_size: 3,
        max_in_flight: 2,
        max_attempts: 4,
        base_backoff: std::time::Duration::from_millis(1),
        overall_budget: None,
    }
}

fn submitter_arc(scripted: ScriptedSubmitter) -> (Arc<ScriptedSubmitter>, Arc<dyn LoadSubmitter>) {
    let concrete = Arc::new(scripted);
    let dynamic: Arc<dyn LoadSubmitter> = Arc::clone(&concrete) as Arc<dyn LoadSubmitter>;
    (concrete, dynamic)
}

#[tokio::test]
async fn clean_run_succeeds_in_input_order() {
    let (fake, submitter) = submitter_arc(ScriptedSubmitter::new(201));
    let report = submit_records(
        &submitter,
        &mappings(),
        &records(10),
        &fast_options(),
        &CancelToken::new(),
        None,
    )
    .await;

    assert_eq!(report.total, 10);
    assert_eq!(report.succeeded, 10);
    assert_eq!(report.failed, 0);
    assert_eq!(report.skipped, 0);
    let indices: Vec<usize> = report.outcomes.iter().map(|o| o.record_index).collect();
    assert_eq!(indices, (0..10).collect::<Vec<_>>());
    assert!(report.outcomes.iter().all(|o| o.attempts == 1));
    assert_eq!(fake.total_calls(), 10);
}

#[tokio::test]
async fn transient_503s_retry_until_success() {
    let fake = ScriptedSubmitter::new(201);
    // Record #7 fails three times with 503, then succeeds.
    fake.script("L7", &[503, 503, 503]);
    let (fake, submitter) = submitter_arc(fake);

    let report = submit_records(
        &submitter,
        &mappings(),
        &records(10),
        &fast_options(),
        &CancelToken::new(),
        None,
    )
    .await;

    assert_eq!(report.succeeded, 10);
    assert_eq!(report.failed, 0);
    let record_seven = &report.outcomes[6];
    assert_eq!(record_seven.status, RecordStatus::Succeeded);
    assert_eq!(record_seven.attempts, 4);
    assert_eq!(fake.calls_for("L7"), 4);
    assert!(report.outcomes.iter().filter(|o| o.record_index != 6).all(|o| o.attempts == 1));
}

#[tokio::test]
async fn permanent_rejection_is_not_retried() {
    let fake = ScriptedSubmitter::new(201);
    fake.script("L3", &[422]);
    let (fake, submitter) = submitter_arc(fake);

    let report = submit_records(
        &submitter,
        &mappings(),
        &records(5),
        &fast_options(),
        &CancelToken::new(),
        None,
    )
    .await;

    assert_eq!(report.succeeded, 4);
    assert_eq!(report.failed, 1);
    let rejected = &report.outcomes[2];
    assert_eq!(rejected.status, RecordStatus::Failed);
    assert_eq!(rejected.http_status, Some(422));
    assert_eq!(rejected.attempts, 1);
    assert_eq!(fake.calls_for("L3"), 1);
}

#[tokio::test]
async fn exhausted_retries_fail_with_the_attempt_count() {
    let fake = ScriptedSubmitter::new(201);
    fake.script("L1", &[500, 500, 500, 500, 500]);
    let (fake, submitter) = submitter_arc(fake);

    let report = submit_records(
        &submitter,
        &mappings(),
        &records(1),
        &fast_options(),
        &CancelToken::new(),
        None,
    )
    .await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.outcomes[0].attempts, 4);
    assert_eq!(report.outcomes[0].http_status, Some(500));
    assert_eq!(fake.calls_for("L1"), 4);
}

#[tokio::test]
async fn every_cancellation_point_accounts_for_all_records() {
    for cancel_at in 0..=10usize {
        let fake = ScriptedSubmitter::new(201);
        let cancel = CancelToken::new();
        if cancel_at == 0 {
            cancel.cancel();
        } else {
            fake.cancel_after(cancel_at, cancel.clone());
        }
        let (_, submitter) = submitter_arc(fake);

        let options = SubmitOptions {
            batch_size: 1,
            max_in_flight: 1,
            ..fast_options()
        };
        let report = submit_records(
            &submitter,
            &mappings(),
            &records(10),
            &options,
            &cancel,
            None,
        )
        .await;

        assert_eq!(
            report.succeeded + report.failed + report.skipped,
            10,
            "cancellation after {cancel_at} calls lost records"
        );
        assert_eq!(report.total, 10);
        assert_eq!(report.outcomes.len(), 10);
        assert_eq!(report.succeeded, cancel_at, "cancel point {cancel_at}");
        assert_eq!(report.skipped, 10 - cancel_at);
    }
}

#[tokio::test]
async fn exhausted_budget_skips_unstarted_records() {
    let (fake, submitter) = submitter_arc(ScriptedSubmitter::new(201));
    let options = SubmitOptions {
        overall_budget: Some(std::time::Duration::ZERO),
        ..fast_options()
    };
    let report = submit_records(
        &submitter,
        &mappings(),
        &records(6),
        &options,
        &CancelToken::new(),
        None,
    )
    .await;

    assert_eq!(report.skipped, 6);
    assert_eq!(report.succeeded + report.failed, 0);
    assert_eq!(fake.total_calls(), 0);
}

#[tokio::test]
async fn retry_pass_touches_only_the_failed_subset() {
    let fake = ScriptedSubmitter::new(201);
    fake.script("L2", &[422]);
    fake.script("L5", &[400]);
    let (fake, submitter) = submitter_arc(fake);

    let all_records = records(6);
    let first = submit_records(
        &submitter,
        &mappings(),
        &all_records,
        &fast_options(),
        &CancelToken::new(),
        None,
    )
    .await;
    assert_eq!(first.failed, 2);
    assert_eq!(first.succeeded, 4);
    let calls_before_retry = fake.total_calls();

    // The remote accepts the records this time around.
    let second = retry_failed(
        &submitter,
        &mappings(),
        &all_records,
        &first,
        &fast_options(),
        &CancelToken::new(),
        None,
    )
    .await;

    assert_eq!(second.total, 6);
    assert_eq!(second.succeeded, 6);
    assert_eq!(second.failed, 0);
    // Only the two failed records were re-sent.
    assert_eq!(fake.total_calls() - calls_before_retry, 2);
    assert_eq!(fake.calls_for("L2"), 2);
    assert_eq!(fake.calls_for("L1"), 1);
}

#[tokio::test]
async fn progress_reaches_the_final_counts() {
    let (_, submitter) = submitter_arc(ScriptedSubmitter::new(201));
    let (tx, rx) = watch::channel(SubmitProgress::default());

    let report = submit_records(
        &submitter,
        &mappings(),
        &records(10),
        &fast_options(),
        &CancelToken::new(),
        Some(&tx),
    )
    .await;
    assert_eq!(report.succeeded, 10);

    let final_progress = *rx.borrow();
    assert_eq!(final_progress.total_batches, 4);
    assert_eq!(final_progress.dispatched_batches, 4);
    assert_eq!(final_progress.completed_batches, 4);
    assert_eq!(final_progress.succeeded_records, 10);
    assert_eq!(final_progress.failed_records, 0);
}
