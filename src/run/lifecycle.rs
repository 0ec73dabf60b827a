//! Launch, poll and evaluate one run; or several runs side by side

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{evaluate, PollConfig, PollLoop, PollOutcome, RunLauncher, RunResult, Verdict};
use crate::common::{Error, Result};
use crate::service::TestRunService;

/// Options for one lifecycle
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    pub poll: PollConfig,
    /// Read the run again after polling and check it is still terminal
    pub confirm_final: bool,
    /// Stop the remote run when polling times out or is cancelled
    pub stop_on_abort: bool,
}

impl LifecycleOptions {
    pub fn new(poll: PollConfig) -> Self {
        Self {
            poll,
            confirm_final: true,
            stop_on_abort: false,
        }
    }
}

/// Everything observed during a completed lifecycle
#[derive(Debug, Clone)]
pub struct LifecycleReport {
    /// Snapshot returned when the run was submitted
    pub launched: RunResult,
    pub outcome: PollOutcome,
    /// Result the verdict was derived from
    pub final_result: RunResult,
    pub verdict: Verdict,
}

/// Launch a run of `test_id`, wait for it to finish and judge it
pub async fn run_lifecycle(
    service: &dyn TestRunService,
    test_id: u64,
    options: &LifecycleOptions,
    cancel: &CancellationToken,
) -> Result<LifecycleReport> {
    let launched = RunLauncher::new(service).launch(test_id, cancel).await?;
    let identity = launched.identity();

    let outcome = match PollLoop::new(service, &options.poll)
        .poll(identity.test_id(), identity.run_id(), cancel)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) if e.is_abort() && options.stop_on_abort => {
            stop_quietly(service, launched).await;
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    let final_result = if options.confirm_final {
        confirm(service, &outcome, cancel).await?
    } else {
        outcome.result
    };

    let verdict = evaluate(&final_result)?;
    tracing::info!(
        run = %identity,
        status = %final_result.status(),
        success_rate = final_result.success_rate(),
        elapsed = ?outcome.elapsed,
        "Test {}",
        verdict
    );

    Ok(LifecycleReport {
        launched,
        outcome,
        final_result,
        verdict,
    })
}

/// Re-read a run that polling reported as terminal
async fn confirm(
    service: &dyn TestRunService,
    outcome: &PollOutcome,
    cancel: &CancellationToken,
) -> Result<RunResult> {
    let polled = outcome.result;
    let identity = polled.identity();

    let reread = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            return Err(Error::cancelled(
                identity,
                Some(polled.status()),
                outcome.elapsed,
                outcome.retries_used,
            ));
        }
        reread = service.get_run_status(identity.test_id(), identity.run_id()) => reread,
    };
    let reread = reread.map_err(|source| {
        Error::poll_failed(
            identity,
            Some(polled.status()),
            outcome.elapsed,
            outcome.retries_used,
            source,
        )
    })?;

    if reread.identity() != identity {
        return Err(Error::poll_failed(
            identity,
            Some(polled.status()),
            outcome.elapsed,
            outcome.retries_used,
            crate::service::ServiceError::Malformed(format!(
                "asked for run {} but the service answered for run {}",
                identity,
                reread.identity()
            )),
        ));
    }

    if !reread.is_terminal() {
        return Err(Error::StatusRelapse {
            identity,
            from: polled.status(),
            to: reread.status(),
        });
    }

    if reread.status() != polled.status() {
        tracing::warn!(
            run = %identity,
            polled = %polled.status(),
            reread = %reread.status(),
            "Terminal status changed after polling; using the latest"
        );
    }
    Ok(reread)
}

/// Best-effort stop of a run we are giving up on
async fn stop_quietly(service: &dyn TestRunService, launched: RunResult) {
    let identity = launched.identity();
    match service.stop_run(identity.test_id(), identity.run_id()).await {
        Ok(()) => tracing::info!(run = %identity, "Stopped remote run"),
        Err(e) => tracing::warn!(run = %identity, error = %e, "Could not stop remote run"),
    }
}

/// Outcome of one test in a batch
#[derive(Debug)]
pub struct BatchEntry {
    pub test_id: u64,
    pub outcome: Result<LifecycleReport>,
}

impl BatchEntry {
    /// Exit code this entry alone would produce
    pub fn exit_code(&self) -> i32 {
        match &self.outcome {
            Ok(report) => report.verdict.exit_code(),
            Err(e) => e.exit_code(),
        }
    }
}

/// Outcomes of a batch, in the order the tests were given
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub entries: Vec<BatchEntry>,
}

impl BatchSummary {
    pub fn passed(&self) -> usize {
        self.count(|entry| matches!(&entry.outcome, Ok(r) if r.verdict.is_pass()))
    }

    pub fn failed(&self) -> usize {
        self.count(|entry| matches!(&entry.outcome, Ok(r) if !r.verdict.is_pass()))
    }

    /// Timed out or cancelled before reaching a terminal status
    pub fn aborted(&self) -> usize {
        self.count(|entry| matches!(&entry.outcome, Err(e) if e.is_abort()))
    }

    /// Failed to launch, poll or evaluate
    pub fn errored(&self) -> usize {
        self.count(|entry| matches!(&entry.outcome, Err(e) if !e.is_abort()))
    }

    /// 0 when every test passed, otherwise the code of the first test that did not
    pub fn exit_code(&self) -> i32 {
        self.entries
            .iter()
            .map(BatchEntry::exit_code)
            .find(|code| *code != 0)
            .unwrap_or(0)
    }

    fn count(&self, predicate: impl Fn(&BatchEntry) -> bool) -> usize {
        self.entries.iter().filter(|entry| predicate(entry)).count()
    }
}

/// Run one independent lifecycle per test concurrently
///
/// Each lifecycle gets its own task and loop state; they share only the
/// service handle and a child of `cancel`.
pub async fn run_batch(
    service: Arc<dyn TestRunService>,
    test_ids: &[u64],
    options: &LifecycleOptions,
    cancel: &CancellationToken,
) -> BatchSummary {
    let handles: Vec<_> = test_ids
        .iter()
        .map(|&test_id| {
            let service = Arc::clone(&service);
            let options = options.clone();
            let cancel = cancel.child_token();
            let handle = tokio::spawn(async move {
                run_lifecycle(service.as_ref(), test_id, &options, &cancel).await
            });
            (test_id, handle)
        })
        .collect();

    let mut summary = BatchSummary::default();
    for (test_id, handle) in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => Err(Error::Internal(format!(
                "lifecycle task for test {} failed: {}",
                test_id, e
            ))),
        };
        summary.entries.push(BatchEntry { test_id, outcome });
    }

    tracing::info!(
        total = summary.entries.len(),
        passed = summary.passed(),
        failed = summary.failed(),
        aborted = summary.aborted(),
        errored = summary.errored(),
        "Batch finished"
    );
    summary
}
