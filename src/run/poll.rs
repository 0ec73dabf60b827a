//! Poll loop - samples a run's status until it is terminal
//!
//! The loop samples immediately, then waits between samples according to
//! the configured [`Cadence`]. Waits are clamped to the deadline so the last
//! sample happens at the deadline, never after it. Every wait and every
//! in-flight sample is raced against a [`CancellationToken`].

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{RunIdentity, RunResult, RunStatus};
use crate::common::{Error, Result};
use crate::service::{ServiceError, TestRunService};

/// How the wait between samples evolves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Always wait `interval`
    Fixed,
    /// Multiply the wait by `factor` after each sample, up to `max_interval`
    Exponential { factor: u32, max_interval: Duration },
}

/// Bounded retry of transient sample failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failed samples tolerated over the whole poll session
    pub max_retries: u32,
    /// Wait before resampling after a failure
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::from_secs(5),
        }
    }
}

/// Deadline and cadence of a poll session
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    timeout: Duration,
    interval: Duration,
    cadence: Cadence,
    retry: RetryPolicy,
}

impl PollConfig {
    /// Fixed cadence with no retries. Both durations must be non-zero.
    pub fn new(timeout: Duration, interval: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(Error::InvalidPollConfig(
                "timeout must be greater than zero".to_string(),
            ));
        }
        if interval.is_zero() {
            return Err(Error::InvalidPollConfig(
                "interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            timeout,
            interval,
            cadence: Cadence::Fixed,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_cadence(mut self, cadence: Cadence) -> Result<Self> {
        if let Cadence::Exponential {
            factor,
            max_interval,
        } = cadence
        {
            if factor == 0 {
                return Err(Error::InvalidPollConfig(
                    "backoff factor must be at least 1".to_string(),
                ));
            }
            if max_interval < self.interval {
                return Err(Error::InvalidPollConfig(format!(
                    "max interval {:?} is shorter than interval {:?}",
                    max_interval, self.interval
                )));
            }
        }
        self.cadence = cadence;
        Ok(self)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Result<Self> {
        if retry.max_retries > 0 && retry.delay.is_zero() {
            return Err(Error::InvalidPollConfig(
                "retry delay must be greater than zero".to_string(),
            ));
        }
        self.retry = retry;
        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Wait to use after `current`, before clamping to the deadline
    fn next_wait(&self, current: Duration) -> Duration {
        match self.cadence {
            Cadence::Fixed => self.interval,
            Cadence::Exponential {
                factor,
                max_interval,
            } => current.saturating_mul(factor).min(max_interval),
        }
    }
}

/// Terminal sample plus statistics of the session that produced it
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub result: RunResult,
    /// Status requests issued, including failed ones
    pub samples: u32,
    /// Waits performed between samples
    pub sleeps: u32,
    /// Transient failures absorbed by the retry budget
    pub retries_used: u32,
    pub elapsed: Duration,
}

/// Mutable state of one poll session
struct Session {
    identity: RunIdentity,
    started: Instant,
    /// `None` when the timeout lies beyond what the clock can represent
    deadline: Option<Instant>,
    last: Option<RunResult>,
    samples: u32,
    sleeps: u32,
    retries_used: u32,
}

impl Session {
    fn last_status(&self) -> Option<RunStatus> {
        self.last.map(|result| result.status())
    }

    fn cancelled(&self) -> Error {
        Error::cancelled(
            self.identity,
            self.last_status(),
            self.started.elapsed(),
            self.retries_used,
        )
    }

    /// Time left before the deadline; unbounded without one
    fn remaining(&self, now: Instant) -> Duration {
        self.deadline
            .map_or(Duration::MAX, |deadline| deadline.saturating_duration_since(now))
    }

    fn failed(&self, source: ServiceError) -> Error {
        Error::poll_failed(
            self.identity,
            self.last_status(),
            self.started.elapsed(),
            self.retries_used,
            source,
        )
    }

    /// Sleep for `pause`, returning early with an error if cancelled
    async fn pause(&mut self, pause: Duration, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(self.cancelled()),
            _ = tokio::time::sleep(pause) => {}
        }
        self.sleeps += 1;
        Ok(())
    }
}

/// Samples a run until it reaches a terminal status
pub struct PollLoop<'a> {
    service: &'a dyn TestRunService,
    config: &'a PollConfig,
}

impl<'a> PollLoop<'a> {
    pub fn new(service: &'a dyn TestRunService, config: &'a PollConfig) -> Self {
        Self { service, config }
    }

    /// Poll `(test_id, run_id)` until terminal, timed out, failed or cancelled
    ///
    /// A terminal sample is returned as is; judging it is the evaluator's job.
    pub async fn poll(
        &self,
        test_id: u64,
        run_id: u64,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome> {
        let identity = RunIdentity::new(test_id, run_id)?;
        let started = Instant::now();
        let mut session = Session {
            identity,
            started,
            deadline: started.checked_add(self.config.timeout),
            last: None,
            samples: 0,
            sleeps: 0,
            retries_used: 0,
        };
        let mut wait = self.config.interval;

        tracing::debug!(
            run = %identity,
            timeout = ?self.config.timeout,
            interval = ?self.config.interval,
            "Polling run"
        );

        loop {
            let sample = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(session.cancelled()),
                sample = self.service.get_run_status(test_id, run_id) => sample,
            };
            session.samples += 1;

            let result = match sample.and_then(|result| check_identity(identity, result)) {
                Ok(result) => result,
                Err(e) => {
                    let remaining = session.remaining(Instant::now());
                    let retry = self.config.retry;
                    if !e.is_transient()
                        || session.retries_used >= retry.max_retries
                        || remaining.is_zero()
                    {
                        return Err(session.failed(e));
                    }

                    session.retries_used += 1;
                    tracing::warn!(
                        run = %identity,
                        error = %e,
                        retry = session.retries_used,
                        max_retries = retry.max_retries,
                        "Status sample failed, retrying"
                    );
                    session.pause(retry.delay.min(remaining), cancel).await?;
                    continue;
                }
            };

            tracing::debug!(
                run = %identity,
                status = %result.status(),
                sample = session.samples,
                "Sampled run"
            );
            if session.last_status() != Some(result.status()) {
                tracing::info!(run = %identity, status = %result.status(), "Run status changed");
            }

            if result.is_terminal() {
                return Ok(PollOutcome {
                    result,
                    samples: session.samples,
                    sleeps: session.sleeps,
                    retries_used: session.retries_used,
                    elapsed: started.elapsed(),
                });
            }
            session.last = Some(result);

            let now = Instant::now();
            let remaining = session.remaining(now);
            if remaining.is_zero() {
                return Err(Error::PollTimeout {
                    last: result,
                    elapsed: now - started,
                    timeout: self.config.timeout,
                    samples: session.samples,
                    retries_used: session.retries_used,
                });
            }

            session.pause(wait.min(remaining), cancel).await?;
            wait = self.config.next_wait(wait);
        }
    }
}

/// Reject samples that describe a different run
fn check_identity(
    expected: RunIdentity,
    result: RunResult,
) -> std::result::Result<RunResult, ServiceError> {
    if result.identity() != expected {
        return Err(ServiceError::Malformed(format!(
            "asked for run {} but the service answered for run {}",
            expected,
            result.identity()
        )));
    }
    Ok(result)
}
