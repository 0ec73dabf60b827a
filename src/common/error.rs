//! Error types for the CI gate
//!
//! Every lifecycle failure carries the test id, run id, last observed status
//! and elapsed time so a CI log is enough to diagnose it without querying the
//! service again.

use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::run::{RunIdentity, RunResult, RunStatus};
use crate::service::ServiceError;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the CI gate
#[derive(Error, Debug)]
pub enum Error {
    // === Lifecycle Errors ===
    #[error("Could not launch test {test_id}: {source}")]
    Launch {
        test_id: u64,
        #[source]
        source: ServiceError,
    },

    #[error(
        "Polling run {run_id} of test {test_id} failed after {elapsed:?} \
         (last status: {}, retries used: {retries_used}): {source}",
        describe_status(.last_status)
    )]
    Poll {
        test_id: u64,
        run_id: u64,
        last_status: Option<RunStatus>,
        elapsed: Duration,
        retries_used: u32,
        #[source]
        source: ServiceError,
    },

    #[error(
        "Run {} of test {} is still {} after {elapsed:?} \
         (timeout {timeout:?}, {samples} samples, retries used: {retries_used})",
        .last.identity().run_id(),
        .last.identity().test_id(),
        .last.status()
    )]
    PollTimeout {
        last: RunResult,
        elapsed: Duration,
        timeout: Duration,
        samples: u32,
        retries_used: u32,
    },

    #[error(
        "Waiting for test {test_id} was cancelled after {elapsed:?} \
         (run: {}, last status: {}, retries used: {retries_used})",
        describe_run(.run_id),
        describe_status(.last_status)
    )]
    Cancelled {
        test_id: u64,
        /// `None` when cancelled before the run was created
        run_id: Option<u64>,
        last_status: Option<RunStatus>,
        elapsed: Duration,
        retries_used: u32,
    },

    #[error("Run {identity} went back from terminal status {from} to {to}")]
    StatusRelapse {
        identity: RunIdentity,
        from: RunStatus,
        to: RunStatus,
    },

    #[error("Cannot evaluate run {identity}: status {status} is not terminal")]
    EvaluationContract {
        identity: RunIdentity,
        status: RunStatus,
    },

    // === Validation Errors ===
    #[error("Invalid run identity: test id {test_id}, run id {run_id} (ids must be positive)")]
    InvalidIdentity { test_id: u64, run_id: u64 },

    #[error("Invalid success rate {0}: expected a value between 0 and 1")]
    InvalidSuccessRate(f64),

    #[error("Invalid poll configuration: {0}")]
    InvalidPollConfig(String),

    // === Service Errors ===
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a poll error for a failed status sample
    pub fn poll_failed(
        identity: RunIdentity,
        last_status: Option<RunStatus>,
        elapsed: Duration,
        retries_used: u32,
        source: ServiceError,
    ) -> Self {
        Self::Poll {
            test_id: identity.test_id(),
            run_id: identity.run_id(),
            last_status,
            elapsed,
            retries_used,
            source,
        }
    }

    /// Create a cancellation error for an abandoned poll session
    pub fn cancelled(
        identity: RunIdentity,
        last_status: Option<RunStatus>,
        elapsed: Duration,
        retries_used: u32,
    ) -> Self {
        Self::Cancelled {
            test_id: identity.test_id(),
            run_id: Some(identity.run_id()),
            last_status,
            elapsed,
            retries_used,
        }
    }

    /// Create a cancellation error for a launch that never returned
    pub fn launch_cancelled(test_id: u64, elapsed: Duration) -> Self {
        Self::Cancelled {
            test_id,
            run_id: None,
            last_status: None,
            elapsed,
            retries_used: 0,
        }
    }

    /// Transient sample failures absorbed before the error, when known
    pub fn retries_used(&self) -> Option<u32> {
        match self {
            Error::Poll { retries_used, .. }
            | Error::PollTimeout { retries_used, .. }
            | Error::Cancelled { retries_used, .. } => Some(*retries_used),
            _ => None,
        }
    }

    /// True when polling ended without the run reaching a terminal status
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::PollTimeout { .. } | Error::Cancelled { .. })
    }

    /// Process exit code for this failure
    ///
    /// `0` is reserved for a passing verdict and `1` for a failing one.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::PollTimeout { .. } => 2,
            Error::Poll { .. } | Error::Service(_) => 3,
            Error::Launch { .. } => 4,
            Error::InvalidIdentity { .. }
            | Error::InvalidSuccessRate(_)
            | Error::InvalidPollConfig(_)
            | Error::Config(_)
            | Error::ConfigParse(_)
            | Error::FileRead { .. } => 5,
            Error::StatusRelapse { .. } | Error::EvaluationContract { .. } => 6,
            Error::Cancelled { .. } => 130,
            Error::Io(_) | Error::Json(_) | Error::Internal(_) => 70,
        }
    }
}

fn describe_run(run_id: &Option<u64>) -> String {
    match run_id {
        Some(run_id) => run_id.to_string(),
        None => "not created".to_string(),
    }
}

fn describe_status(status: &Option<RunStatus>) -> String {
    match status {
        Some(status) => status.to_string(),
        None => "none observed".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_from_verdicts() {
        let identity = RunIdentity::new(1, 2).unwrap();
        let errors = [
            Error::Launch {
                test_id: 1,
                source: ServiceError::NotFound("test 1".to_string()),
            },
            Error::poll_failed(identity, None, Duration::ZERO, 0, ServiceError::Timeout),
            Error::cancelled(identity, Some(RunStatus::Running), Duration::from_secs(1), 0),
            Error::launch_cancelled(1, Duration::ZERO),
            Error::Config("missing token".to_string()),
        ];

        for error in &errors {
            assert!(error.exit_code() > 1, "{error} must not look like a verdict");
        }
    }

    #[test]
    fn test_poll_error_message_has_context() {
        let identity = RunIdentity::new(12, 345).unwrap();
        let err = Error::poll_failed(
            identity,
            Some(RunStatus::Running),
            Duration::from_millis(1500),
            2,
            ServiceError::Request("connection reset".to_string()),
        );

        let message = err.to_string();
        assert!(message.contains("run 345 of test 12"));
        assert!(message.contains("running"));
        assert!(message.contains("retries used: 2"));
        assert!(message.contains("connection reset"));
    }

    #[test]
    fn test_cancelled_without_sample() {
        let identity = RunIdentity::new(1, 2).unwrap();
        let err = Error::cancelled(identity, None, Duration::ZERO, 0);
        assert!(err.to_string().contains("none observed"));
        assert!(err.is_abort());
        assert_eq!(err.exit_code(), 130);
    }

    #[test]
    fn test_abort_errors_report_retries() {
        let identity = RunIdentity::new(3, 30).unwrap();
        let last = RunResult::new(identity, RunStatus::Running, 0.0).unwrap();
        let timeout = Error::PollTimeout {
            last,
            elapsed: Duration::from_secs(10),
            timeout: Duration::from_secs(10),
            samples: 6,
            retries_used: 2,
        };
        assert!(timeout.to_string().contains("retries used: 2"));
        assert_eq!(timeout.retries_used(), Some(2));

        let cancelled = Error::cancelled(identity, Some(RunStatus::Running), Duration::ZERO, 4);
        assert!(cancelled.to_string().contains("retries used: 4"));
        assert_eq!(cancelled.retries_used(), Some(4));
    }

    #[test]
    fn test_launch_cancelled_has_no_run() {
        let err = Error::launch_cancelled(8, Duration::from_millis(20));
        assert!(err.to_string().contains("run: not created"));
        assert!(err.is_abort());
        assert_eq!(err.retries_used(), Some(0));
    }
}
