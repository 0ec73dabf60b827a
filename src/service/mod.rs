//! Remote test run service
//!
//! The lifecycle only talks to the service through [`TestRunService`].
//! [`LoaderoClient`] implements it over the Loadero REST API and
//! [`mock::ScriptedService`] replays a fixed script for tests.

mod http;
pub mod mock;
mod wire;

use async_trait::async_trait;
use thiserror::Error;

use crate::run::RunResult;

pub use self::http::LoaderoClient;

/// Result type for service calls
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Failure of a single service call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out")]
    Timeout,

    #[error("service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("access token rejected (HTTP {0})")]
    Unauthorized(u16),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ServiceError {
    /// True for failures that may go away on their own
    ///
    /// Only these are eligible for the poll loop's retry budget.
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::Request(_) | ServiceError::Timeout => true,
            ServiceError::Http { status, .. } => *status == 429 || *status >= 500,
            ServiceError::NotFound(_)
            | ServiceError::Unauthorized(_)
            | ServiceError::Malformed(_) => false,
        }
    }
}

/// Operations the lifecycle needs from the remote service
#[async_trait]
pub trait TestRunService: Send + Sync {
    /// Start a new run of an existing test. Returns the initial snapshot.
    async fn submit_run(&self, test_id: u64) -> ServiceResult<RunResult>;

    /// Read the current status of a run.
    async fn get_run_status(&self, test_id: u64, run_id: u64) -> ServiceResult<RunResult>;

    /// Ask the service to stop a run that is still executing.
    async fn stop_run(&self, test_id: u64, run_id: u64) -> ServiceResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ServiceError::Request("reset".to_string()).is_transient());
        assert!(ServiceError::Timeout.is_transient());
        assert!(ServiceError::Http {
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(ServiceError::Http {
            status: 429,
            body: String::new()
        }
        .is_transient());

        assert!(!ServiceError::Http {
            status: 400,
            body: String::new()
        }
        .is_transient());
        assert!(!ServiceError::NotFound("run 1".to_string()).is_transient());
        assert!(!ServiceError::Unauthorized(401).is_transient());
        assert!(!ServiceError::Malformed("bad json".to_string()).is_transient());
    }
}
