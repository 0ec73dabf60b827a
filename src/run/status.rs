//! Run status model
//!
//! Wire names follow the Loadero API (kebab-case). The service reports an
//! internal failure as `server-error`, which is the `Error` status here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Status of a test run as reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// Accepted, waiting for resources
    Pending,
    /// Participants are being provisioned
    Initializing,
    /// Participants are executing the test script
    Running,
    /// Execution finished, results are being collected
    WaitingResults,
    /// A stop was requested and is in progress
    Aborting,
    /// Finished; the success rate is meaningful
    Done,
    /// Finished unsuccessfully
    Failed,
    /// The service failed while executing the run
    #[serde(rename = "server-error", alias = "error")]
    Error,
    /// Stopped before completion
    Aborted,
    /// Cancelled before it started
    Cancelled,
}

impl RunStatus {
    /// Every status, non-terminal first
    pub const ALL: [RunStatus; 10] = [
        RunStatus::Pending,
        RunStatus::Initializing,
        RunStatus::Running,
        RunStatus::WaitingResults,
        RunStatus::Aborting,
        RunStatus::Done,
        RunStatus::Failed,
        RunStatus::Error,
        RunStatus::Aborted,
        RunStatus::Cancelled,
    ];

    /// True once the run can never change status again
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Done
                | RunStatus::Failed
                | RunStatus::Error
                | RunStatus::Aborted
                | RunStatus::Cancelled
        )
    }

    /// Wire name of the status
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Initializing => "initializing",
            RunStatus::Running => "running",
            RunStatus::WaitingResults => "waiting-results",
            RunStatus::Aborting => "aborting",
            RunStatus::Done => "done",
            RunStatus::Failed => "failed",
            RunStatus::Error => "server-error",
            RunStatus::Aborted => "aborted",
            RunStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "error" => Ok(RunStatus::Error),
            other => RunStatus::ALL
                .into_iter()
                .find(|status| status.as_str() == other)
                .ok_or_else(|| format!("unknown run status '{}'", s)),
        }
    }
}
