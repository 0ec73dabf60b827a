//! Run identity and immutable status snapshots

use std::fmt;

use serde::Serialize;

use super::RunStatus;
use crate::common::{Error, Result};

/// Identity of a run: the test definition it belongs to plus the run itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RunIdentity {
    test_id: u64,
    run_id: u64,
}

impl RunIdentity {
    /// Create an identity; both ids are assigned by the service and positive
    pub fn new(test_id: u64, run_id: u64) -> Result<Self> {
        if test_id == 0 || run_id == 0 {
            return Err(Error::InvalidIdentity { test_id, run_id });
        }
        Ok(Self { test_id, run_id })
    }

    pub fn test_id(&self) -> u64 {
        self.test_id
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }
}

impl fmt::Display for RunIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.test_id, self.run_id)
    }
}

/// One status sample of a run
///
/// Every sample is a fresh value; nothing in the crate mutates a result
/// after it has been built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunResult {
    identity: RunIdentity,
    status: RunStatus,
    success_rate: f64,
}

impl RunResult {
    /// Build a snapshot, rejecting success rates outside `[0, 1]`
    pub fn new(identity: RunIdentity, status: RunStatus, success_rate: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&success_rate) {
            return Err(Error::InvalidSuccessRate(success_rate));
        }
        Ok(Self {
            identity,
            status,
            success_rate,
        })
    }

    pub fn identity(&self) -> RunIdentity {
        self.identity
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Fraction of participants that passed; only meaningful for `Done` runs
    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run {} {}", self.identity, self.status)?;
        if self.status == RunStatus::Done {
            write!(f, " ({:.0}% success)", self.success_rate * 100.0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_requires_positive_ids() {
        assert!(RunIdentity::new(1, 1).is_ok());
        assert!(matches!(
            RunIdentity::new(0, 5),
            Err(Error::InvalidIdentity { test_id: 0, run_id: 5 })
        ));
        assert!(RunIdentity::new(5, 0).is_err());
    }

    #[test]
    fn test_success_rate_bounds() {
        let identity = RunIdentity::new(1, 2).unwrap();
        assert!(RunResult::new(identity, RunStatus::Done, 0.0).is_ok());
        assert!(RunResult::new(identity, RunStatus::Done, 1.0).is_ok());
        assert!(RunResult::new(identity, RunStatus::Done, 1.01).is_err());
        assert!(RunResult::new(identity, RunStatus::Done, -0.1).is_err());
        assert!(RunResult::new(identity, RunStatus::Done, f64::NAN).is_err());
    }

    #[test]
    fn test_display() {
        let identity = RunIdentity::new(7, 70).unwrap();
        let done = RunResult::new(identity, RunStatus::Done, 0.8).unwrap();
        assert_eq!(done.to_string(), "run 7/70 done (80% success)");

        let running = RunResult::new(identity, RunStatus::Running, 0.0).unwrap();
        assert_eq!(running.to_string(), "run 7/70 running");
    }
}
