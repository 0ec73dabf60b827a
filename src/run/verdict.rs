//! Verdict evaluation

use std::fmt;

use serde::Serialize;

use super::{RunResult, RunStatus};
use crate::common::{Error, Result};

/// Final judgment on a terminal run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn is_pass(self) -> bool {
        self == Verdict::Pass
    }

    /// Process exit code: 0 for pass, 1 for fail
    pub fn exit_code(self) -> i32 {
        match self {
            Verdict::Pass => 0,
            Verdict::Fail => 1,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => f.write_str("passed"),
            Verdict::Fail => f.write_str("failed"),
        }
    }
}

/// Judge a terminal run
///
/// Only a `Done` run with every participant successful passes; a partial
/// success rate fails. Calling this on a non-terminal run is a programming
/// error and is reported as `EvaluationContract`.
pub fn evaluate(result: &RunResult) -> Result<Verdict> {
    match result.status() {
        RunStatus::Done if result.success_rate() == 1.0 => Ok(Verdict::Pass),
        status if status.is_terminal() => Ok(Verdict::Fail),
        status => Err(Error::EvaluationContract {
            identity: result.identity(),
            status,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunIdentity;

    fn result(status: RunStatus, rate: f64) -> RunResult {
        RunResult::new(RunIdentity::new(1, 2).unwrap(), status, rate).unwrap()
    }

    #[test]
    fn test_full_success_passes() {
        assert_eq!(evaluate(&result(RunStatus::Done, 1.0)).unwrap(), Verdict::Pass);
    }

    #[test]
    fn test_partial_success_fails() {
        assert_eq!(evaluate(&result(RunStatus::Done, 0.99)).unwrap(), Verdict::Fail);
        assert_eq!(evaluate(&result(RunStatus::Done, 0.8)).unwrap(), Verdict::Fail);
        assert_eq!(evaluate(&result(RunStatus::Done, 0.0)).unwrap(), Verdict::Fail);
    }

    #[test]
    fn test_other_terminal_statuses_fail() {
        for status in [
            RunStatus::Failed,
            RunStatus::Error,
            RunStatus::Aborted,
            RunStatus::Cancelled,
        ] {
            assert_eq!(evaluate(&result(status, 0.0)).unwrap(), Verdict::Fail);
        }
        // A perfect rate does not rescue a non-done run
        assert_eq!(evaluate(&result(RunStatus::Failed, 1.0)).unwrap(), Verdict::Fail);
    }

    #[test]
    fn test_non_terminal_is_contract_violation() {
        for status in RunStatus::ALL.into_iter().filter(|s| !s.is_terminal()) {
            let err = evaluate(&result(status, 0.0)).unwrap_err();
            assert!(matches!(err, Error::EvaluationContract { .. }));
        }
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let done = result(RunStatus::Done, 0.5);
        assert_eq!(evaluate(&done).unwrap(), evaluate(&done).unwrap());

        let passed = result(RunStatus::Done, 1.0);
        assert_eq!(evaluate(&passed).unwrap(), evaluate(&passed).unwrap());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Verdict::Pass.exit_code(), 0);
        assert_eq!(Verdict::Fail.exit_code(), 1);
    }
}
