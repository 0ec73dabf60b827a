//! Loadero CI gate - launch a remote test run and turn its outcome into an exit code
//!
//! The library drives one launch-poll-evaluate lifecycle per test against a
//! [`service::TestRunService`]. The `loadero-ci` binary wires it to the
//! Loadero REST API.

pub mod cli;
pub mod commands;
pub mod common;
pub mod run;
pub mod service;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use run::{
    evaluate, run_batch, run_lifecycle, LifecycleOptions, LifecycleReport, PollConfig,
    PollOutcome, RunIdentity, RunResult, RunStatus, Verdict,
};
pub use service::{ServiceError, TestRunService};
