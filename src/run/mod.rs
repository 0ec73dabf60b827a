//! Run lifecycle: launch a test run, poll it to completion, judge the result

mod launcher;
mod lifecycle;
mod poll;
mod result;
mod status;
mod verdict;

pub use launcher::RunLauncher;
pub use lifecycle::{
    run_batch, run_lifecycle, BatchEntry, BatchSummary, LifecycleOptions, LifecycleReport,
};
pub use poll::{Cadence, PollConfig, PollLoop, PollOutcome, RetryPolicy};
pub use result::{RunIdentity, RunResult};
pub use status::RunStatus;
pub use verdict::{evaluate, Verdict};
