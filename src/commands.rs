//! CLI command definitions
//!
//! Defines the clap commands for the CI gate.

use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Connection options shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Configuration file (default: platform config dir)
    #[arg(long, global = true, env = "LOADERO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Project access token
    #[arg(long, global = true, env = "LOADERO_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Project owning the tests
    #[arg(long, global = true, env = "LOADERO_PROJECT_ID")]
    pub project_id: Option<u64>,

    /// API base URL
    #[arg(long, global = true, env = "LOADERO_API_BASE")]
    pub base_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch test runs, wait for them and exit with the verdict
    Run {
        /// Test to run; repeat or comma-separate to run several in parallel
        #[arg(long = "test-id", env = "LOADERO_TEST_ID", value_delimiter = ',', required = true)]
        test_ids: Vec<u64>,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Seconds between status checks
        #[arg(long)]
        interval: Option<u64>,

        /// Double the wait between checks, up to --max-interval
        #[arg(long)]
        backoff: bool,

        /// Upper bound in seconds for the wait when --backoff is set
        #[arg(long)]
        max_interval: Option<u64>,

        /// Transient status check failures to tolerate
        #[arg(long)]
        max_retries: Option<u32>,

        /// Do not re-read the run after it finishes
        #[arg(long)]
        no_confirm: bool,

        /// Stop the remote run if the timeout expires or the gate is interrupted
        #[arg(long)]
        stop_on_timeout: bool,

        /// Output results as JSON
        #[arg(long)]
        json: bool,

        /// Also write a JUnit XML report to this file
        #[arg(long, value_name = "PATH", env = "LOADERO_JUNIT_REPORT")]
        junit: Option<PathBuf>,
    },

    /// Show the status of an existing run
    Status {
        #[arg(long)]
        test_id: u64,

        #[arg(long)]
        run_id: u64,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stop an executing run
    Stop {
        #[arg(long)]
        test_id: u64,

        #[arg(long)]
        run_id: u64,
    },

    /// Print the effective configuration (token masked)
    Config,
}
