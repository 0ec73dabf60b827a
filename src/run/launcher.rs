//! Run launcher - submits a new run of an existing test

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::common::{Error, Result};
use crate::run::RunResult;
use crate::service::{ServiceError, TestRunService};

/// Starts runs on the remote service
///
/// There is no retry here: a failed submission ends the lifecycle.
pub struct RunLauncher<'a> {
    service: &'a dyn TestRunService,
}

impl<'a> RunLauncher<'a> {
    pub fn new(service: &'a dyn TestRunService) -> Self {
        Self { service }
    }

    /// Submit a run of `test_id` and return the service's initial snapshot
    ///
    /// Cancelling abandons the request; a run the service created anyway is
    /// not tracked.
    pub async fn launch(&self, test_id: u64, cancel: &CancellationToken) -> Result<RunResult> {
        if test_id == 0 {
            return Err(Error::InvalidIdentity { test_id, run_id: 0 });
        }

        let started = Instant::now();
        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(Error::launch_cancelled(test_id, started.elapsed()));
            }
            submitted = self.service.submit_run(test_id) => submitted,
        };
        let launched = submitted.map_err(|source| Error::Launch { test_id, source })?;

        if launched.identity().test_id() != test_id {
            return Err(Error::Launch {
                test_id,
                source: ServiceError::Malformed(format!(
                    "launched test {} but the service created run {}",
                    test_id,
                    launched.identity()
                )),
            });
        }

        tracing::info!(
            test_id,
            run_id = launched.identity().run_id(),
            status = %launched.status(),
            "Launched test run"
        );
        Ok(launched)
    }
}
