//! Scripted in-memory service
//!
//! Each scripted test yields a fixed sequence of status samples. Once the
//! script is exhausted the last step repeats, so a script ending in
//! `Running` keeps the run running forever.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{ServiceError, ServiceResult, TestRunService};
use crate::run::{RunIdentity, RunResult, RunStatus};

/// One scripted answer to a status request
#[derive(Debug, Clone)]
pub enum Step {
    Status { status: RunStatus, success_rate: f64 },
    Error(ServiceError),
}

impl Step {
    pub fn status(status: RunStatus) -> Self {
        Step::Status {
            status,
            success_rate: 0.0,
        }
    }

    pub fn done(success_rate: f64) -> Self {
        Step::Status {
            status: RunStatus::Done,
            success_rate,
        }
    }

    pub fn error(error: ServiceError) -> Self {
        Step::Error(error)
    }
}

#[derive(Debug)]
struct Script {
    run_id: u64,
    launch_error: Option<ServiceError>,
    steps: VecDeque<Step>,
    last: Option<Step>,
    status_calls: usize,
}

/// Test double for [`TestRunService`]
#[derive(Debug, Default)]
pub struct ScriptedService {
    scripts: Mutex<HashMap<u64, Script>>,
    stopped: Mutex<Vec<RunIdentity>>,
    latency: Option<Duration>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the run that `submit_run(test_id)` will create
    pub fn script(self, test_id: u64, run_id: u64, steps: impl IntoIterator<Item = Step>) -> Self {
        self.lock_scripts().insert(
            test_id,
            Script {
                run_id,
                launch_error: None,
                steps: steps.into_iter().collect(),
                last: None,
                status_calls: 0,
            },
        );
        self
    }

    /// Make `submit_run(test_id)` fail
    pub fn failing_launch(self, test_id: u64, error: ServiceError) -> Self {
        self.lock_scripts().insert(
            test_id,
            Script {
                run_id: 1,
                launch_error: Some(error),
                steps: VecDeque::new(),
                last: None,
                status_calls: 0,
            },
        );
        self
    }

    /// Delay every submit and status request, to simulate a slow service
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of status requests made for a test
    pub fn status_calls(&self, test_id: u64) -> usize {
        self.lock_scripts()
            .get(&test_id)
            .map(|script| script.status_calls)
            .unwrap_or(0)
    }

    /// Runs that received a stop request, in order
    pub fn stopped(&self) -> Vec<RunIdentity> {
        self.stopped
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn lock_scripts(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Script>> {
        self.scripts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn identity(test_id: u64, run_id: u64) -> ServiceResult<RunIdentity> {
        RunIdentity::new(test_id, run_id).map_err(|e| ServiceError::Malformed(e.to_string()))
    }

    fn snapshot(identity: RunIdentity, status: RunStatus, rate: f64) -> ServiceResult<RunResult> {
        RunResult::new(identity, status, rate).map_err(|e| ServiceError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl TestRunService for ScriptedService {
    async fn submit_run(&self, test_id: u64) -> ServiceResult<RunResult> {
        self.delay().await;
        let run_id = {
            let scripts = self.lock_scripts();
            let script = scripts
                .get(&test_id)
                .ok_or_else(|| ServiceError::NotFound(format!("test {}", test_id)))?;
            if let Some(error) = &script.launch_error {
                return Err(error.clone());
            }
            script.run_id
        };

        Self::snapshot(Self::identity(test_id, run_id)?, RunStatus::Pending, 0.0)
    }

    async fn get_run_status(&self, test_id: u64, run_id: u64) -> ServiceResult<RunResult> {
        self.delay().await;

        let step = {
            let mut scripts = self.lock_scripts();
            let script = scripts
                .get_mut(&test_id)
                .filter(|script| script.run_id == run_id)
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("run {} of test {}", run_id, test_id))
                })?;
            script.status_calls += 1;

            match script.steps.pop_front() {
                Some(step) => {
                    script.last = Some(step.clone());
                    step
                }
                None => script
                    .last
                    .clone()
                    .unwrap_or_else(|| Step::status(RunStatus::Pending)),
            }
        };

        match step {
            Step::Status {
                status,
                success_rate,
            } => Self::snapshot(Self::identity(test_id, run_id)?, status, success_rate),
            Step::Error(error) => Err(error),
        }
    }

    async fn stop_run(&self, test_id: u64, run_id: u64) -> ServiceResult<()> {
        let identity = Self::identity(test_id, run_id)?;
        self.stopped
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(identity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_repeats_last_step() {
        let service = ScriptedService::new().script(
            3,
            30,
            [Step::status(RunStatus::Pending), Step::status(RunStatus::Running)],
        );

        let launched = service.submit_run(3).await.unwrap();
        assert_eq!(launched.identity().run_id(), 30);
        assert_eq!(launched.status(), RunStatus::Pending);

        let statuses = [
            service.get_run_status(3, 30).await.unwrap().status(),
            service.get_run_status(3, 30).await.unwrap().status(),
            service.get_run_status(3, 30).await.unwrap().status(),
        ];
        assert_eq!(
            statuses,
            [RunStatus::Pending, RunStatus::Running, RunStatus::Running]
        );
        assert_eq!(service.status_calls(3), 3);
    }

    #[tokio::test]
    async fn test_unknown_test_and_run() {
        let service = ScriptedService::new().script(3, 30, [Step::done(1.0)]);
        assert!(matches!(
            service.submit_run(4).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.get_run_status(3, 31).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failing_launch_and_stop() {
        let service = ScriptedService::new()
            .failing_launch(5, ServiceError::Unauthorized(401))
            .script(6, 60, [Step::status(RunStatus::Running)]);

        assert_eq!(
            service.submit_run(5).await.unwrap_err(),
            ServiceError::Unauthorized(401)
        );

        service.stop_run(6, 60).await.unwrap();
        assert_eq!(service.stopped(), vec![RunIdentity::new(6, 60).unwrap()]);
    }
}
