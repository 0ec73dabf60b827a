//! JSON records returned by the Loadero API
//!
//! Only the fields the lifecycle needs are decoded; everything else in the
//! response is ignored.

use serde::Deserialize;

use super::{ServiceError, ServiceResult};
use crate::run::{RunIdentity, RunResult, RunStatus};

/// A test run as returned by the runs endpoints
#[derive(Deserialize, Debug)]
pub(crate) struct RunRecord {
    pub id: u64,
    pub test_id: u64,
    pub status: RunStatus,
    /// Absent or null until the run is done
    #[serde(default)]
    pub success_rate: Option<f64>,
}

impl RunRecord {
    /// Decode a response body
    pub fn parse(body: &str) -> ServiceResult<Self> {
        serde_json::from_str(body).map_err(|e| ServiceError::Malformed(e.to_string()))
    }

    /// Convert into a validated snapshot
    pub fn into_result(self) -> ServiceResult<RunResult> {
        let identity = RunIdentity::new(self.test_id, self.id)
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        RunResult::new(identity, self.status, self.success_rate.unwrap_or(0.0))
            .map_err(|e| ServiceError::Malformed(e.to_string()))
    }
}
