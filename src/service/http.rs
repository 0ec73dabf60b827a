//! Loadero REST API client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};

use super::wire::RunRecord;
use super::{ServiceError, ServiceResult, TestRunService};
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::run::RunResult;

/// HTTP client for one Loadero project
///
/// Credentials are passed in explicitly; there is no process-wide client.
pub struct LoaderoClient {
    http: reqwest::Client,
    base_url: String,
    project_id: u64,
    token: String,
}

impl LoaderoClient {
    /// Create a client for a project
    pub fn new(
        base_url: &str,
        project_id: u64,
        token: &str,
        request_timeout: Duration,
    ) -> Result<Self> {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "base URL '{}' must start with http:// or https://",
                base_url
            )));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("loadero-ci/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id,
            token: token.to_string(),
        })
    }

    /// Create a client from the effective configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.service.base_url,
            config.project_id()?,
            config.access_token()?,
            Duration::from_secs(config.service.request_timeout_secs),
        )
    }

    /// Build an endpoint URL below the project
    fn url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/{}",
            self.base_url,
            self.project_id,
            path.trim_start_matches('/')
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("Authorization", format!("LoaderoAuth {}", self.token))
    }

    /// Send a request and decode a run record from the response
    async fn fetch_run(&self, request: RequestBuilder, what: &str) -> ServiceResult<RunResult> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(map_request_error)?;
        let response = check_status(response, what).await?;
        let body = response.text().await.map_err(map_request_error)?;

        tracing::trace!(body = %body, "Run record received");
        RunRecord::parse(&body)?.into_result()
    }
}

#[async_trait]
impl TestRunService for LoaderoClient {
    async fn submit_run(&self, test_id: u64) -> ServiceResult<RunResult> {
        let url = self.url(&format!("tests/{}/runs/", test_id));
        tracing::debug!(%url, "Submitting run");
        self.fetch_run(self.http.post(&url), &format!("test {}", test_id))
            .await
    }

    async fn get_run_status(&self, test_id: u64, run_id: u64) -> ServiceResult<RunResult> {
        let url = self.url(&format!("tests/{}/runs/{}/", test_id, run_id));
        self.fetch_run(
            self.http.get(&url),
            &format!("run {} of test {}", run_id, test_id),
        )
        .await
    }

    async fn stop_run(&self, test_id: u64, run_id: u64) -> ServiceResult<()> {
        let url = self.url(&format!("tests/{}/runs/{}/stop/", test_id, run_id));
        tracing::debug!(%url, "Stopping run");
        let response = self
            .authorized(self.http.post(&url))
            .send()
            .await
            .map_err(map_request_error)?;
        check_status(response, &format!("run {} of test {}", run_id, test_id)).await?;
        Ok(())
    }
}

fn map_request_error(e: reqwest::Error) -> ServiceError {
    if e.is_timeout() {
        ServiceError::Timeout
    } else {
        ServiceError::Request(e.to_string())
    }
}

/// Turn non-success HTTP statuses into service errors
async fn check_status(response: Response, what: &str) -> ServiceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(ServiceError::Unauthorized(status.as_u16()))
        }
        StatusCode::NOT_FOUND => Err(ServiceError::NotFound(what.to_string())),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(ServiceError::Http {
                status: status.as_u16(),
                body: truncate(&body, 200),
            })
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
