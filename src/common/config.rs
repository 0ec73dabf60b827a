//! Configuration file handling

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};
use crate::run::{Cadence, LifecycleOptions, PollConfig, RetryPolicy};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Remote service connection settings
    #[serde(default)]
    pub service: ServiceSettings,

    /// Polling cadence and deadline
    #[serde(default)]
    pub poll: PollSettings,

    /// Lifecycle behaviour around the poll loop
    #[serde(default)]
    pub run: RunSettings,
}

/// Connection settings for the Loadero API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceSettings {
    /// API base URL, including the version segment
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Project owning the tests
    pub project_id: Option<u64>,

    /// Project access token
    pub access_token: Option<String>,

    /// Timeout for a single HTTP request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            project_id: None,
            access_token: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.loadero.com/v2/".to_string()
}
fn default_request_timeout() -> u64 {
    30
}

/// Poll settings in seconds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollSettings {
    /// Overall deadline measured from the first status sample
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Wait between samples
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Double the wait after every non-terminal sample
    #[serde(default)]
    pub backoff: bool,

    /// Upper bound for the wait when backoff is enabled
    #[serde(default = "default_max_interval")]
    pub max_interval_secs: u64,

    /// Transient sample failures tolerated before polling fails
    #[serde(default)]
    pub max_retries: u32,

    /// Wait before resampling after a transient failure
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            interval_secs: default_interval(),
            backoff: false,
            max_interval_secs: default_max_interval(),
            max_retries: 0,
            retry_delay_secs: default_retry_delay(),
        }
    }
}

fn default_timeout() -> u64 {
    300
}
fn default_interval() -> u64 {
    10
}
fn default_max_interval() -> u64 {
    60
}
fn default_retry_delay() -> u64 {
    5
}

/// Lifecycle settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunSettings {
    /// Read the run once more after polling and check it is still terminal
    #[serde(default = "default_confirm_final")]
    pub confirm_final: bool,

    /// Stop the remote run when polling times out or is cancelled
    #[serde(default)]
    pub stop_on_timeout: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            confirm_final: default_confirm_final(),
            stop_on_timeout: false,
        }
    }
}

fn default_confirm_final() -> bool {
    true
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Project id, required for every API call
    pub fn project_id(&self) -> Result<u64> {
        match self.service.project_id {
            Some(0) => Err(Error::Config("project id must be positive".to_string())),
            Some(id) => Ok(id),
            None => Err(Error::Config(
                "no project id: pass --project-id or set LOADERO_PROJECT_ID".to_string(),
            )),
        }
    }

    /// Access token, required for every API call
    pub fn access_token(&self) -> Result<&str> {
        match self.service.access_token.as_deref() {
            Some(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(Error::Config(
                "no access token: pass --token or set LOADERO_ACCESS_TOKEN".to_string(),
            )),
        }
    }

    /// Build the poll loop configuration
    pub fn poll_config(&self) -> Result<PollConfig> {
        let poll = &self.poll;
        let cadence = if poll.backoff {
            Cadence::Exponential {
                factor: 2,
                max_interval: Duration::from_secs(poll.max_interval_secs),
            }
        } else {
            Cadence::Fixed
        };

        PollConfig::new(
            Duration::from_secs(poll.timeout_secs),
            Duration::from_secs(poll.interval_secs),
        )?
        .with_cadence(cadence)?
        .with_retry(RetryPolicy {
            max_retries: poll.max_retries,
            delay: Duration::from_secs(poll.retry_delay_secs),
        })
    }

    /// Build the lifecycle options
    pub fn lifecycle_options(&self) -> Result<LifecycleOptions> {
        Ok(LifecycleOptions {
            poll: self.poll_config()?,
            confirm_final: self.run.confirm_final,
            stop_on_abort: self.run.stop_on_timeout,
        })
    }

    /// Copy of this configuration safe to print
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.service.access_token.is_some() {
            copy.service.access_token = Some("********".to_string());
        }
        copy
    }
}
