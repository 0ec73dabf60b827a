//! CLI command handling
//!
//! Loads the configuration, applies command-line overrides and runs the
//! requested command. Every command returns the process exit code.

mod junit;
mod output;

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::commands::{Commands, ConnectionArgs};
use crate::common::config::Config;
use crate::common::logging;
use crate::common::{Error, Result};
use crate::run::run_batch;
use crate::service::{LoaderoClient, TestRunService};

/// Overrides for the `run` command, all optional
#[derive(Debug, Default)]
struct RunOverrides {
    timeout: Option<u64>,
    interval: Option<u64>,
    backoff: bool,
    max_interval: Option<u64>,
    max_retries: Option<u32>,
    no_confirm: bool,
    stop_on_timeout: bool,
}

/// Dispatch a CLI command
pub async fn dispatch(connection: ConnectionArgs, command: Commands) -> Result<i32> {
    let mut config = load_config(&connection)?;

    match command {
        Commands::Run {
            test_ids,
            timeout,
            interval,
            backoff,
            max_interval,
            max_retries,
            no_confirm,
            stop_on_timeout,
            json,
            junit,
        } => {
            apply_run_overrides(
                &mut config,
                RunOverrides {
                    timeout,
                    interval,
                    backoff,
                    max_interval,
                    max_retries,
                    no_confirm,
                    stop_on_timeout,
                },
            );
            run(&config, &test_ids, json, junit.as_deref()).await
        }

        Commands::Status {
            test_id,
            run_id,
            json,
        } => {
            let client = LoaderoClient::from_config(&config)?;
            let result = client.get_run_status(test_id, run_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                output::print_status(&result);
            }
            Ok(0)
        }

        Commands::Stop { test_id, run_id } => {
            let client = LoaderoClient::from_config(&config)?;
            client.stop_run(test_id, run_id).await?;
            println!("Stop requested for run {} of test {}", run_id, test_id);
            Ok(0)
        }

        Commands::Config => {
            let rendered = toml::to_string_pretty(&config.redacted())
                .map_err(|e| Error::Internal(format!("Failed to render configuration: {}", e)))?;
            print!("{}", rendered);
            Ok(0)
        }
    }
}

/// Load the config file and layer connection flags on top
fn load_config(connection: &ConnectionArgs) -> Result<Config> {
    let mut config = match &connection.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(token) = &connection.token {
        config.service.access_token = Some(token.clone());
    }
    if let Some(project_id) = connection.project_id {
        config.service.project_id = Some(project_id);
    }
    if let Some(base_url) = &connection.base_url {
        config.service.base_url = base_url.clone();
    }
    Ok(config)
}

fn apply_run_overrides(config: &mut Config, overrides: RunOverrides) {
    if let Some(timeout) = overrides.timeout {
        config.poll.timeout_secs = timeout;
    }
    if let Some(interval) = overrides.interval {
        config.poll.interval_secs = interval;
    }
    if overrides.backoff {
        config.poll.backoff = true;
    }
    if let Some(max_interval) = overrides.max_interval {
        config.poll.max_interval_secs = max_interval;
    }
    if let Some(max_retries) = overrides.max_retries {
        config.poll.max_retries = max_retries;
    }
    if overrides.no_confirm {
        config.run.confirm_final = false;
    }
    if overrides.stop_on_timeout {
        config.run.stop_on_timeout = true;
    }
}

/// Launch every test, wait for all of them and report
async fn run(
    config: &Config,
    test_ids: &[u64],
    json: bool,
    junit_report: Option<&Path>,
) -> Result<i32> {
    let options = config.lifecycle_options()?;
    let service: Arc<dyn TestRunService> = Arc::new(LoaderoClient::from_config(config)?);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, abandoning runs");
            interrupt.cancel();
        }
    });

    let spinner = (!json).then(|| output::spinner(test_ids, &options));
    logging::set_progress(spinner.clone());
    let summary = run_batch(service, test_ids, &options, &cancel).await;
    logging::set_progress(None);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if json {
        output::print_json(&summary)?;
    } else {
        output::print_summary(&summary);
    }

    if let Some(path) = junit_report {
        junit::write_report(path, &summary, config.project_id()?)?;
    }

    Ok(summary.exit_code())
}
