//! Terminal and JSON rendering of run results

use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::common::{Error, Result};
use crate::run::{BatchEntry, BatchSummary, LifecycleOptions, RunResult, RunStatus, Verdict};

/// Spinner shown on stderr while runs are polled
pub fn spinner(test_ids: &[u64], options: &LifecycleOptions) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!(
        "Waiting for {} run(s), timeout {}s",
        test_ids.len(),
        options.poll.timeout().as_secs()
    ));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Print a single status sample
pub fn print_status(result: &RunResult) {
    let identity = result.identity();
    println!("Test:         {}", identity.test_id());
    println!("Run:          {}", identity.run_id());
    println!("Status:       {}", colored_status(result.status()));
    if result.status() == RunStatus::Done {
        println!("Success rate: {:.0}%", result.success_rate() * 100.0);
    }
}

/// Print one line per test plus totals
pub fn print_summary(summary: &BatchSummary) {
    println!();
    for entry in &summary.entries {
        print_entry(entry);
    }

    if summary.entries.len() > 1 {
        println!(
            "\n{} total, {} passed, {} failed, {} aborted, {} errored",
            summary.entries.len(),
            summary.passed().to_string().green(),
            summary.failed().to_string().red(),
            summary.aborted().to_string().yellow(),
            summary.errored().to_string().red(),
        );
    }
}

fn print_entry(entry: &BatchEntry) {
    match &entry.outcome {
        Ok(report) => {
            let mark = match report.verdict {
                Verdict::Pass => "✓".green().bold(),
                Verdict::Fail => "✗".red().bold(),
            };
            println!(
                "  {} Test {} {} ({}, {} checks in {:.1}s)",
                mark,
                entry.test_id,
                report.verdict,
                report.final_result,
                report.outcome.samples,
                report.outcome.elapsed.as_secs_f64()
            );
            if report.outcome.retries_used > 0 {
                println!(
                    "    {} transient failure(s) retried",
                    report.outcome.retries_used.to_string().yellow()
                );
            }
        }
        Err(e) => {
            let mark = if e.is_abort() {
                "!".yellow().bold()
            } else {
                "✗".red().bold()
            };
            println!("  {} Test {}: {}", mark, entry.test_id, e);
        }
    }
}

fn colored_status(status: RunStatus) -> colored::ColoredString {
    match status {
        RunStatus::Done => status.as_str().green(),
        RunStatus::Failed | RunStatus::Error => status.as_str().red(),
        RunStatus::Aborted | RunStatus::Cancelled | RunStatus::Aborting => status.as_str().yellow(),
        _ => status.as_str().cyan(),
    }
}

#[derive(Serialize)]
struct JsonSummary {
    passed: usize,
    failed: usize,
    aborted: usize,
    errored: usize,
    exit_code: i32,
    runs: Vec<JsonEntry>,
}

#[derive(Serialize)]
struct JsonEntry {
    test_id: u64,
    run_id: Option<u64>,
    status: Option<RunStatus>,
    success_rate: Option<f64>,
    verdict: Option<Verdict>,
    samples: Option<u32>,
    retries_used: Option<u32>,
    elapsed_ms: Option<u64>,
    error: Option<String>,
    exit_code: i32,
}

impl From<&BatchEntry> for JsonEntry {
    fn from(entry: &BatchEntry) -> Self {
        let exit_code = entry.exit_code();
        match &entry.outcome {
            Ok(report) => Self {
                test_id: entry.test_id,
                run_id: Some(report.final_result.identity().run_id()),
                status: Some(report.final_result.status()),
                success_rate: Some(report.final_result.success_rate()),
                verdict: Some(report.verdict),
                samples: Some(report.outcome.samples),
                retries_used: Some(report.outcome.retries_used),
                elapsed_ms: Some(report.outcome.elapsed.as_millis() as u64),
                error: None,
                exit_code,
            },
            Err(e) => {
                let (run_id, status, samples, elapsed) = match e {
                    Error::PollTimeout {
                        last,
                        samples,
                        elapsed,
                        ..
                    } => (
                        Some(last.identity().run_id()),
                        Some(last.status()),
                        Some(*samples),
                        Some(*elapsed),
                    ),
                    Error::Poll {
                        run_id,
                        last_status,
                        elapsed,
                        ..
                    } => (Some(*run_id), *last_status, None, Some(*elapsed)),
                    Error::Cancelled {
                        run_id,
                        last_status,
                        elapsed,
                        ..
                    } => (*run_id, *last_status, None, Some(*elapsed)),
                    Error::StatusRelapse { identity, to, .. } => {
                        (Some(identity.run_id()), Some(*to), None, None)
                    }
                    _ => (None, None, None, None),
                };
                Self {
                    test_id: entry.test_id,
                    run_id,
                    status,
                    success_rate: None,
                    verdict: None,
                    samples,
                    retries_used: e.retries_used(),
                    elapsed_ms: elapsed.map(|elapsed| elapsed.as_millis() as u64),
                    error: Some(e.to_string()),
                    exit_code,
                }
            }
        }
    }
}

/// Print the batch as a JSON document on stdout
pub fn print_json(summary: &BatchSummary) -> Result<()> {
    let doc = JsonSummary {
        passed: summary.passed(),
        failed: summary.failed(),
        aborted: summary.aborted(),
        errored: summary.errored(),
        exit_code: summary.exit_code(),
        runs: summary.entries.iter().map(JsonEntry::from).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunIdentity;

    #[test]
    fn test_json_entry_for_timeout() {
        let identity = RunIdentity::new(4, 40).unwrap();
        let last = RunResult::new(identity, RunStatus::Running, 0.0).unwrap();
        let entry = BatchEntry {
            test_id: 4,
            outcome: Err(Error::PollTimeout {
                last,
                elapsed: Duration::from_secs(61),
                timeout: Duration::from_secs(60),
                samples: 7,
                retries_used: 2,
            }),
        };

        let json = serde_json::to_value(JsonEntry::from(&entry)).unwrap();
        assert_eq!(json["run_id"], 40);
        assert_eq!(json["status"], "running");
        assert_eq!(json["samples"], 7);
        assert_eq!(json["retries_used"], 2);
        assert_eq!(json["elapsed_ms"], 61_000);
        assert_eq!(json["exit_code"], 2);
        assert!(json["verdict"].is_null());
    }
}
