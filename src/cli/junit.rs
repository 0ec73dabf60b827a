//! JUnit XML report of a batch
//!
//! One `<testcase>` per test. A failing verdict becomes a `<failure>`; a run
//! that timed out, was cancelled or never produced a verdict becomes an
//! `<error>`.

use std::path::Path;
use std::time::Duration;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::common::{Error, Result};
use crate::run::{BatchEntry, BatchSummary, Verdict};

const SUITE_NAME: &str = "loadero-ci";

/// Write the batch as a JUnit report, creating parent directories
pub fn write_report(path: &Path, summary: &BatchSummary, project_id: u64) -> Result<()> {
    let xml = render(summary, project_id)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, xml)?;
    tracing::info!(path = %path.display(), "Wrote JUnit report");
    Ok(())
}

fn render(summary: &BatchSummary, project_id: u64) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    let tests = summary.entries.len().to_string();
    let failures = summary.failed().to_string();
    let errors = (summary.aborted() + summary.errored()).to_string();
    let time = seconds(summary.entries.iter().filter_map(elapsed).max());

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    let mut suites = BytesStart::new("testsuites");
    suites.push_attribute(("name", SUITE_NAME));
    suites.push_attribute(("tests", tests.as_str()));
    suites.push_attribute(("failures", failures.as_str()));
    suites.push_attribute(("errors", errors.as_str()));
    suites.push_attribute(("time", time.as_str()));
    emit(&mut writer, Event::Start(suites))?;

    let mut suite = BytesStart::new("testsuite");
    suite.push_attribute(("name", SUITE_NAME));
    suite.push_attribute(("tests", tests.as_str()));
    suite.push_attribute(("failures", failures.as_str()));
    suite.push_attribute(("errors", errors.as_str()));
    suite.push_attribute(("skipped", "0"));
    suite.push_attribute(("time", time.as_str()));
    emit(&mut writer, Event::Start(suite))?;

    for entry in &summary.entries {
        write_case(&mut writer, entry, project_id)?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("testsuite")))?;
    emit(&mut writer, Event::End(BytesEnd::new("testsuites")))?;
    Ok(writer.into_inner())
}

fn write_case(writer: &mut Writer<Vec<u8>>, entry: &BatchEntry, project_id: u64) -> Result<()> {
    let name = format!("Loadero project id: {} test id: {}", project_id, entry.test_id);
    let classname = format!("loadero.project{}", project_id);
    let time = seconds(elapsed(entry));

    let mut case = BytesStart::new("testcase");
    case.push_attribute(("name", name.as_str()));
    case.push_attribute(("classname", classname.as_str()));
    case.push_attribute(("time", time.as_str()));

    let problem = match &entry.outcome {
        Ok(report) if report.verdict == Verdict::Pass => None,
        Ok(report) => Some((
            "failure",
            format!(
                "Test: {} Run: {} failed.",
                entry.test_id,
                report.final_result.identity().run_id()
            ),
            report.final_result.status().as_str().to_string(),
            report.final_result.to_string(),
        )),
        Err(e) => Some((
            "error",
            e.to_string(),
            error_kind(e).to_string(),
            e.to_string(),
        )),
    };

    let Some((tag, message, kind, detail)) = problem else {
        return emit(writer, Event::Empty(case));
    };

    emit(writer, Event::Start(case))?;
    let mut element = BytesStart::new(tag);
    element.push_attribute(("message", message.as_str()));
    element.push_attribute(("type", kind.as_str()));
    emit(writer, Event::Start(element))?;
    emit(writer, Event::Text(BytesText::new(&detail)))?;
    emit(writer, Event::End(BytesEnd::new(tag)))?;
    emit(writer, Event::End(BytesEnd::new("testcase")))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::Internal(format!("Failed to render JUnit report: {}", e)))
}

fn elapsed(entry: &BatchEntry) -> Option<Duration> {
    match &entry.outcome {
        Ok(report) => Some(report.outcome.elapsed),
        Err(Error::PollTimeout { elapsed, .. })
        | Err(Error::Poll { elapsed, .. })
        | Err(Error::Cancelled { elapsed, .. }) => Some(*elapsed),
        Err(_) => None,
    }
}

fn error_kind(error: &Error) -> &'static str {
    match error {
        Error::PollTimeout { .. } => "timeout",
        Error::Cancelled { .. } => "cancelled",
        Error::Launch { .. } => "launch",
        Error::Poll { .. } => "poll",
        Error::StatusRelapse { .. } | Error::EvaluationContract { .. } => "contract",
        _ => "internal",
    }
}

fn seconds(elapsed: Option<Duration>) -> String {
    format!("{:.3}", elapsed.unwrap_or_default().as_secs_f64())
}
