//! Logging and tracing configuration
//!
//! Logs go to stderr so that stdout stays clean for the run report
//! (and for `--json` output consumed by CI scripts).

use std::io::{self, Write};
use std::sync::Mutex;

use indicatif::ProgressBar;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is not set
const DEFAULT_FILTER: &str = "loadero_ci=info,warn";

/// Progress bar currently drawn on stderr, if any
static PROGRESS: Mutex<Option<ProgressBar>> = Mutex::new(None);

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate, WARN for dependencies; `verbose`
/// raises this crate to DEBUG so every poll sample is logged.
pub fn init_cli(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("loadero_ci=debug,warn")
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(|| ProgressAwareStderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Register the bar that log lines must be printed around, or clear it
pub fn set_progress(bar: Option<ProgressBar>) {
    *PROGRESS.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = bar;
}

/// Stderr writer that hides the active progress bar while a line is written
struct ProgressAwareStderr;

impl Write for ProgressAwareStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let progress = PROGRESS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match progress.as_ref() {
            Some(bar) => bar.suspend(|| io::stderr().write_all(buf))?,
            None => io::stderr().write_all(buf)?,
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_around_progress_bar() {
        let bar = ProgressBar::hidden();
        set_progress(Some(bar.clone()));
        let written = ProgressAwareStderr.write(b"status changed\n").unwrap();
        set_progress(None);

        assert_eq!(written, 15);
        assert!(PROGRESS.lock().unwrap().is_none());
        assert!(!bar.is_finished());
    }
}
