//! User-facing progress output.
//!
//! The driver never prints directly; it talks to a [`Reporter`]. The CLI
//! uses [`ConsoleReporter`], tests use the generated `MockReporter`.

use std::io::{self, Write};
use std::time::Duration;

use mockall::automock;
use serde::Serialize;

/// How a batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatchOutcome {
    /// Every queued file was accepted.
    Completed,
    /// The upload at this zero-based queue position failed; later files were not attempted.
    Aborted { index: usize },
}

/// Result of one import batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub pattern_count: usize,
    pub elapsed: Duration,
    pub outcome: BatchOutcome,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.outcome == BatchOutcome::Completed
    }

    /// Process exit code for this batch: 0 only if every file was accepted.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// One-line summary printed after a successful batch.
    ///
    /// The unit is pluralised by the number of patterns given, not by the
    /// number of files imported.
    pub fn message(&self) -> String {
        let unit = if self.pattern_count > 1 { "files" } else { "file" };
        // sub-millisecond precision is noise for a human reader
        let elapsed = Duration::from_millis(u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX));
        format!(
            "Successfully imported {} {} in {}",
            self.succeeded,
            unit,
            humantime::format_duration(elapsed)
        )
    }
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Reporter: Send + Sync {
    /// An upload of the file with this base name is about to start.
    fn report_start(&self, name: &str);

    /// The file announced by the last `report_start` was accepted.
    fn report_done(&self);

    /// The file announced by the last `report_start` could not be imported.
    fn report_failed(&self);

    /// A batch-level error message.
    fn report_error(&self, message: &str);

    fn report_summary(&self, summary: &BatchSummary);
}

/// Prints progress to stdout and errors to stderr.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report_start(&self, name: &str) {
        let mut out = io::stdout().lock();
        let _ = write!(out, "Importing {name} ... ");
        let _ = out.flush();
    }

    fn report_done(&self) {
        println!("done");
    }

    fn report_failed(&self) {
        println!("error");
    }

    fn report_error(&self, message: &str) {
        eprintln!("error: {message}");
    }

    fn report_summary(&self, summary: &BatchSummary) {
        println!("{}", summary.message());
    }
}
