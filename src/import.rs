//! Sequential import of every file matched by a set of patterns.
//!
//! The pipeline is:
//!   - resolve each pattern into paths, in the order the patterns were given
//!   - queue all paths (no deduplication)
//!   - upload the queued files strictly one after another through an [`Uploader`]
//!   - stop at the first failed upload; files behind it are never attempted
//!
//! Exactly one upload is in flight at any time and the next file is only
//! opened once the previous outcome is known. Files stored before a failure
//! stay stored; the batch as a whole still counts as failed.
//!
//! All user-visible output goes through a [`Reporter`].

use std::path::Path;
use std::time::Instant;

use tracing::{debug, error, info, Instrument};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ImportError, Result};
use crate::queue::ImportQueue;
use crate::report::{BatchOutcome, BatchSummary, Reporter};
use crate::resolve::resolve;
use crate::upload::{HttpUploader, Uploader};

/// A resolved set of files waiting to be imported.
#[derive(Debug)]
pub struct ImportBatch {
    queue: ImportQueue,
    pattern_count: usize,
    started: Instant,
}

impl ImportBatch {
    /// Resolves all patterns into one queue. The batch clock starts here.
    pub fn resolve<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let started = Instant::now();
        if patterns.is_empty() {
            return Err(ImportError::NoPatternsGiven);
        }

        let mut queue = ImportQueue::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let paths = resolve(pattern);
            debug!(pattern, matches = paths.len(), "Queueing resolved paths");
            queue.push_all(paths);
        }
        info!(patterns = patterns.len(), files = queue.len(), "Resolved file patterns");

        Ok(Self {
            queue,
            pattern_count: patterns.len(),
            started,
        })
    }

    pub fn from_queue(queue: ImportQueue, pattern_count: usize) -> Self {
        Self {
            queue,
            pattern_count,
            started: Instant::now(),
        }
    }

    pub fn queue(&self) -> &ImportQueue {
        &self.queue
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Uploads every queued file in order and stops at the first failure.
    pub async fn run<U, R>(self, uploader: &U, reporter: &R) -> Result<BatchSummary>
    where
        U: Uploader + ?Sized,
        R: Reporter + ?Sized,
    {
        if self.queue.is_empty() {
            let err = ImportError::NoFilesMatched;
            reporter.report_error(&err.to_string());
            return Err(err);
        }

        let span = tracing::info_span!(
            "import_batch",
            batch_id = %Uuid::new_v4(),
            files = self.queue.len()
        );
        self.drain(uploader, reporter).instrument(span).await
    }

    async fn drain<U, R>(mut self, uploader: &U, reporter: &R) -> Result<BatchSummary>
    where
        U: Uploader + ?Sized,
        R: Reporter + ?Sized,
    {
        let mut attempted = 0;
        let mut succeeded = 0;

        while !self.queue.is_empty() {
            let path = self.queue.pop_front()?;
            attempted += 1;

            reporter.report_start(&display_name(&path));
            match uploader.upload(&path).await {
                Ok(bytes) => {
                    succeeded += 1;
                    info!(path = %path.display(), bytes, "Imported file");
                    reporter.report_done();
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, remaining = self.queue.len(), "Import aborted");
                    reporter.report_failed();
                    reporter.report_error(&e.to_string());

                    let summary = self.summary(
                        attempted,
                        succeeded,
                        BatchOutcome::Aborted {
                            index: attempted - 1,
                        },
                    );
                    trace_summary(&summary);
                    return Err(ImportError::Aborted {
                        summary: Box::new(summary),
                        source: e,
                    });
                }
            }
        }

        let summary = self.summary(attempted, succeeded, BatchOutcome::Completed);
        trace_summary(&summary);
        reporter.report_summary(&summary);
        Ok(summary)
    }

    fn summary(&self, attempted: usize, succeeded: usize, outcome: BatchOutcome) -> BatchSummary {
        BatchSummary {
            attempted,
            succeeded,
            pattern_count: self.pattern_count,
            elapsed: self.started.elapsed(),
            outcome,
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn trace_summary(summary: &BatchSummary) {
    info!(
        attempted = summary.attempted,
        succeeded = summary.succeeded,
        outcome = ?summary.outcome,
        "Import batch finished"
    );
    match serde_json::to_string(summary) {
        Ok(json) => debug!(json = %json, "Batch summary as JSON"),
        Err(e) => error!(error = ?e, "Failed to serialize batch summary as JSON"),
    }
}

/// Resolves `patterns` and imports every match into the store described by `config`.
///
/// No HTTP client is created when the patterns match nothing.
pub async fn import<S, R>(patterns: &[S], config: &ClientConfig, reporter: &R) -> Result<BatchSummary>
where
    S: AsRef<str>,
    R: Reporter + ?Sized,
{
    let batch = match ImportBatch::resolve(patterns) {
        Ok(batch) => batch,
        Err(e) => {
            reporter.report_error(&e.to_string());
            return Err(e);
        }
    };

    if batch.is_empty() {
        let err = ImportError::NoFilesMatched;
        reporter.report_error(&err.to_string());
        return Err(err);
    }

    let uploader = match HttpUploader::new(config) {
        Ok(uploader) => uploader,
        Err(e) => {
            reporter.report_error(&e.to_string());
            return Err(e.into());
        }
    };

    batch.run(&uploader, reporter).await
}
