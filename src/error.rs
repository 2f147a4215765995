//! Error types for pattern resolution, uploads and the import batch.

use thiserror::Error;

use crate::report::BatchSummary;

/// Result type alias using the import error type.
pub type Result<T> = std::result::Result<T, ImportError>;

/// Why a single file could not be stored.
#[derive(Error, Debug)]
pub enum UploadError {
    /// Opening, inspecting or reading the local file failed
    #[error("{path}: {source}")]
    FileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The connection failed before a response arrived
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The store answered with anything other than 202 Accepted
    #[error("GeoRocket did not accept the file (status code {code}: {reason})")]
    RejectedStatus { code: u16, reason: String },
}

/// Main error type for an import batch.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("no file pattern given. provide at least one file to import.")]
    NoPatternsGiven,

    #[error("given pattern didn't match any files")]
    NoFilesMatched,

    #[error("import queue is empty")]
    EmptyQueue,

    /// The uploader could not be set up
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// An upload failed; the files behind it were never attempted
    #[error("{source}")]
    Aborted {
        summary: Box<BatchSummary>,
        #[source]
        source: UploadError,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ImportError {
    /// The summary of the batch this error ended, if any upload was attempted.
    pub fn summary(&self) -> Option<&BatchSummary> {
        match self {
            ImportError::Aborted { summary, .. } => Some(summary.as_ref()),
            _ => None,
        }
    }

    /// Process exit code for a run that ended with this error.
    pub fn exit_code(&self) -> i32 {
        self.summary().map_or(1, BatchSummary::exit_code)
    }
}
