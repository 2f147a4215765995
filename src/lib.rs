#![doc = "georocket-import: resolve file patterns and stream the matching files into GeoRocket."]

//! Files are resolved from literal paths or glob patterns, queued in order and
//! uploaded one at a time to the store's `/store` endpoint. The first rejected
//! or failed upload ends the batch.

pub mod cli;
pub mod config;
pub mod error;
pub mod import;
pub mod load_config;
pub mod queue;
pub mod report;
pub mod resolve;
pub mod upload;

pub use cli::{run, Cli, Commands};
pub use error::{ImportError, UploadError};
