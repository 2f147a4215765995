//! Streams single files into the GeoRocket store.
//!
//! The [`Uploader`] trait is the seam between the import driver and the
//! network; [`HttpUploader`] is the real implementation, test suites use the
//! generated `MockUploader`.
//!
//! A file is never read into memory as a whole. Its bytes are read in chunks of
//! at most `buffer_size` bytes, and only when the HTTP transport polls the
//! request body for more, so a slow server slows down reading instead of
//! growing a buffer.

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{ready, Stream};
use mockall::automock;
use reqwest::{header, Body, Client, StatusCode};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, trace};

use crate::config::ClientConfig;
use crate::error::UploadError;

/// Uploads one local file and reports whether the store accepted it.
///
/// Implementors must release the file handle and the request before
/// returning, whatever the outcome.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload the file at `path`, returning the number of bytes sent.
    async fn upload(&self, path: &Path) -> Result<u64, UploadError>;
}

/// Uploader backed by one keep-alive HTTP client shared by every upload of a batch.
pub struct HttpUploader {
    client: Client,
    url: String,
    buffer_size: usize,
}

impl HttpUploader {
    pub fn new(config: &ClientConfig) -> Result<Self, UploadError> {
        let client = Client::builder().build()?;
        let url = config.server.store_url();
        info!(url = %url, buffer_size = config.buffer_size, "Initialized HttpUploader");
        Ok(Self {
            client,
            url,
            buffer_size: config.buffer_size,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn file_error(path: &Path, source: io::Error) -> UploadError {
    UploadError::FileIo {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, path: &Path) -> Result<u64, UploadError> {
        let file = File::open(path).await.map_err(|e| {
            error!(error = ?e, path = %path.display(), "Failed to open file");
            file_error(path, e)
        })?;
        let size = file
            .metadata()
            .await
            .map_err(|e| {
                error!(error = ?e, path = %path.display(), "Failed to read file metadata");
                file_error(path, e)
            })?
            .len();

        info!(path = %path.display(), size, url = %self.url, "Uploading file");

        let stream = UploadStream::new(file, self.buffer_size);
        let read_failure = stream.failure_slot();

        let result = self
            .client
            .post(&self.url)
            .header(header::CONTENT_LENGTH, size)
            .body(Body::wrap_stream(stream))
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                // the body stream is dropped with the request, closing the file
                let read_error = read_failure.lock().ok().and_then(|mut slot| slot.take());
                if let Some(read_error) = read_error {
                    error!(error = ?read_error, path = %path.display(), "Failed to read file while streaming");
                    return Err(file_error(path, read_error));
                }
                error!(error = ?e, path = %path.display(), "Transport error while uploading");
                return Err(UploadError::Transport(e));
            }
        };

        let status = response.status();
        if status == StatusCode::ACCEPTED {
            debug!(path = %path.display(), size, "Store accepted file");
            return Ok(size);
        }

        let reason = response
            .extensions()
            .get::<hyper::ext::ReasonPhrase>()
            .and_then(|phrase| std::str::from_utf8(phrase.as_bytes()).ok())
            .or_else(|| status.canonical_reason())
            .unwrap_or_default()
            .to_string();
        error!(path = %path.display(), status = status.as_u16(), reason = %reason, "Store rejected file");
        Err(UploadError::RejectedStatus {
            code: status.as_u16(),
            reason,
        })
    }
}

/// Request body that pulls bounded chunks from a file on demand.
struct UploadStream {
    inner: ReaderStream<File>,
    sent: u64,
    failure: Arc<Mutex<Option<io::Error>>>,
}

impl UploadStream {
    fn new(file: File, buffer_size: usize) -> Self {
        Self {
            inner: ReaderStream::with_capacity(file, buffer_size),
            sent: 0,
            failure: Arc::new(Mutex::new(None)),
        }
    }

    /// Holds a copy of the read error, if reading the file is what broke the body.
    fn failure_slot(&self) -> Arc<Mutex<Option<io::Error>>> {
        Arc::clone(&self.failure)
    }
}

impl Stream for UploadStream {
    type Item = Result<Bytes, io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let chunk = ready!(Pin::new(&mut self.inner).poll_next(cx));
        match &chunk {
            Some(Ok(bytes)) => {
                self.sent += bytes.len() as u64;
                trace!(chunk = bytes.len(), sent = self.sent, "Pumped chunk into request body");
            }
            Some(Err(e)) => {
                if let Ok(mut slot) = self.failure.lock() {
                    *slot = Some(io::Error::new(e.kind(), e.to_string()));
                }
            }
            None => trace!(sent = self.sent, "File fully streamed"),
        }
        Poll::Ready(chunk)
    }
}
