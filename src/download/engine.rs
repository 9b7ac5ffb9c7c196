//! Download engine: one streamed GET into one uniquely-named file.
//!
//! The engine runs sequentially inside whatever task awaits it. It reports
//! progress through a plain callback and polls a cancellation predicate
//! once per received chunk; it never spawns work of its own. Use
//! [`spawn_download`](super::spawn_download) to run it in the background
//! behind a cancellable handle.
//!
//! # Example
//!
//! ```no_run
//! use grabfile_core::download::{DownloadEngine, DownloadOutcome, DownloadRequest, HttpClient};
//!
//! # async fn example() {
//! let engine = DownloadEngine::new(HttpClient::new(), "./downloads");
//! let outcome = engine
//!     .run(
//!         DownloadRequest::new("https://example.com/archive.zip"),
//!         |progress| println!("{:?}%", progress.percent_complete),
//!         || false,
//!     )
//!     .await;
//! if let DownloadOutcome::Completed(done) = outcome {
//!     println!("saved {}", done.path.display());
//! }
//! # }
//! ```

mod partial_file;

use std::path::{Path, PathBuf};
use std::time::Instant;

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::client::{HttpClient, ResponseMeta};
use super::constants::WRITE_BUFFER_BYTES;
use super::error::DownloadError;
use super::filename::proposed_filename;
use super::progress::{DownloadProgress, ProgressThrottle};
use partial_file::PartialFile;

/// A single URL to download. Consumed by [`DownloadEngine::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    url: String,
}

impl DownloadRequest {
    /// Creates a request for `url`. Validation happens when the engine runs it.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// The requested URL as given by the caller.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// A finished download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedDownload {
    /// Final output path inside the engine's output directory.
    pub path: PathBuf,
    /// Bytes written to `path`.
    pub bytes_downloaded: u64,
    /// `Content-Length` reported by the server, when known.
    pub total_bytes: Option<u64>,
}

/// Terminal result of one [`DownloadEngine::run`].
#[derive(Debug)]
pub enum DownloadOutcome {
    /// The body was written completely.
    Completed(CompletedDownload),
    /// The cancellation probe returned true; no file is left behind.
    Cancelled,
    /// The download failed; any partial file has been removed.
    Failed(DownloadError),
}

impl DownloadOutcome {
    /// Returns true for [`DownloadOutcome::Completed`].
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// How the body stream ended when it did not fail.
enum StreamEnd {
    Finished(u64),
    Cancelled,
}

/// Streams HTTP responses into files in one output directory.
///
/// Cheap to clone; clones share the HTTP connection pool.
#[derive(Debug, Clone)]
pub struct DownloadEngine {
    client: HttpClient,
    output_dir: PathBuf,
}

impl DownloadEngine {
    /// Creates an engine writing into `output_dir`. The directory must exist when `run` is called.
    pub fn new(client: HttpClient, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            output_dir: output_dir.into(),
        }
    }

    /// Directory downloads are written into.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Downloads `request` into the output directory.
    ///
    /// `on_progress` is called only when the integer percent changes (or, for
    /// unknown sizes, every megabyte) and never after this returns.
    /// `is_cancelled` is polled before each received chunk is written.
    ///
    /// Every failure is reported as [`DownloadOutcome::Failed`]; a
    /// non-completed run never leaves a file behind.
    #[instrument(skip_all, fields(url = %request.url()))]
    pub async fn run<P, C>(
        &self,
        request: DownloadRequest,
        mut on_progress: P,
        is_cancelled: C,
    ) -> DownloadOutcome
    where
        P: FnMut(&DownloadProgress),
        C: Fn() -> bool,
    {
        match self
            .run_inner(&request, &mut on_progress, &is_cancelled)
            .await
        {
            Ok(Some(done)) => {
                info!(
                    path = %done.path.display(),
                    bytes = done.bytes_downloaded,
                    "download complete"
                );
                DownloadOutcome::Completed(done)
            }
            Ok(None) => {
                info!("download cancelled");
                DownloadOutcome::Cancelled
            }
            Err(error) => {
                warn!(error = %error, "download failed");
                DownloadOutcome::Failed(error)
            }
        }
    }

    /// `Ok(None)` means cancelled.
    async fn run_inner<P, C>(
        &self,
        request: &DownloadRequest,
        on_progress: &mut P,
        is_cancelled: &C,
    ) -> Result<Option<CompletedDownload>, DownloadError>
    where
        P: FnMut(&DownloadProgress),
        C: Fn() -> bool,
    {
        let url = parse_http_url(request.url())?;

        let response = self.client.get_ok(&url).await?;
        let meta = ResponseMeta::from_response(&response);
        debug!(content_length = ?meta.content_length, "response accepted");

        if is_cancelled() {
            return Ok(None);
        }

        let filename = proposed_filename(
            meta.content_disposition.as_deref(),
            meta.content_type.as_deref(),
            &url,
        );
        let (partial, file) = PartialFile::create_unique(&self.output_dir, &filename).await?;
        debug!(filename = %filename, path = %partial.path().display(), "resolved output path");

        let streamed = stream_to_file(
            file,
            response,
            &url,
            partial.path(),
            meta.content_length,
            on_progress,
            is_cancelled,
        )
        .await;

        match streamed {
            Ok(StreamEnd::Finished(bytes)) => {
                if let Some(expected) = meta.content_length
                    && expected != bytes
                {
                    let error = DownloadError::integrity(partial.path(), expected, bytes);
                    partial.discard().await;
                    return Err(error);
                }
                Ok(Some(CompletedDownload {
                    path: partial.keep(),
                    bytes_downloaded: bytes,
                    total_bytes: meta.content_length,
                }))
            }
            Ok(StreamEnd::Cancelled) => {
                partial.discard().await;
                Ok(None)
            }
            Err(error) => {
                debug!(path = %partial.path().display(), "cleaning up partial file after error");
                partial.discard().await;
                Err(error)
            }
        }
    }
}

fn parse_http_url(raw: &str) -> Result<Url, DownloadError> {
    let url = Url::parse(raw.trim()).map_err(|_| DownloadError::invalid_url(raw))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(DownloadError::invalid_url(raw));
    }
    Ok(url)
}

/// Streams the response body into `file`, reporting throttled progress.
///
/// The file handle is closed when this returns, whatever the result.
async fn stream_to_file<P, C>(
    file: File,
    response: reqwest::Response,
    url: &Url,
    file_path: &Path,
    total_bytes: Option<u64>,
    on_progress: &mut P,
    is_cancelled: &C,
) -> Result<StreamEnd, DownloadError>
where
    P: FnMut(&DownloadProgress),
    C: Fn() -> bool,
{
    let started = Instant::now();
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_BYTES, file);
    let mut stream = response.bytes_stream();
    let mut throttle = ProgressThrottle::default();
    let mut downloaded: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::from_body_transport(url.as_str(), e))?;

        if is_cancelled() {
            debug!(downloaded, "cancellation requested");
            return Ok(StreamEnd::Cancelled);
        }

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;
        downloaded += chunk.len() as u64;

        let progress = DownloadProgress::compute(total_bytes, downloaded, started.elapsed());
        if throttle.should_report(&progress) {
            on_progress(&progress);
        }
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(StreamEnd::Finished(downloaded))
}
