//! HTTP download engine for streaming one file to disk.
//!
//! This module provides a cancellable, progress-reporting download routine
//! and the pieces it is built from.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large files)
//! - Filename from Content-Disposition, else the URL's last path segment
//! - Never overwrites: `name.ext`, then `name(1).ext`, `name(2).ext`, ...
//! - Progress reported once per percentage point, with ETA
//! - Cooperative cancellation polled every chunk; partial files are deleted
//! - Explicit connect/read timeouts and redirect limit
//!
//! # Example
//!
//! ```no_run
//! use grabfile_core::download::{DownloadEngine, DownloadRequest, HttpClient, spawn_download};
//!
//! # async fn example() {
//! let engine = DownloadEngine::new(HttpClient::new(), "./downloads");
//! let handle = spawn_download(
//!     engine,
//!     DownloadRequest::new("https://example.com/archive.zip"),
//!     |progress| {
//!         if let Some(eta) = progress.eta_display() {
//!             eprintln!("{}% (ETA {eta})", progress.percent_complete.unwrap_or(0));
//!         }
//!     },
//! );
//! let cancel = handle.cancel_flag();
//! // `cancel.cancel()` from anywhere stops the job before its next chunk.
//! # drop(cancel);
//! let outcome = handle.wait().await;
//! println!("{outcome:?}");
//! # }
//! ```

mod client;
pub(crate) mod constants;
mod engine;
mod error;
pub mod filename;
mod job;
mod progress;

pub use client::{HttpClient, HttpClientConfig};
pub use constants::{CONNECT_TIMEOUT_SECS, DEFAULT_MAX_REDIRECTS, READ_TIMEOUT_SECS};
pub use engine::{CompletedDownload, DownloadEngine, DownloadOutcome, DownloadRequest};
pub use error::{DownloadError, FailureKind};
pub use job::{CancelFlag, DownloadHandle, DownloadSlot, LaunchError, spawn_download};
pub use progress::{DownloadProgress, estimate_eta_secs, format_eta};

// Per project convention, no module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
