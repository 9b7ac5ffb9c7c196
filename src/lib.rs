//! Grabfile Core Library
//!
//! Downloads a single file over HTTP(S) into a downloads directory while
//! reporting live progress, with cooperative cancellation that removes the
//! partial file.
//!
//! # Architecture
//!
//! - [`download`] - the download engine, naming rules, progress model, and
//!   background job handles
//!
//! The `grabfile` binary layers a terminal progress bar, Ctrl-C
//! cancellation, and a small config file on top of this crate.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use download::{
    CancelFlag, CompletedDownload, DownloadEngine, DownloadError, DownloadHandle,
    DownloadOutcome, DownloadProgress, DownloadRequest, DownloadSlot, FailureKind, HttpClient,
    HttpClientConfig, LaunchError, format_eta, spawn_download,
};
