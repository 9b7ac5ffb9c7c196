//! Error types for the download module.
//!
//! Every failure the engine can hit is described here with enough context
//! (URL, path, status) to produce a useful message without the caller
//! having to reconstruct what was being attempted.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can end a download with [`DownloadOutcome::Failed`](super::DownloadOutcome::Failed).
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The response body stopped arriving: the connection dropped or a
    /// read deadline passed after the headers were accepted.
    #[error("connection lost while reading body of {url}: {source}")]
    Body {
        /// The URL whose body failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Connecting or waiting for the response headers exceeded its deadline.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The server answered with anything other than `200 OK`.
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error while creating or writing the output file.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Bytes written do not match the server's `Content-Length`.
    #[error(
        "integrity check failed for {path}: expected {expected_bytes} bytes, got {actual_bytes}"
    )]
    Integrity {
        /// Download path that failed verification.
        path: PathBuf,
        /// Expected size in bytes.
        expected_bytes: u64,
        /// Actual size in bytes.
        actual_bytes: u64,
    },

    /// The provided URL is malformed or not HTTP(S).
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The background task running the download panicked or was aborted.
    #[error("download task failed: {reason}")]
    Task {
        /// Description of the join failure.
        reason: String,
    },
}

/// Coarse classification of a [`DownloadError`], used for user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No usable response was obtained (DNS/TCP/TLS, timeout, bad URL).
    Connection,
    /// The server responded with a non-success status.
    HttpStatus,
    /// Reading the body or writing the file failed.
    Io,
    /// The task itself failed.
    Task,
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an integrity mismatch error.
    pub fn integrity(path: impl Into<PathBuf>, expected_bytes: u64, actual_bytes: u64) -> Self {
        Self::Integrity {
            path: path.into(),
            expected_bytes,
            actual_bytes,
        }
    }

    /// Creates a task failure error.
    pub fn task(reason: impl Into<String>) -> Self {
        Self::Task {
            reason: reason.into(),
        }
    }

    /// Maps a reqwest error raised before a response was obtained to `Timeout` or `Network`.
    pub(crate) fn from_transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::timeout(url)
        } else {
            Self::network(url, source)
        }
    }

    /// Maps a reqwest error raised while streaming the body, timeouts included.
    pub(crate) fn from_body_transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Body {
            url: url.into(),
            source,
        }
    }

    /// Returns the coarse failure classification.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network { .. } | Self::Timeout { .. } | Self::InvalidUrl { .. } => {
                FailureKind::Connection
            }
            Self::HttpStatus { .. } => FailureKind::HttpStatus,
            Self::Body { .. } | Self::Io { .. } | Self::Integrity { .. } => FailureKind::Io,
            Self::Task { .. } => FailureKind::Task,
        }
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: each variant needs the
// URL or path that the source error does not carry.
