//! Constants for the download module (timeouts, buffering, progress cadence).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default per-read timeout (60 seconds without any body bytes arriving).
pub const READ_TIMEOUT_SECS: u64 = 60;

/// Default maximum number of redirects followed for one request.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Capacity of the buffered writer between the response stream and the file.
pub const WRITE_BUFFER_BYTES: usize = 16 * 1024;

/// Minimum new data between progress reports when the total size is unknown.
pub const UNKNOWN_TOTAL_REPORT_STEP_BYTES: u64 = 1024 * 1024;
