//! Progress snapshots, percent throttling, and ETA formatting.

use std::time::Duration;

use super::constants::UNKNOWN_TOTAL_REPORT_STEP_BYTES;

/// Snapshot of a running download, recomputed after every chunk.
///
/// `percent_complete` and `eta_seconds` are `None` whenever the total size is
/// unknown or zero; they are never derived by dividing by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    /// Integer percent 0..=100 (truncated).
    pub percent_complete: Option<u8>,
    /// `Content-Length` of the response, when the server sent a usable one.
    pub total_bytes: Option<u64>,
    /// Bytes written to the output file so far.
    pub downloaded_bytes: u64,
    /// Estimated seconds remaining at the average throughput so far.
    pub eta_seconds: Option<u64>,
}

impl DownloadProgress {
    /// Computes a snapshot from byte counts and time elapsed since the transfer started.
    #[must_use]
    pub fn compute(total_bytes: Option<u64>, downloaded_bytes: u64, elapsed: Duration) -> Self {
        let known_total = total_bytes.filter(|&total| total > 0);
        Self {
            percent_complete: known_total.map(|total| percent_of(downloaded_bytes, total)),
            total_bytes,
            downloaded_bytes,
            eta_seconds: known_total
                .map(|total| estimate_eta_secs(total, downloaded_bytes, elapsed)),
        }
    }

    /// ETA as zero-padded `HH:MM:SS`, when known.
    #[must_use]
    pub fn eta_display(&self) -> Option<String> {
        self.eta_seconds.map(format_eta)
    }
}

/// `downloaded * 100 / total`, truncated and capped at 100. `total` must be non-zero.
fn percent_of(downloaded: u64, total: u64) -> u8 {
    let percent = u128::from(downloaded) * 100 / u128::from(total);
    u8::try_from(percent.min(100)).unwrap_or(100)
}

/// Remaining bytes divided by average speed; 0 while the speed is 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
pub fn estimate_eta_secs(total: u64, downloaded: u64, elapsed: Duration) -> u64 {
    let elapsed_secs = elapsed.as_secs_f64();
    if elapsed_secs <= 0.0 {
        return 0;
    }
    let speed = downloaded as f64 / elapsed_secs;
    if speed <= 0.0 {
        return 0;
    }
    let remaining = total.saturating_sub(downloaded) as f64;
    (remaining / speed).max(0.0) as u64
}

/// Formats seconds as zero-padded `HH:MM:SS`.
#[must_use]
pub fn format_eta(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Decides which snapshots reach the progress sink.
///
/// With a known total, a snapshot is reported only when its integer percent
/// differs from the last reported one. With an unknown total, at most once
/// per [`UNKNOWN_TOTAL_REPORT_STEP_BYTES`] of new data.
#[derive(Debug, Default)]
pub(crate) struct ProgressThrottle {
    last_percent: Option<u8>,
    last_reported_bytes: Option<u64>,
}

impl ProgressThrottle {
    pub(crate) fn should_report(&mut self, progress: &DownloadProgress) -> bool {
        match progress.percent_complete {
            Some(percent) => {
                if self.last_percent == Some(percent) {
                    return false;
                }
                self.last_percent = Some(percent);
                true
            }
            None => {
                let due = self.last_reported_bytes.is_none_or(|last| {
                    progress.downloaded_bytes.saturating_sub(last)
                        >= UNKNOWN_TOTAL_REPORT_STEP_BYTES
                });
                if due {
                    self.last_reported_bytes = Some(progress.downloaded_bytes);
                }
                due
            }
        }
    }
}
