//! Terminal progress bar fed by the engine's progress sink.

use grabfile_core::{DownloadOutcome, DownloadProgress};
use indicatif::{ProgressBar, ProgressStyle};

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Progress bar for one download. Hidden when progress output is disabled.
pub(crate) struct ProgressDisplay {
    bar: ProgressBar,
}

impl ProgressDisplay {
    pub(crate) fn new(enabled: bool) -> Self {
        let bar = if enabled {
            ProgressBar::new(100)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template("{bar:30} {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }

    /// Progress sink to hand to the download job.
    pub(crate) fn sink(&self) -> impl FnMut(&DownloadProgress) + Send + 'static {
        let bar = self.bar.clone();
        move |progress: &DownloadProgress| {
            if let Some(percent) = progress.percent_complete {
                bar.set_position(u64::from(percent));
            }
            bar.set_message(progress_message(progress));
        }
    }

    /// Clears the bar once the job has ended.
    pub(crate) fn finish(&self, outcome: &DownloadOutcome) {
        if outcome.is_completed() {
            self.bar.finish_and_clear();
        } else {
            self.bar.abandon();
        }
    }
}

/// `Downloaded: X MB / Y MB, Remaining: HH:MM:SS`, whole megabytes.
pub(crate) fn progress_message(progress: &DownloadProgress) -> String {
    let downloaded_mb = progress.downloaded_bytes / BYTES_PER_MB;
    match (progress.total_bytes.filter(|&t| t > 0), progress.eta_display()) {
        (Some(total), Some(eta)) => format!(
            "Downloaded: {downloaded_mb} MB / {} MB, Remaining: {eta}",
            total / BYTES_PER_MB
        ),
        (Some(total), None) => {
            format!("Downloaded: {downloaded_mb} MB / {} MB", total / BYTES_PER_MB)
        }
        (None, _) => format!("Downloaded: {downloaded_mb} MB"),
    }
}
