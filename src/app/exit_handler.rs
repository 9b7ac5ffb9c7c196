//! Exit code logic for the grabfile process.
//!
//! Single responsibility: map the download outcome to the process exit outcome.

use grabfile_core::DownloadOutcome;

use crate::ProcessExit;

/// Determines the process exit outcome from the job's terminal state.
pub(crate) fn determine_exit_outcome(outcome: &DownloadOutcome) -> ProcessExit {
    match outcome {
        DownloadOutcome::Completed(_) => ProcessExit::Success,
        DownloadOutcome::Cancelled => ProcessExit::Cancelled,
        DownloadOutcome::Failed(_) => ProcessExit::Failure,
    }
}
