//! Background download jobs and the handles that cancel them.
//!
//! [`spawn_download`] runs a [`DownloadEngine`] on a tokio task and returns a
//! [`DownloadHandle`] owning the job's cancel flag. A [`DownloadSlot`] keeps
//! at most one job active and lets a separate control path (a signal
//! handler, a UI button) cancel it without any process-wide state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::engine::{DownloadEngine, DownloadOutcome, DownloadRequest};
use super::error::DownloadError;
use super::progress::DownloadProgress;

/// Cancellation flag shared between a running job and whoever may cancel it.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. The job observes it before writing its next chunk.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// State shared by a job's handle, its task, and the slot that launched it.
#[derive(Debug, Default)]
struct JobState {
    cancel: CancelFlag,
    finished: AtomicBool,
}

/// Marks its job finished when dropped, whether the task returned,
/// panicked, or was aborted before its first poll.
struct FinishOnDrop(Arc<JobState>);

impl Drop for FinishOnDrop {
    fn drop(&mut self) {
        self.0.finished.store(true, Ordering::SeqCst);
    }
}

/// Handle to a download running on a background task.
#[derive(Debug)]
pub struct DownloadHandle {
    state: Arc<JobState>,
    task: JoinHandle<DownloadOutcome>,
}

impl DownloadHandle {
    /// Requests cancellation of the job.
    pub fn cancel(&self) {
        debug!("cancellation requested through handle");
        self.state.cancel.cancel();
    }

    /// A clone of the job's cancel flag, for use from another thread or task.
    #[must_use]
    pub fn cancel_flag(&self) -> CancelFlag {
        self.state.cancel.clone()
    }

    /// Whether the engine has returned.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.finished.load(Ordering::SeqCst) || self.task.is_finished()
    }

    /// Waits for the job and returns its outcome.
    ///
    /// A task that panicked or was aborted is reported as
    /// [`DownloadError::Task`]; its partial file is removed when the engine's
    /// state is dropped.
    pub async fn wait(self) -> DownloadOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                warn!(error = %join_error, "download task did not complete");
                DownloadOutcome::Failed(DownloadError::task(join_error.to_string()))
            }
        }
    }
}

/// Runs `request` on a new tokio task, polling the returned handle's cancel flag.
///
/// Must be called from within a tokio runtime.
pub fn spawn_download<P>(
    engine: DownloadEngine,
    request: DownloadRequest,
    on_progress: P,
) -> DownloadHandle
where
    P: FnMut(&DownloadProgress) + Send + 'static,
{
    spawn_with_state(engine, request, on_progress, Arc::new(JobState::default()))
}

fn spawn_with_state<P>(
    engine: DownloadEngine,
    request: DownloadRequest,
    on_progress: P,
    state: Arc<JobState>,
) -> DownloadHandle
where
    P: FnMut(&DownloadProgress) + Send + 'static,
{
    let cancel = state.cancel.clone();
    let finish_guard = FinishOnDrop(Arc::clone(&state));
    let task = tokio::spawn(async move {
        let _finish_guard = finish_guard;
        engine
            .run(request, on_progress, move || cancel.is_cancelled())
            .await
    });
    DownloadHandle { state, task }
}

/// Errors from [`DownloadSlot::try_launch`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LaunchError {
    /// A previously launched download has not finished yet.
    #[error("a download is already in progress; wait for it to finish")]
    AlreadyRunning,
}

/// Holder of the single active download.
///
/// A second launch while the first is unfinished is rejected rather than
/// queued. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct DownloadSlot {
    active: Arc<Mutex<Option<Arc<JobState>>>>,
}

impl DownloadSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Launches `request` unless another job from this slot is still running.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::AlreadyRunning`] while the previous job is unfinished.
    pub fn try_launch<P>(
        &self,
        engine: DownloadEngine,
        request: DownloadRequest,
        on_progress: P,
    ) -> Result<DownloadHandle, LaunchError>
    where
        P: FnMut(&DownloadProgress) + Send + 'static,
    {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active
            .as_ref()
            .is_some_and(|state| !state.finished.load(Ordering::SeqCst))
        {
            info!(url = %request.url(), "rejecting download: another one is in progress");
            return Err(LaunchError::AlreadyRunning);
        }

        let state = Arc::new(JobState::default());
        *active = Some(Arc::clone(&state));
        Ok(spawn_with_state(engine, request, on_progress, state))
    }

    /// Whether a job launched from this slot is still running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|state| !state.finished.load(Ordering::SeqCst))
    }

    /// Cancels the running job, if any. Returns whether one was signalled.
    pub fn cancel_active(&self) -> bool {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        match active.as_ref() {
            Some(state) if !state.finished.load(Ordering::SeqCst) => {
                state.cancel.cancel();
                true
            }
            _ => false,
        }
    }
}
