use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tracing::{debug, warn};

use super::super::DownloadError;
use super::super::filename::resolve_unique_path;

/// Attempts at exclusive creation before giving up on a racing directory.
const MAX_CREATE_ATTEMPTS: usize = 16;

/// Output file that is deleted unless the download completes.
///
/// Dropping the guard without [`keep`](Self::keep) removes the file, which
/// also covers the owning task being aborted mid-transfer.
#[derive(Debug)]
pub(super) struct PartialFile {
    path: PathBuf,
    armed: bool,
}

impl PartialFile {
    /// Creates a new file named after `filename` (or its first free `(n)` variant) in `dir`.
    pub(super) async fn create_unique(
        dir: &Path,
        filename: &str,
    ) -> Result<(Self, File), DownloadError> {
        let mut last_collision = None;
        for _ in 0..MAX_CREATE_ATTEMPTS {
            let path = resolve_unique_path(dir, filename);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => {
                    debug!(path = %path.display(), "created output file");
                    return Ok((Self { path, armed: true }, file));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "name taken during create, resolving again");
                    last_collision = Some((path, e));
                }
                Err(e) => return Err(DownloadError::io(path, e)),
            }
        }

        let (path, error) = last_collision.unwrap_or_else(|| {
            (
                dir.join(filename),
                std::io::Error::from(ErrorKind::AlreadyExists),
            )
        });
        Err(DownloadError::io(path, error))
    }

    pub(super) fn path(&self) -> &Path {
        &self.path
    }

    /// Disarms the guard and hands the finished path to the caller.
    pub(super) fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }

    /// Deletes the file now. A file that is already gone is not an error.
    pub(super) async fn discard(mut self) {
        self.armed = false;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "removed partial file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove partial file"),
        }
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.armed {
            debug!(path = %self.path.display(), "removing partial file left by an unfinished download");
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
