//! Thread liveness.
//!
//! A running trading loop holds `<thread_id>.lock` in its working directory. A thread
//! recorded in the store whose lock file is missing has been abandoned and can be
//! adopted by a new process.

use crate::db::invoker::RowCursor;
use crate::error::{StoreError, StoreResult};
use crate::models::ThreadIdentity;
use futures_util::Stream;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Decides whether a thread is still owned by a live process.
pub trait LivenessProbe: std::fmt::Debug + Send + Sync {
    fn is_claimed(&self, thread_id: &str) -> bool;
}

/// Checks for `<dir>/<thread_id>.lock`.
#[derive(Debug, Clone)]
pub struct LockFileProbe {
    dir: PathBuf,
}

impl LockFileProbe {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn lock_path(&self, thread_id: &str) -> PathBuf {
        lock_path(&self.dir, thread_id)
    }
}

impl LivenessProbe for LockFileProbe {
    fn is_claimed(&self, thread_id: &str) -> bool {
        // Any stat failure counts as absent
        std::fs::metadata(self.lock_path(thread_id)).is_ok()
    }
}

fn lock_path(dir: &Path, thread_id: &str) -> PathBuf {
    dir.join(format!("{thread_id}.lock"))
}

/// Lock file held by a running loop. Removed when dropped.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Create `<dir>/<thread_id>.lock`, failing if another process holds it.
    pub fn claim(dir: impl AsRef<Path>, thread_id: &str) -> StoreResult<Self> {
        let path = lock_path(dir.as_ref(), thread_id);
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| StoreError::lock_file(path.display().to_string(), e))?;

        debug!(path = %path.display(), "Lock file claimed");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove lock file");
        }
    }
}

/// Scan recorded threads and return the first one nobody holds.
///
/// Scanning stops at the first unclaimed row and the rest of the cursor is released
/// unread. Claimed rows are skipped; when every row is claimed the result is an empty
/// identity. A row that fails to decode stops the scan with an error.
pub async fn first_unclaimed<S, R, F>(
    mut cursor: RowCursor<S>,
    mut decode: F,
    probe: &dyn LivenessProbe,
) -> StoreResult<ThreadIdentity>
where
    S: Stream<Item = Result<R, sqlx::Error>> + Unpin,
    F: FnMut(&R) -> Result<ThreadIdentity, sqlx::Error>,
{
    let procedure = cursor.procedure();

    while let Some(row) = cursor.next_row().await {
        let row = row.map_err(|e| StoreError::query(procedure, e))?;
        let identity = decode(&row).map_err(|e| StoreError::decode(procedure, e))?;

        if !probe.is_claimed(&identity.thread_id) {
            debug!(thread_id = %identity.thread_id, "Found unclaimed thread");
            return Ok(identity);
        }
    }

    Ok(ThreadIdentity::default())
}
