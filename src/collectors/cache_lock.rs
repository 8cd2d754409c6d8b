use crate::Result;
use fs4::fs_std::FileExt;
use ohno::IntoAppError;
use std::fs::{self, File, OpenOptions};
use std::path::Path;

const LOG_TARGET: &str = "      lock";

/// Guard that releases an advisory file lock when dropped
#[derive(Debug)]
pub struct FileLockGuard(File);

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        // Closing the file releases the lock as well, this just makes it explicit
        if let Err(e) = self.0.unlock() {
            log::warn!(target: LOG_TARGET, "Failed to release file lock: {e}");
        }
    }
}

/// Block until an exclusive advisory lock on `lock_path` is held
///
/// The lock file is created if needed. Other processes using the same lock file are serialized
/// against the holder of the returned guard.
pub fn acquire_file_lock(lock_path: &Path) -> Result<FileLockGuard> {
    if let Some(parent) = lock_path.parent() {
        fs::create_dir_all(parent).into_app_err_with(|| format!("unable to create directory '{}'", parent.display()))?;
    }

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .into_app_err_with(|| format!("Failed to open lock file at '{}'", lock_path.display()))?;

    file.lock_exclusive()
        .into_app_err_with(|| format!("Failed to acquire exclusive lock at '{}'", lock_path.display()))?;
    log::trace!(target: LOG_TARGET, "Acquired lock at '{}'", lock_path.display());

    Ok(FileLockGuard(file))
}
