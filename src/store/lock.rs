use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::error::{ProtaskError, Result};

const FIRST_WAIT: Duration = Duration::from_millis(10);
const MAX_ATTEMPTS: u32 = 7;

/// Acquire an exclusive lock on a file, returning the locked File handle.
/// The lock is released when the File is dropped.
///
/// Contended locks are retried with exponential backoff (about one second in
/// total) before giving up with [`ProtaskError::Locked`].
pub fn acquire_lock(path: &Path) -> Result<File> {
    acquire_lock_with(path, MAX_ATTEMPTS)
}

fn acquire_lock_with(path: &Path, attempts: u32) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    let mut wait = FIRST_WAIT;
    for attempt in 1..=attempts {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(file),
            Err(err) => {
                tracing::debug!(path = %path.display(), attempt, error = %err, "store lock busy");
                if attempt < attempts {
                    thread::sleep(wait);
                    wait *= 2;
                }
            }
        }
    }

    tracing::warn!(path = %path.display(), "gave up waiting for store lock");
    Err(ProtaskError::Locked(path.display().to_string()))
}
