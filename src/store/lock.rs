//! Cross-process exclusion for baseline files.
//!
//! The data file is replaced by rename on every commit, so the advisory lock lives
//! on a sidecar `<path>.lock` file that is never renamed or removed.

use std::{
    ffi::OsString,
    fs::{File, OpenOptions, TryLockError},
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use rand::Rng;
use tracing::{debug, trace};

use super::constants::LOCK_FILE_SUFFIX;
use crate::errors::StorageError;

const INITIAL_BACKOFF: Duration = Duration::from_millis(1);
const MAX_BACKOFF: Duration = Duration::from_millis(50);

/// Exclusive advisory lock on a baseline file, released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Acquire the lock guarding `store_path`, waiting at most `timeout`.
    pub fn acquire(store_path: &Path, timeout: Duration) -> Result<Self, StorageError> {
        let path = lock_path(store_path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| StorageError::io(&path, e))?;

        let started = Instant::now();
        let mut backoff = INITIAL_BACKOFF;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match file.try_lock() {
                Ok(()) => {
                    debug!(
                        lock = %path.display(),
                        attempts,
                        waited_us = started.elapsed().as_micros() as u64,
                        "acquired baseline lock"
                    );
                    return Ok(Self { file, path });
                }
                Err(TryLockError::WouldBlock) => {}
                Err(TryLockError::Error(e)) => return Err(StorageError::io(&path, e)),
            }

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(StorageError::LockTimeout { path, waited });
            }
            let jitter = rand::thread_rng().gen_range(0..=backoff.as_micros() as u64 / 2);
            let pause = (backoff + Duration::from_micros(jitter)).min(timeout - waited);
            trace!(lock = %path.display(), ?pause, "baseline lock busy");
            thread::sleep(pause);
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // Closing the handle releases the lock as well.
        let _ = self.file.unlock();
    }
}

/// Sidecar lock file for a store path
pub fn lock_path(store_path: &Path) -> PathBuf {
    let mut name = OsString::from(store_path.as_os_str());
    name.push(LOCK_FILE_SUFFIX);
    PathBuf::from(name)
}
