//! Scoped advisory file locks with a bounded wait.

use std::fs::File;
use std::io;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::logging::{trace, warn};

use super::error::BackendError;
use super::key::Key;

/// Default upper bound on a lock wait.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Default delay between lock attempts while contended.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Lock flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Many holders, excludes exclusive holders.
    Shared,
    /// One holder, excludes everyone else.
    Exclusive,
}

impl LockMode {
    fn as_str(self) -> &'static str {
        match self {
            LockMode::Shared => "shared",
            LockMode::Exclusive => "exclusive",
        }
    }
}

/// How long to wait for a contended lock, and how often to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_LOCK_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// A held lock. Released when dropped.
#[derive(Debug)]
pub(crate) struct FileLock {
    file: File,
    #[cfg_attr(not(feature = "logging"), allow(dead_code))]
    mode: LockMode,
}

impl FileLock {
    /// Lock `file`, retrying non-blocking attempts until `options.timeout`.
    pub(crate) fn acquire(
        file: File,
        path: &Path,
        key: &Key,
        mode: LockMode,
        options: &LockOptions,
    ) -> Result<Self, BackendError> {
        let started = Instant::now();

        loop {
            // Fully qualified: std::fs::File has inherent lock methods with other signatures.
            let attempt = match mode {
                LockMode::Shared => FileExt::try_lock_shared(&file),
                LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
            };

            match attempt {
                Ok(()) => return Ok(Self { file, mode }),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if is_contended(&e) => {
                    let waited = started.elapsed();
                    if waited >= options.timeout {
                        warn!(
                            key = %key,
                            mode = mode.as_str(),
                            waited_ms = waited.as_millis() as u64,
                            "lock wait timed out"
                        );
                        return Err(BackendError::LockTimeout {
                            key: key.to_string(),
                            mode: mode.as_str(),
                            waited,
                        });
                    }
                    trace!(key = %key, mode = mode.as_str(), "lock contended, retrying");
                    let remaining = options.timeout.saturating_sub(waited);
                    thread::sleep(options.poll_interval.min(remaining));
                }
                Err(e) => return Err(BackendError::io(path, e)),
            }
        }
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Closing the descriptor releases the lock as well.
        let _ = FileExt::unlock(&self.file);
        trace!(mode = self.mode.as_str(), "lock released");
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
