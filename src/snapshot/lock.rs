//! Exclusive advisory lock on a snapshot
//!
//! The lock lives on a sidecar `<snapshot>.lock` file rather than the
//! snapshot itself, because the snapshot is replaced by rename on every
//! commit and a lock on the old inode would not exclude the next writer.
//!
//! The OS releases a `flock(2)` lock when its descriptor closes, so a
//! crashed holder never leaves the lock stuck.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use serde::{Deserialize, Serialize};

use crate::observability::{log_event_with_fields, Event, Logger};

use super::errors::{SnapshotError, SnapshotResult};

/// How to behave when another process holds the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Wait until the holder releases it.
    #[default]
    Blocking,
    /// Fail immediately with `SNAPSHOT_LOCK_CONTENDED`.
    NonBlocking,
}

impl LockMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockMode::Blocking => "blocking",
            LockMode::NonBlocking => "non_blocking",
        }
    }

    fn flock_arg(&self) -> FlockArg {
        match self {
            LockMode::Blocking => FlockArg::LockExclusive,
            LockMode::NonBlocking => FlockArg::LockExclusiveNonblock,
        }
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blocking" => Ok(LockMode::Blocking),
            "non_blocking" | "nonblocking" | "non-blocking" => Ok(LockMode::NonBlocking),
            other => Err(format!("unknown lock mode: {}", other)),
        }
    }
}

/// Sidecar lock path for a snapshot: `<snapshot>.lock`.
pub fn lock_path_for(snapshot: &Path) -> PathBuf {
    let mut name = snapshot
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    snapshot.with_file_name(name)
}

/// Held exclusive lock. Released when dropped.
pub struct SnapshotLock {
    _guard: Flock<File>,
    path: PathBuf,
    logger: Logger,
}

impl SnapshotLock {
    /// Acquire the lock at `lock_path`, creating the file if needed.
    pub(crate) fn acquire(lock_path: &Path, mode: LockMode, logger: &Logger) -> SnapshotResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)
            .map_err(|e| SnapshotError::lock_io(lock_path, e))?;

        let path_str = lock_path.display().to_string();

        let guard = match Flock::lock(file, mode.flock_arg()) {
            Ok(guard) => guard,
            Err((_, Errno::EWOULDBLOCK)) => {
                log_event_with_fields(logger, Event::LockContended, &[("path", path_str.as_str())]);
                return Err(SnapshotError::lock_contended(lock_path));
            }
            Err((_, errno)) => {
                return Err(SnapshotError::lock_io(lock_path, io::Error::from(errno)));
            }
        };

        log_event_with_fields(
            logger,
            Event::LockAcquired,
            &[("mode", mode.as_str()), ("path", path_str.as_str())],
        );

        Ok(Self {
            _guard: guard,
            path: lock_path.to_path_buf(),
            logger: logger.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for SnapshotLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotLock").field("path", &self.path).finish()
    }
}

impl Drop for SnapshotLock {
    fn drop(&mut self) {
        let path_str = self.path.display().to_string();
        log_event_with_fields(&self.logger, Event::LockReleased, &[("path", path_str.as_str())]);
    }
}
