//! Snapshot persistence error types
//!
//! Error codes:
//! - SNAPSHOT_LOCK_CONTENDED: another writer holds the lock
//! - SNAPSHOT_LOCK_IO: the lock artifact could not be opened or locked
//! - SNAPSHOT_IO: temp write, fsync or rename failed
//! - SNAPSHOT_BACKUP: the pre-write backup failed
//! - SNAPSHOT_DECODE: the stored snapshot could not be parsed or encoded

use std::fmt;
use std::io;
use std::path::Path;

use crate::dataset::DatasetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotErrorCode {
    LockContended,
    LockIo,
    Io,
    Backup,
    Decode,
}

impl SnapshotErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            SnapshotErrorCode::LockContended => "SNAPSHOT_LOCK_CONTENDED",
            SnapshotErrorCode::LockIo => "SNAPSHOT_LOCK_IO",
            SnapshotErrorCode::Io => "SNAPSHOT_IO",
            SnapshotErrorCode::Backup => "SNAPSHOT_BACKUP",
            SnapshotErrorCode::Decode => "SNAPSHOT_DECODE",
        }
    }
}

impl fmt::Display for SnapshotErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Snapshot error with code, message and optional cause.
#[derive(Debug)]
pub struct SnapshotError {
    code: SnapshotErrorCode,
    message: String,
    details: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl SnapshotError {
    fn new(code: SnapshotErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Another process holds the lock on `lock_path`.
    pub fn lock_contended(lock_path: &Path) -> Self {
        Self::new(
            SnapshotErrorCode::LockContended,
            format!("lock already held: {}", lock_path.display()),
        )
    }

    pub fn lock_io(lock_path: &Path, source: io::Error) -> Self {
        Self::new(
            SnapshotErrorCode::LockIo,
            format!("failed to lock {}", lock_path.display()),
        )
        .with_source(source)
    }

    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(SnapshotErrorCode::Io, message).with_source(source)
    }

    pub fn io_error_at_path(path: &Path, source: io::Error) -> Self {
        Self::io_error(format!("I/O error at path: {}", path.display()), source)
    }

    pub fn backup_failed(message: impl Into<String>) -> Self {
        Self::new(SnapshotErrorCode::Backup, message)
    }

    pub fn backup_io(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(SnapshotErrorCode::Backup, message).with_source(source)
    }

    pub fn decode(path: &Path, source: DatasetError) -> Self {
        Self::new(
            SnapshotErrorCode::Decode,
            format!("cannot decode snapshot {}", path.display()),
        )
        .with_source(source)
    }

    pub fn encode(source: DatasetError) -> Self {
        Self::new(SnapshotErrorCode::Decode, "cannot encode snapshot").with_source(source)
    }

    /// Add details to an error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn code(&self) -> SnapshotErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn is_contention(&self) -> bool {
        self.code == SnapshotErrorCode::LockContended
    }
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.code.code(), self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        if let Some(ref source) = self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

pub type SnapshotResult<T> = Result<T, SnapshotError>;
