//! Snapshot persistence
//!
//! A snapshot is the committed JSONL record set plus its on-disk companions:
//!
//! - `<file>.lock`            advisory lock sidecar
//! - `backups/<file>.<ts>.bak` verified copies taken before each replace
//! - `.changes_summary.txt`   summary of the last committed change
//!
//! # Guarantees
//!
//! - Single writer: mutating calls take a `&SnapshotLock`, so they cannot be
//!   made without holding the lock
//! - Atomic replace: temp file, fsync, rename, directory fsync
//! - A failed directory fsync after the rename is logged as
//!   `DIR_SYNC_FAILED`, not returned: the new content is already in place
//! - Zero partial success: a failed write leaves the target byte-identical
//!   and no temp file behind

mod atomic;
mod backup;
mod checksum;
mod errors;
mod lock;

pub use atomic::{is_temp_artifact_of, temp_path_for};
pub use backup::{backup_dir_for, BackupRecord, BACKUP_DIR};
pub use checksum::{compute_checksum, compute_file_checksum, format_checksum};
pub use errors::{SnapshotError, SnapshotErrorCode, SnapshotResult};
pub use lock::{lock_path_for, LockMode, SnapshotLock};

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::dataset::{encode_jsonl, read_jsonl, Record};
use crate::observability::{log_event_with_fields, Event, Logger, ObservationScope};

/// Default name of the change-summary file, next to the snapshot.
pub const CHANGES_FILE_NAME: &str = ".changes_summary.txt";

/// fsync a directory so a rename or create inside it is durable.
pub(crate) fn fsync_dir(path: &Path) -> SnapshotResult<()> {
    let dir = OpenOptions::new()
        .read(true)
        .open(path)
        .map_err(|e| SnapshotError::io_error_at_path(path, e))?;

    dir.sync_all().map_err(|e| {
        SnapshotError::io_error(format!("fsync directory failed: {}", path.display()), e)
    })
}

/// Durable store for one snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    snapshot_path: PathBuf,
    lock_path: PathBuf,
    changes_path: PathBuf,
    logger: Logger,
}

impl SnapshotStore {
    pub fn new(snapshot_path: impl Into<PathBuf>, logger: Logger) -> Self {
        let snapshot_path = snapshot_path.into();
        let lock_path = lock_path_for(&snapshot_path);
        let changes_path = snapshot_path.with_file_name(CHANGES_FILE_NAME);
        Self {
            snapshot_path,
            lock_path,
            changes_path,
            logger,
        }
    }

    /// Write change summaries to `path` instead of the default location.
    pub fn with_changes_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.changes_path = path.into();
        self
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn changes_path(&self) -> &Path {
        &self.changes_path
    }

    pub fn exists(&self) -> bool {
        self.snapshot_path.is_file()
    }

    /// Take the exclusive writer lock.
    pub fn lock(&self, mode: LockMode) -> SnapshotResult<SnapshotLock> {
        SnapshotLock::acquire(&self.lock_path, mode, &self.logger)
    }

    /// Copy the current snapshot into `backups/`. Returns `None` when there
    /// is no snapshot yet.
    pub fn backup(&self, _lock: &SnapshotLock) -> SnapshotResult<Option<BackupRecord>> {
        if !self.exists() {
            return Ok(None);
        }

        match backup::write_backup(&self.snapshot_path, Utc::now()) {
            Ok(record) => {
                let path_str = record.path.display().to_string();
                let bytes_str = record.bytes.to_string();
                let checksum = record.checksum_string();
                log_event_with_fields(
                    &self.logger,
                    Event::BackupWritten,
                    &[
                        ("bytes", bytes_str.as_str()),
                        ("checksum", checksum.as_str()),
                        ("path", path_str.as_str()),
                    ],
                );
                Ok(Some(record))
            }
            Err(e) => {
                let reason = e.to_string();
                self.logger
                    .warn(Event::BackupFailed.as_str(), &[("reason", reason.as_str())]);
                Err(e)
            }
        }
    }

    /// Read the committed snapshot. `None` when it does not exist.
    pub fn load(&self) -> SnapshotResult<Option<Vec<Record>>> {
        if !self.exists() {
            return Ok(None);
        }
        read_jsonl(&self.snapshot_path)
            .map(Some)
            .map_err(|e| SnapshotError::decode(&self.snapshot_path, e))
    }

    /// Atomically replace the snapshot with `records`.
    pub fn commit(&self, _lock: &SnapshotLock, records: &[Record]) -> SnapshotResult<()> {
        let contents = encode_jsonl(records).map_err(SnapshotError::encode)?;
        let records_str = records.len().to_string();
        let bytes_str = contents.len().to_string();

        let scope = ObservationScope::with_fields(
            &self.logger,
            "SNAPSHOT_COMMIT",
            &[("records", records_str.as_str())],
        );

        match atomic::write_atomic(&self.snapshot_path, &contents) {
            Ok(()) => {
                self.sync_parent(&self.snapshot_path);
                let checksum = format_checksum(compute_checksum(&contents));
                scope.complete_with_fields(&[
                    ("bytes", bytes_str.as_str()),
                    ("checksum", checksum.as_str()),
                ]);
                Ok(())
            }
            Err(e) => {
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    /// Atomically replace the change-summary file with `text`.
    pub fn write_summary(&self, _lock: &SnapshotLock, text: &str) -> SnapshotResult<()> {
        atomic::write_atomic(&self.changes_path, text.as_bytes())?;
        self.sync_parent(&self.changes_path);
        Ok(())
    }

    fn sync_parent(&self, target: &Path) {
        if let Err(e) = atomic::sync_parent(target) {
            let path_str = target.display().to_string();
            let reason = e.to_string();
            self.logger.warn(
                Event::DirSyncFailed.as_str(),
                &[("path", path_str.as_str()), ("reason", reason.as_str())],
            );
        }
    }

    /// Remove temp files left by interrupted writes to the snapshot or the
    /// summary file. Returns how many were removed.
    pub fn cleanup_temp_artifacts(&self) -> SnapshotResult<usize> {
        let mut removed = atomic::remove_temp_artifacts(&self.snapshot_path)?;
        removed.extend(atomic::remove_temp_artifacts(&self.changes_path)?);

        for path in &removed {
            let path_str = path.display().to_string();
            self.logger
                .warn(Event::TempArtifactRemoved.as_str(), &[("path", path_str.as_str())]);
        }
        Ok(removed.len())
    }
}
