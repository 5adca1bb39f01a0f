//! Pre-write backups
//!
//! Before a snapshot is replaced, its current bytes are copied to
//! `<dir>/backups/<file>.<YYYYMMDD_HHMMSS>.bak`. The copy is fsynced and its
//! CRC32 compared with the source before it counts as written.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::fault_point::{self, points};

use super::checksum::{compute_file_checksum, format_checksum};
use super::errors::{SnapshotError, SnapshotResult};
use super::fsync_dir;

pub const BACKUP_DIR: &str = "backups";

/// A verified backup copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    pub path: PathBuf,
    pub bytes: u64,
    pub checksum: u32,
}

impl BackupRecord {
    pub fn checksum_string(&self) -> String {
        format_checksum(self.checksum)
    }
}

/// Directory holding backups of `snapshot`.
pub fn backup_dir_for(snapshot: &Path) -> PathBuf {
    snapshot
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(BACKUP_DIR)
}

fn backup_name(snapshot: &Path, at: DateTime<Utc>, attempt: u32) -> String {
    let file = snapshot
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    let stamp = at.format("%Y%m%d_%H%M%S");
    if attempt == 0 {
        format!("{}.{}.bak", file, stamp)
    } else {
        format!("{}.{}-{}.bak", file, stamp, attempt)
    }
}

/// Open a fresh backup file, never overwriting an earlier backup taken in
/// the same second.
fn create_backup_file(dir: &Path, snapshot: &Path, at: DateTime<Utc>) -> SnapshotResult<(PathBuf, File)> {
    let mut attempt = 0;
    loop {
        let path = dir.join(backup_name(snapshot, at, attempt));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempt < 1000 => attempt += 1,
            Err(e) => {
                return Err(SnapshotError::backup_io(
                    format!("cannot create backup file {}", path.display()),
                    e,
                ))
            }
        }
    }
}

fn copy_with_fsync(src: &Path, dst: &mut File, dst_path: &Path) -> SnapshotResult<u64> {
    let mut src_file = File::open(src).map_err(|e| {
        SnapshotError::backup_io(format!("cannot open snapshot {}", src.display()), e)
    })?;

    let mut buffer = [0u8; 8192];
    let mut total = 0u64;
    loop {
        let n = src_file.read(&mut buffer).map_err(|e| {
            SnapshotError::backup_io(format!("read failed: {}", src.display()), e)
        })?;
        if n == 0 {
            break;
        }
        dst.write_all(&buffer[..n]).map_err(|e| {
            SnapshotError::backup_io(format!("write failed: {}", dst_path.display()), e)
        })?;
        total += n as u64;
    }

    dst.sync_all().map_err(|e| {
        SnapshotError::backup_io(format!("fsync failed: {}", dst_path.display()), e)
    })?;
    Ok(total)
}

/// Copy `snapshot` into its backup directory and verify the copy.
///
/// On failure the partial backup file is removed. The snapshot itself is
/// only ever read.
pub fn write_backup(snapshot: &Path, at: DateTime<Utc>) -> SnapshotResult<BackupRecord> {
    fault_point::check(points::BACKUP_COPY)
        .map_err(|e| SnapshotError::backup_io("backup copy aborted", e))?;

    let dir = backup_dir_for(snapshot);
    fs::create_dir_all(&dir).map_err(|e| {
        SnapshotError::backup_io(format!("cannot create {}", dir.display()), e)
    })?;

    let (path, mut file) = create_backup_file(&dir, snapshot, at)?;

    let result = copy_with_fsync(snapshot, &mut file, &path).and_then(|bytes| {
        drop(file);
        let expected = compute_file_checksum(snapshot)?;
        let actual = compute_file_checksum(&path)?;
        if expected != actual {
            return Err(SnapshotError::backup_failed(format!(
                "backup checksum mismatch: expected {}, got {}",
                format_checksum(expected),
                format_checksum(actual)
            )));
        }
        fsync_dir(&dir)?;
        Ok(BackupRecord {
            path: path.clone(),
            bytes,
            checksum: actual,
        })
    });

    if result.is_err() {
        let _ = fs::remove_file(&path);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    #[test]
    fn test_backup_name_format() {
        let name = backup_name(Path::new("/data/countries.jsonl"), fixed_time(), 0);
        assert_eq!(name, "countries.jsonl.20260314_092653.bak");
        let name = backup_name(Path::new("/data/countries.jsonl"), fixed_time(), 2);
        assert_eq!(name, "countries.jsonl.20260314_092653-2.bak");
    }

    #[test]
    fn test_backup_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let snapshot = dir.path().join("countries.jsonl");
        fs::write(&snapshot, b"{\"iso_alpha2\":\"FR\"}\n").unwrap();

        let record = write_backup(&snapshot, fixed_time()).unwrap();
        assert!(record.path.starts_with(dir.path().join(BACKUP_DIR)));
        assert_eq!(fs::read(&record.path).unwrap(), fs::read(&snapshot).unwrap());
        assert_eq!(record.bytes, 20);
        assert!(record.checksum_string().starts_with("crc32:"));
    }

    #[test]
    fn test_same_second_backups_do_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let snapshot = dir.path().join("countries.jsonl");
        fs::write(&snapshot, b"one\n").unwrap();
        let first = write_backup(&snapshot, fixed_time()).unwrap();

        fs::write(&snapshot, b"two\n").unwrap();
        let second = write_backup(&snapshot, fixed_time()).unwrap();

        assert_ne!(first.path, second.path);
        assert_eq!(fs::read(&first.path).unwrap(), b"one\n");
        assert_eq!(fs::read(&second.path).unwrap(), b"two\n");
    }

    #[test]
    fn test_missing_snapshot_leaves_no_partial_backup() {
        let dir = TempDir::new().unwrap();
        let snapshot = dir.path().join("countries.jsonl");

        assert!(write_backup(&snapshot, fixed_time()).is_err());
        let leftovers = fs::read_dir(dir.path().join(BACKUP_DIR)).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_injected_fault_fails_backup() {
        let dir = TempDir::new().unwrap();
        let snapshot = dir.path().join("countries.jsonl");
        fs::write(&snapshot, b"x\n").unwrap();

        fault_point::arm(points::BACKUP_COPY);
        let err = write_backup(&snapshot, fixed_time()).unwrap_err();
        fault_point::disarm();

        assert_eq!(err.code().code(), "SNAPSHOT_BACKUP");
        assert!(!backup_dir_for(&snapshot).exists());
    }
}
