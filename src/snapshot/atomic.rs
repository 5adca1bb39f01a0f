//! Atomic file replacement
//!
//! Content is written to `.<file>.<uuid>.tmp` in the target's directory,
//! fsynced, then renamed over the target. A reader sees either the old
//! bytes or the new bytes, never a mix. Until the rename succeeds the
//! target is untouched, and the temp file is removed on any failure.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::fault_point::{self, points};

use super::errors::{SnapshotError, SnapshotResult};
use super::fsync_dir;

const TEMP_SUFFIX: &str = ".tmp";

fn file_name_of(target: &Path) -> String {
    target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn parent_of(target: &Path) -> &Path {
    match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Temp path for one write to `target`.
pub fn temp_path_for(target: &Path) -> PathBuf {
    let name = format!(".{}.{}{}", file_name_of(target), Uuid::new_v4(), TEMP_SUFFIX);
    parent_of(target).join(name)
}

/// Whether `name` is a temp artifact left by a write to `target`.
pub fn is_temp_artifact_of(target: &Path, name: &str) -> bool {
    let prefix = format!(".{}.", file_name_of(target));
    name.len() > prefix.len() + TEMP_SUFFIX.len()
        && name.starts_with(&prefix)
        && name.ends_with(TEMP_SUFFIX)
}

fn write_temp(temp: &Path, contents: &[u8]) -> SnapshotResult<()> {
    let mut file: File = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp)
        .map_err(|e| SnapshotError::io_error_at_path(temp, e))?;

    fault_point::check(points::SNAPSHOT_TEMP_CREATE)
        .map_err(|e| SnapshotError::io_error("temp file creation interrupted", e))?;

    file.write_all(contents)
        .map_err(|e| SnapshotError::io_error(format!("write failed: {}", temp.display()), e))?;

    fault_point::check(points::SNAPSHOT_TEMP_WRITE)
        .map_err(|e| SnapshotError::io_error("temp file write interrupted", e))?;

    file.sync_all()
        .map_err(|e| SnapshotError::io_error(format!("fsync failed: {}", temp.display()), e))
}

/// Replace `target` with `contents` atomically. The rename is not yet
/// durable on return; follow with `sync_parent`.
pub fn write_atomic(target: &Path, contents: &[u8]) -> SnapshotResult<()> {
    let temp = temp_path_for(target);

    let result = write_temp(&temp, contents)
        .and_then(|()| {
            fault_point::check(points::SNAPSHOT_BEFORE_RENAME)
                .map_err(|e| SnapshotError::io_error("rename interrupted", e))
        })
        .and_then(|()| {
            fs::rename(&temp, target).map_err(|e| {
                SnapshotError::io_error(format!("rename failed: {}", target.display()), e)
                    .with_details(format!("temp {}", temp.display()))
            })
        });

    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

/// fsync the directory holding `target` so its last rename survives a crash.
pub fn sync_parent(target: &Path) -> SnapshotResult<()> {
    fault_point::check(points::SNAPSHOT_DIR_SYNC)
        .map_err(|e| SnapshotError::io_error("directory fsync interrupted", e))?;
    fsync_dir(parent_of(target))
}

/// Remove temp artifacts left by interrupted writes to `target`. Returns
/// the removed paths.
pub fn remove_temp_artifacts(target: &Path) -> SnapshotResult<Vec<PathBuf>> {
    let dir = parent_of(target);
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|e| SnapshotError::io_error_at_path(dir, e))?;
    let mut removed = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| SnapshotError::io_error_at_path(dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !is_temp_artifact_of(target, name) {
            continue;
        }

        let path = entry.path();
        match fs::remove_file(&path) {
            Ok(()) => removed.push(path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(SnapshotError::io_error_at_path(&path, e)),
        }
    }

    removed.sort();
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dir_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_temp_path_shape() {
        let target = Path::new("/data/countries.jsonl");
        let temp = temp_path_for(target);
        assert_eq!(temp.parent(), Some(Path::new("/data")));
        let name = temp.file_name().unwrap().to_str().unwrap();
        assert!(is_temp_artifact_of(target, name));
        assert_ne!(temp_path_for(target), temp);
    }

    #[test]
    fn test_is_temp_artifact_of() {
        let target = Path::new("countries.jsonl");
        assert!(is_temp_artifact_of(target, ".countries.jsonl.abc.tmp"));
        assert!(!is_temp_artifact_of(target, "countries.jsonl"));
        assert!(!is_temp_artifact_of(target, ".countries.jsonl.tmp"));
        assert!(!is_temp_artifact_of(target, ".other.jsonl.abc.tmp"));
    }

    #[test]
    fn test_write_atomic_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("countries.jsonl");

        write_atomic(&target, b"first\n").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"first\n");

        write_atomic(&target, b"second\n").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"second\n");
        assert_eq!(dir_names(dir.path()), vec!["countries.jsonl"]);
    }

    #[test]
    fn test_failed_write_leaves_target_and_no_temp() {
        for point in [
            points::SNAPSHOT_TEMP_CREATE,
            points::SNAPSHOT_TEMP_WRITE,
            points::SNAPSHOT_BEFORE_RENAME,
        ] {
            let dir = TempDir::new().unwrap();
            let target = dir.path().join("countries.jsonl");
            fs::write(&target, b"original\n").unwrap();

            fault_point::arm(point);
            let result = write_atomic(&target, b"replacement\n");
            fault_point::disarm();

            assert!(result.is_err(), "{} should fail", point);
            assert_eq!(fs::read(&target).unwrap(), b"original\n");
            assert_eq!(dir_names(dir.path()), vec!["countries.jsonl"]);
        }
    }

    #[test]
    fn test_sync_parent() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("countries.jsonl");
        write_atomic(&target, b"rows\n").unwrap();
        assert!(sync_parent(&target).is_ok());

        fault_point::arm(points::SNAPSHOT_DIR_SYNC);
        assert!(sync_parent(&target).is_err());
        fault_point::disarm();
        assert_eq!(fs::read(&target).unwrap(), b"rows\n");
    }

    #[test]
    fn test_remove_temp_artifacts() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("countries.jsonl");
        fs::write(&target, b"keep\n").unwrap();
        fs::write(dir.path().join(".countries.jsonl.1234.tmp"), b"stale").unwrap();
        fs::write(dir.path().join("unrelated.tmp"), b"keep").unwrap();

        let removed = remove_temp_artifacts(&target).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(dir_names(dir.path()), vec!["countries.jsonl", "unrelated.tmp"]);
    }

    #[test]
    fn test_remove_temp_artifacts_missing_dir() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("absent").join("countries.jsonl");
        assert!(remove_temp_artifacts(&target).unwrap().is_empty());
    }
}
