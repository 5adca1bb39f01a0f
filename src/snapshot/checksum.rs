//! CRC32 checksums for snapshot and backup files
//!
//! Used to confirm a backup copy holds exactly the bytes of the snapshot it
//! was taken from, and to fingerprint committed snapshots in logs.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crc32fast::Hasher;

use super::errors::{SnapshotError, SnapshotResult};

/// CRC32 over `data`.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// CRC32 of an entire file, read in chunks.
pub fn compute_file_checksum(path: &Path) -> SnapshotResult<u32> {
    let file = File::open(path).map_err(|e| SnapshotError::io_error_at_path(path, e))?;

    let mut reader = BufReader::new(file);
    let mut hasher = Hasher::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| SnapshotError::io_error_at_path(path, e))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize())
}

/// Format: `crc32:xxxxxxxx` (lowercase hex, zero-padded)
pub fn format_checksum(checksum: u32) -> String {
    format!("crc32:{:08x}", checksum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_file_checksum_matches_memory_checksum() {
        let data = b"{\"iso_alpha2\":\"US\"}\n".repeat(1000);
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();
        file.flush().unwrap();

        assert_eq!(compute_file_checksum(file.path()).unwrap(), compute_checksum(&data));
    }

    #[test]
    fn test_format_checksum() {
        assert_eq!(format_checksum(0xDEADBEEF), "crc32:deadbeef");
        assert_eq!(format_checksum(0x1), "crc32:00000001");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = compute_file_checksum(Path::new("/nonexistent/countries.jsonl")).unwrap_err();
        assert!(err.message().contains("/nonexistent/countries.jsonl"));
    }
}
