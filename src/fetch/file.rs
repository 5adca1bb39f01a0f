use std::path::{Path, PathBuf};

use crate::dataset::{read_jsonl, Record};

use super::errors::{FetchError, FetchResult};
use super::SourceFetcher;

/// Reads candidate records from a local JSONL file.
#[derive(Debug, Clone)]
pub struct JsonlFileFetcher {
    path: PathBuf,
}

impl JsonlFileFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SourceFetcher for JsonlFileFetcher {
    fn fetch(&self) -> FetchResult<Vec<Record>> {
        read_jsonl(&self.path).map_err(|source| FetchError::File {
            path: self.path.clone(),
            source,
        })
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_reads_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("source.jsonl");
        fs::write(&path, "{\"iso_alpha2\":\"JP\"}\n\n{\"iso_alpha2\":\"KR\"}\n").unwrap();

        let records = JsonlFileFetcher::new(&path).fetch().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get_str("iso_alpha2"), Some("KR"));
    }

    #[test]
    fn test_missing_file() {
        let fetcher = JsonlFileFetcher::new("/nonexistent/source.jsonl");
        let err = fetcher.fetch().unwrap_err();
        assert_eq!(err.code(), "FETCH_FILE");
        assert!(fetcher.describe().starts_with("file:"));
    }
}
