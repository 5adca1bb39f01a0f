//! Configuration file
//!
//! JSON object; every field is optional and falls back to its default.
//! Unknown fields are rejected.
//!
//! ```json
//! {
//!   "snapshot_path": "countries.jsonl",
//!   "source_url": "https://www.geonames.org/countries/",
//!   "max_attempts": 5,
//!   "lock_mode": "blocking",
//!   "identity_fields": ["iso_alpha2", "iso_alpha3", "iso_numeric"],
//!   "duplicate_keys": "last_wins",
//!   "log_level": "info"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::diff::{DuplicateKeyPolicy, IdentityPriority, DEFAULT_IDENTITY_FIELDS};
use crate::fetch::{RetryPolicy, GEONAMES_URL};
use crate::observability::Severity;
use crate::snapshot::LockMode;

use super::errors::{CliError, CliResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Snapshot JSONL file
    pub snapshot_path: PathBuf,

    /// Change-summary file; defaults to `.changes_summary.txt` next to the snapshot
    pub changes_path: Option<PathBuf>,

    /// Country list page
    pub source_url: String,

    /// Local JSONL source; when set, `source_url` is not used
    pub source_file: Option<PathBuf>,

    pub max_attempts: u32,

    /// First retry delay; doubles per attempt
    pub retry_base_delay_ms: u64,

    pub request_timeout_secs: u64,

    pub lock_mode: LockMode,

    /// Identity field candidates, canonical first
    pub identity_fields: Vec<String>,

    pub duplicate_keys: DuplicateKeyPolicy,

    pub log_level: Severity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("countries.jsonl"),
            changes_path: None,
            source_url: GEONAMES_URL.to_string(),
            source_file: None,
            max_attempts: 5,
            retry_base_delay_ms: 1000,
            request_timeout_secs: 30,
            lock_mode: LockMode::Blocking,
            identity_fields: DEFAULT_IDENTITY_FIELDS.iter().map(|s| s.to_string()).collect(),
            duplicate_keys: DuplicateKeyPolicy::LastWins,
            log_level: Severity::Info,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Defaults when `path` is `None`, otherwise the file at `path`.
    pub fn load_or_default(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.snapshot_path.as_os_str().is_empty() {
            return Err(CliError::config_error("snapshot_path must not be empty"));
        }

        if self.snapshot_path.file_name().is_none() {
            return Err(CliError::config_error(format!(
                "snapshot_path must name a file: '{}'",
                self.snapshot_path.display()
            )));
        }

        if self.max_attempts == 0 {
            return Err(CliError::config_error("max_attempts must be > 0"));
        }

        if self.request_timeout_secs == 0 {
            return Err(CliError::config_error("request_timeout_secs must be > 0"));
        }

        if self.source_file.is_none()
            && !(self.source_url.starts_with("http://") || self.source_url.starts_with("https://"))
        {
            return Err(CliError::config_error(format!(
                "Invalid source_url: '{}'. Must be http:// or https://",
                self.source_url
            )));
        }

        if self.identity_fields.iter().any(|f| f.trim().is_empty()) {
            return Err(CliError::config_error("identity_fields must not contain empty names"));
        }
        self.identity_priority()?;

        Ok(())
    }

    pub fn identity_priority(&self) -> CliResult<IdentityPriority> {
        IdentityPriority::new(self.identity_fields.iter().cloned())
            .map_err(|e| CliError::config_error(format!("identity_fields: {}", e)))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("georef.json");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.identity_priority().unwrap().canonical(), "iso_alpha2");
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{"snapshot_path": "/srv/countries.jsonl", "lock_mode": "non_blocking", "duplicate_keys": "reject"}"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.snapshot_path, PathBuf::from("/srv/countries.jsonl"));
        assert_eq!(config.lock_mode, LockMode::NonBlocking);
        assert_eq!(config.duplicate_keys, DuplicateKeyPolicy::Reject);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.log_level, Severity::Info);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"snapshot_pth": "x.jsonl"}"#);
        let err = Config::load(&path).unwrap_err();
        assert!(err.message().contains("Invalid config JSON"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = Config {
            max_attempts: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            identity_fields: Vec::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            source_url: "ftp://example.org".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_source_file_skips_url_check() {
        let config = Config {
            source_url: String::new(),
            source_file: Some(PathBuf::from("fixtures/countries.jsonl")),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/georef.json")).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }
}
