//! Observable events
//!
//! Every log line emitted by the update pipeline names one of these.
//! Events are explicit and typed.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Run lifecycle
    /// Update run begins
    RunStart,
    /// Orchestrator state transition
    RunState,
    /// The single line describing what a successful run did
    RunSummary,
    /// Run aborted before commit
    RunAborted,

    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Lock
    /// Advisory lock acquired
    LockAcquired,
    /// Advisory lock held by someone else
    LockContended,
    /// Advisory lock released
    LockReleased,

    // Backup
    /// Pre-write backup written
    BackupWritten,
    /// Pre-write backup failed (non-fatal)
    BackupFailed,

    // Fetch
    /// Fetch attempt started
    FetchAttempt,
    /// Fetch attempt failed, will retry
    FetchRetry,
    /// Records fetched
    FetchComplete,
    /// Fetch gave up
    FetchFailed,

    // Validation
    /// One validation issue
    ValidationIssue,
    /// Validation totals
    ValidationComplete,

    // Diff
    /// Identity field chosen
    IdentityResolved,
    /// Record had no usable identity value
    RecordSkipped,
    /// Identity key seen twice on one side
    DuplicateIdentity,
    /// Prior snapshot missing or unreadable
    PriorSnapshotUnavailable,

    // Persistence
    /// Directory fsync after a completed rename failed
    DirSyncFailed,
    /// Stale temp file removed
    TempArtifactRemoved,
    /// Stale temp files could not be listed or removed
    TempCleanupFailed,
}

impl Event {
    /// Returns the event name as logged.
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::RunStart => "RUN_START",
            Event::RunState => "RUN_STATE",
            Event::RunSummary => "RUN_SUMMARY",
            Event::RunAborted => "RUN_ABORTED",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::LockAcquired => "LOCK_ACQUIRED",
            Event::LockContended => "LOCK_CONTENDED",
            Event::LockReleased => "LOCK_RELEASED",
            Event::BackupWritten => "BACKUP_WRITTEN",
            Event::BackupFailed => "BACKUP_FAILED",
            Event::FetchAttempt => "FETCH_ATTEMPT",
            Event::FetchRetry => "FETCH_RETRY",
            Event::FetchComplete => "FETCH_COMPLETE",
            Event::FetchFailed => "FETCH_FAILED",
            Event::ValidationIssue => "VALIDATION_ISSUE",
            Event::ValidationComplete => "VALIDATION_COMPLETE",
            Event::IdentityResolved => "IDENTITY_RESOLVED",
            Event::RecordSkipped => "RECORD_SKIPPED",
            Event::DuplicateIdentity => "DUPLICATE_IDENTITY",
            Event::PriorSnapshotUnavailable => "PRIOR_SNAPSHOT_UNAVAILABLE",
            Event::DirSyncFailed => "DIR_SYNC_FAILED",
            Event::TempArtifactRemoved => "TEMP_ARTIFACT_REMOVED",
            Event::TempCleanupFailed => "TEMP_CLEANUP_FAILED",
        }
    }

    /// Whether this event marks a run that did not commit.
    pub fn is_abort(&self) -> bool {
        matches!(
            self,
            Event::RunAborted | Event::LockContended | Event::FetchFailed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_screaming_snake() {
        for event in [Event::RunStart, Event::RecordSkipped, Event::TempArtifactRemoved] {
            let name = event.as_str();
            assert!(name.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_abort_events() {
        assert!(Event::RunAborted.is_abort());
        assert!(Event::LockContended.is_abort());
        assert!(!Event::RunSummary.is_abort());
    }
}
