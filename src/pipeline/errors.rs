//! Pipeline abort errors
//!
//! Every aborted run ends in exactly one `AbortReason`, and each reason has
//! its own process exit code:
//!
//! | Reason                     | Code |
//! |----------------------------|------|
//! | LOCK_CONTENTION            | 2    |
//! | FETCH_FAILED               | 3    |
//! | VALIDATION_FAILED          | 4    |
//! | IDENTITY_RESOLUTION_FAILED | 5    |
//! | PERSISTENCE_FAILED         | 6    |

use std::fmt;

use crate::diff::DiffError;
use crate::fetch::FetchError;
use crate::schema::{ValidationIssue, ValidationReport};
use crate::snapshot::SnapshotError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbortReason {
    LockContention,
    FetchFailed,
    ValidationFailed,
    IdentityResolutionFailed,
    PersistenceFailed,
}

impl AbortReason {
    pub fn code(&self) -> &'static str {
        match self {
            AbortReason::LockContention => "LOCK_CONTENTION",
            AbortReason::FetchFailed => "FETCH_FAILED",
            AbortReason::ValidationFailed => "VALIDATION_FAILED",
            AbortReason::IdentityResolutionFailed => "IDENTITY_RESOLUTION_FAILED",
            AbortReason::PersistenceFailed => "PERSISTENCE_FAILED",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            AbortReason::LockContention => 2,
            AbortReason::FetchFailed => 3,
            AbortReason::ValidationFailed => 4,
            AbortReason::IdentityResolutionFailed => 5,
            AbortReason::PersistenceFailed => 6,
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Terminal failure of one pipeline run.
#[derive(Debug)]
pub struct PipelineError {
    reason: AbortReason,
    message: String,
    issues: Vec<ValidationIssue>,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl PipelineError {
    fn new(reason: AbortReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            issues: Vec::new(),
            source: None,
        }
    }

    fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn lock(err: SnapshotError) -> Self {
        let reason = if err.is_contention() {
            AbortReason::LockContention
        } else {
            AbortReason::PersistenceFailed
        };
        Self::new(reason, "could not acquire snapshot lock").with_source(err)
    }

    pub fn fetch(err: FetchError) -> Self {
        Self::new(AbortReason::FetchFailed, "source fetch failed").with_source(err)
    }

    /// Carries the critical issues of a failed validation.
    pub fn validation(report: &ValidationReport) -> Self {
        let mut err = Self::new(
            AbortReason::ValidationFailed,
            format!(
                "{} critical validation issue(s)",
                report.critical_count()
            ),
        );
        err.issues = report.critical_issues().cloned().collect();
        err
    }

    pub fn identity(err: DiffError) -> Self {
        Self::new(AbortReason::IdentityResolutionFailed, "change detection failed").with_source(err)
    }

    pub fn persistence(message: impl Into<String>, err: SnapshotError) -> Self {
        Self::new(AbortReason::PersistenceFailed, message).with_source(err)
    }

    pub fn reason(&self) -> AbortReason {
        self.reason
    }

    pub fn code(&self) -> &'static str {
        self.reason.code()
    }

    pub fn exit_code(&self) -> i32 {
        self.reason.exit_code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Critical issues for `ValidationFailed`; empty otherwise.
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.reason.code(), self.message)?;
        if let Some(ref source) = self.source {
            write!(f, ": {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
