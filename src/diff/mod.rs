//! Change detection
//!
//! Compares a prior record set with a fresh one, keyed by an identity field
//! resolved from an explicit priority list.
//!
//! Two entry points:
//! - `ChangeDetector::diff` / `detect`: both sides already in memory
//! - `ChangeDetector::diff_against_file`: prior side read from a snapshot path
//!
//! Duplicate identity keys within one side follow `DuplicateKeyPolicy`.

mod detector;
mod errors;
mod identity;
mod summary;

pub use detector::{ChangeDetector, ChangeSet, DiffReport, SkippedRecord};
pub use errors::{DiffError, DiffResult, Side};
pub use identity::{identity_key, DuplicateKeyPolicy, IdentityPriority, DEFAULT_IDENTITY_FIELDS};
pub use summary::{format_change_summary, NO_CHANGES};
