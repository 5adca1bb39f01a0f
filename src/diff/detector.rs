//! Change detection between two record sets
//!
//! - `added`    keys in new, not in old
//! - `removed`  keys in old, not in new
//! - `modified` keys in both whose records differ on any field of the
//!   union of their field names
//!
//! Results are sorted by key, so the output does not depend on input order.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Serialize;

use crate::dataset::{read_jsonl, values_equal, Record};
use crate::observability::{log_event_with_fields, Event, Logger};

use super::errors::{DiffError, DiffResult, Side};
use super::identity::{identity_key, DuplicateKeyPolicy, IdentityPriority};
use super::summary::format_change_summary;

/// Identity keys that changed between two record sets.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ChangeSet {
    added: BTreeSet<String>,
    removed: BTreeSet<String>,
    modified: BTreeSet<String>,
}

impl ChangeSet {
    pub fn new(
        added: BTreeSet<String>,
        removed: BTreeSet<String>,
        modified: BTreeSet<String>,
    ) -> Self {
        Self {
            added,
            removed,
            modified,
        }
    }

    pub fn from_keys(added: &[&str], removed: &[&str], modified: &[&str]) -> Self {
        let set = |keys: &[&str]| -> BTreeSet<String> { keys.iter().map(|k| k.to_string()).collect() };
        Self::new(set(added), set(removed), set(modified))
    }

    pub fn added(&self) -> &BTreeSet<String> {
        &self.added
    }

    pub fn removed(&self) -> &BTreeSet<String> {
        &self.removed
    }

    pub fn modified(&self) -> &BTreeSet<String> {
        &self.modified
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Total number of changed keys.
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    pub fn summary(&self) -> String {
        format_change_summary(self)
    }
}

/// A record left out of the comparison because it had no usable identity value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedRecord {
    pub side: Side,
    pub index: usize,
}

/// Full outcome of one comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffReport {
    pub changes: ChangeSet,
    pub identity_field: String,
    pub skipped: Vec<SkippedRecord>,
}

/// Computes change sets between record sets.
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    priority: IdentityPriority,
    duplicates: DuplicateKeyPolicy,
    logger: Logger,
}

impl ChangeDetector {
    pub fn new(priority: IdentityPriority, duplicates: DuplicateKeyPolicy, logger: Logger) -> Self {
        Self {
            priority,
            duplicates,
            logger,
        }
    }

    pub fn priority(&self) -> &IdentityPriority {
        &self.priority
    }

    pub fn duplicate_policy(&self) -> DuplicateKeyPolicy {
        self.duplicates
    }

    /// Compares two in-memory record sets.
    pub fn diff(&self, old: &[Record], new: &[Record]) -> DiffResult<ChangeSet> {
        self.detect(old, new).map(|report| report.changes)
    }

    /// Compares the snapshot stored at `path` with `new`.
    ///
    /// A missing or unreadable prior snapshot is logged and compared as an
    /// empty set, which classifies every new record as added.
    pub fn diff_against_file(&self, path: &Path, new: &[Record]) -> DiffResult<DiffReport> {
        let old = if path.exists() {
            match read_jsonl(path) {
                Ok(records) => records,
                Err(e) => {
                    let reason = e.to_string();
                    let path_str = path.display().to_string();
                    self.logger.warn(
                        Event::PriorSnapshotUnavailable.as_str(),
                        &[("path", path_str.as_str()), ("reason", reason.as_str())],
                    );
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        self.detect(&old, new)
    }

    /// Compares two record sets and reports the identity field used and any
    /// records that could not be keyed.
    pub fn detect(&self, old: &[Record], new: &[Record]) -> DiffResult<DiffReport> {
        let field = self.priority.resolve(old, new)?.to_string();
        log_event_with_fields(
            &self.logger,
            Event::IdentityResolved,
            &[
                ("field", field.as_str()),
                ("canonical", self.priority.canonical()),
            ],
        );

        let mut skipped = Vec::new();
        let new_keyed = self.keyed(Side::New, new, &field, &mut skipped)?;

        // Nothing to compare against: every keyed record is new.
        if old.is_empty() {
            let changes = ChangeSet::new(new_keyed.into_keys().collect(), BTreeSet::new(), BTreeSet::new());
            return Ok(DiffReport {
                changes,
                identity_field: field,
                skipped,
            });
        }

        let old_keyed = self.keyed(Side::Old, old, &field, &mut skipped)?;

        let added = new_keyed
            .keys()
            .filter(|k| !old_keyed.contains_key(*k))
            .cloned()
            .collect();
        let removed = old_keyed
            .keys()
            .filter(|k| !new_keyed.contains_key(*k))
            .cloned()
            .collect();
        let modified = new_keyed
            .iter()
            .filter_map(|(key, new_record)| {
                old_keyed
                    .get(key)
                    .filter(|old_record| records_differ(old_record, new_record))
                    .map(|_| key.clone())
            })
            .collect();

        Ok(DiffReport {
            changes: ChangeSet::new(added, removed, modified),
            identity_field: field,
            skipped,
        })
    }

    /// Builds the key → record lookup for one side.
    fn keyed<'r>(
        &self,
        side: Side,
        records: &'r [Record],
        field: &str,
        skipped: &mut Vec<SkippedRecord>,
    ) -> DiffResult<BTreeMap<String, &'r Record>> {
        let mut lookup: BTreeMap<String, (usize, &'r Record)> = BTreeMap::new();

        for (index, record) in records.iter().enumerate() {
            let Some(key) = record.get(field).and_then(identity_key) else {
                let index_str = index.to_string();
                self.logger.warn(
                    Event::RecordSkipped.as_str(),
                    &[
                        ("field", field),
                        ("index", index_str.as_str()),
                        ("side", side.as_str()),
                    ],
                );
                skipped.push(SkippedRecord { side, index });
                continue;
            };

            if let Some((first_index, _)) = lookup.get(&key) {
                let first_index = *first_index;
                let first_str = first_index.to_string();
                let index_str = index.to_string();
                self.logger.warn(
                    Event::DuplicateIdentity.as_str(),
                    &[
                        ("first_index", first_str.as_str()),
                        ("index", index_str.as_str()),
                        ("key", key.as_str()),
                        ("policy", self.duplicates.as_str()),
                        ("side", side.as_str()),
                    ],
                );

                match self.duplicates {
                    DuplicateKeyPolicy::Reject => {
                        return Err(DiffError::DuplicateIdentity {
                            side,
                            key,
                            first_index,
                            second_index: index,
                        })
                    }
                    DuplicateKeyPolicy::FirstWins => continue,
                    DuplicateKeyPolicy::LastWins => {}
                }
            }

            lookup.insert(key, (index, record));
        }

        Ok(lookup.into_iter().map(|(k, (_, r))| (k, r)).collect())
    }
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new(
            IdentityPriority::default(),
            DuplicateKeyPolicy::default(),
            Logger::default(),
        )
    }
}

/// Whether two records differ on any field either of them carries.
fn records_differ(old: &Record, new: &Record) -> bool {
    let changed_or_dropped = old.fields().any(|(name, old_value)| match new.get(name) {
        Some(new_value) => !values_equal(old_value, new_value),
        None => true,
    });

    changed_or_dropped || new.field_names().any(|name| !old.contains(name))
}
