//! Pipeline Flow Tests
//!
//! End-to-end runs against a real filesystem:
//! - Every abort reason maps to its own exit code and writes nothing
//! - Unchanged input twice gives NO_CHANGES and a byte-identical snapshot
//! - A successful run logs exactly one RUN_SUMMARY line

use georef::cli::{update, Config};
use georef::dataset::{encode_jsonl, Record};
use georef::diff::{ChangeDetector, ChangeSet, DuplicateKeyPolicy, IdentityPriority};
use georef::fault_point::{self, points};
use georef::fetch::JsonlFileFetcher;
use georef::observability::Logger;
use georef::pipeline::{AbortReason, Orchestrator, RunOutcome, RunState};
use georef::schema::VALID_CONTINENTS;
use georef::snapshot::{LockMode, SnapshotStore};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =============================================================================
// Fixtures
// =============================================================================

fn country(index: usize) -> Value {
    let code = format!(
        "{}{}",
        (b'A' + (index / 26) as u8) as char,
        (b'A' + (index % 26) as u8) as char
    );
    json!({
        "iso_alpha2": code,
        "iso_alpha3": format!("{}Q", code),
        "iso_numeric": format!("{:03}", index),
        "fips": code,
        "country_name": format!("Country {}", index),
        "capital": format!("Capital {}", index),
        "area_km2": 500 + index,
        "population": 10_000 * (index + 1),
        "continent": VALID_CONTINENTS[index % VALID_CONTINENTS.len()],
    })
}

fn write_source(path: &Path, values: &[Value]) {
    let records: Vec<Record> = values
        .iter()
        .cloned()
        .map(|v| Record::try_from(v).unwrap())
        .collect();
    fs::write(path, encode_jsonl(&records).unwrap()).unwrap();
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn snapshot(&self) -> PathBuf {
        self.dir.path().join("countries.jsonl")
    }

    fn source(&self) -> PathBuf {
        self.dir.path().join("source.jsonl")
    }

    fn changes(&self) -> PathBuf {
        self.dir.path().join(".changes_summary.txt")
    }

    fn orchestrator(&self, logger: &Logger) -> Orchestrator {
        let store = SnapshotStore::new(self.snapshot(), logger.clone());
        let detector = ChangeDetector::new(
            IdentityPriority::default(),
            DuplicateKeyPolicy::LastWins,
            logger.clone(),
        );
        Orchestrator::new(store, detector, logger.clone()).with_lock_mode(LockMode::NonBlocking)
    }

    fn config(&self) -> Config {
        Config {
            snapshot_path: self.snapshot(),
            source_file: Some(self.source()),
            lock_mode: LockMode::NonBlocking,
            ..Config::default()
        }
    }
}

// =============================================================================
// Successful Runs
// =============================================================================

#[test]
fn test_first_run_commits_and_writes_summary() {
    let ws = Workspace::new();
    let values: Vec<Value> = (0..120).map(country).collect();
    write_source(&ws.source(), &values);

    let (logger, capture) = Logger::capture();
    let outcome = ws
        .orchestrator(&logger)
        .run(&JsonlFileFetcher::new(ws.source()))
        .unwrap();

    match outcome {
        RunOutcome::Updated { ref changes, .. } => assert_eq!(changes.added().len(), 120),
        ref other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(fs::read(ws.snapshot()).unwrap(), fs::read(ws.source()).unwrap());
    assert!(fs::read_to_string(ws.changes()).unwrap().starts_with("Added 120 countries: "));
    assert_eq!(capture.events("RUN_SUMMARY").len(), 1);
    assert!(capture.events("RUN_ABORTED").is_empty());
}

#[test]
fn test_unchanged_twice_is_no_changes() {
    let ws = Workspace::new();
    write_source(&ws.source(), &(0..110).map(country).collect::<Vec<_>>());
    let fetcher = JsonlFileFetcher::new(ws.source());

    let (logger, capture) = Logger::capture();
    let mut orchestrator = ws.orchestrator(&logger);
    orchestrator.run(&fetcher).unwrap();
    let first = fs::read(ws.snapshot()).unwrap();
    let summary_after_first = fs::read(ws.changes()).unwrap();

    let outcome = orchestrator.run(&fetcher).unwrap();
    assert_eq!(outcome, RunOutcome::NoChanges);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(fs::read(ws.snapshot()).unwrap(), first);
    assert_eq!(fs::read(ws.changes()).unwrap(), summary_after_first);

    let summaries = capture.events("RUN_SUMMARY");
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[1]["summary"], "No changes detected");
    assert_eq!(summaries[1]["outcome"], "NO_CHANGES");
}

#[test]
fn test_modification_and_addition() {
    let ws = Workspace::new();
    let mut values: Vec<Value> = (0..105).map(country).collect();
    write_source(&ws.source(), &values);
    let fetcher = JsonlFileFetcher::new(ws.source());
    let logger = Logger::discard();
    let mut orchestrator = ws.orchestrator(&logger);
    orchestrator.run(&fetcher).unwrap();

    values[0]["capital"] = json!("New Capital");
    values.remove(3);
    values.push(country(200));
    write_source(&ws.source(), &values);

    let outcome = orchestrator.run(&fetcher).unwrap();
    let expected = ChangeSet::from_keys(&["HS"], &["AD"], &["AA"]);
    assert_eq!(
        outcome,
        RunOutcome::Updated {
            summary: expected.summary(),
            changes: expected,
        }
    );
    assert_eq!(
        fs::read_to_string(ws.changes()).unwrap(),
        "Added 1 countries: HS | Removed 1 countries: AD | Modified 1 countries: AA"
    );
    assert_eq!(fs::read_dir(ws.dir.path().join("backups")).unwrap().count(), 1);
}

// =============================================================================
// Aborted Runs
// =============================================================================

#[test]
fn test_lock_contention_touches_nothing() {
    let ws = Workspace::new();
    write_source(&ws.source(), &(0..101).map(country).collect::<Vec<_>>());

    let holder = SnapshotStore::new(ws.snapshot(), Logger::discard());
    let _held = holder.lock(LockMode::NonBlocking).unwrap();

    let mut orchestrator = ws.orchestrator(&Logger::discard());
    let err = orchestrator.run(&JsonlFileFetcher::new(ws.source())).unwrap_err();

    assert_eq!(err.reason(), AbortReason::LockContention);
    assert_eq!(err.exit_code(), 2);
    assert_eq!(orchestrator.history(), &[RunState::Init, RunState::Aborted(AbortReason::LockContention)]);
    assert!(!ws.snapshot().exists());
}

#[test]
fn test_fetch_failure_exit_code() {
    let ws = Workspace::new();
    let err = update(&ws.config(), &Logger::discard()).unwrap_err();
    assert_eq!(err.exit_code(), 3);
    assert!(!ws.snapshot().exists());
}

#[test]
fn test_validation_failure_keeps_prior_snapshot() {
    let ws = Workspace::new();
    write_source(&ws.source(), &(0..100).map(country).collect::<Vec<_>>());
    update(&ws.config(), &Logger::discard()).unwrap();
    let before = fs::read(ws.snapshot()).unwrap();

    let mut broken: Vec<Value> = (0..100).map(country).collect();
    broken[10].as_object_mut().unwrap().remove("country_name");
    broken[20].as_object_mut().unwrap().remove("continent");
    write_source(&ws.source(), &broken);

    let (logger, capture) = Logger::capture();
    let err = update(&ws.config(), &logger).unwrap_err();

    assert_eq!(err.exit_code(), 4);
    assert_eq!(fs::read(ws.snapshot()).unwrap(), before);
    let critical = capture
        .events("VALIDATION_ISSUE")
        .into_iter()
        .filter(|line| line["issue_severity"] == "critical")
        .count();
    assert_eq!(critical, 2);
    assert!(capture.events("RUN_SUMMARY").is_empty());
}

#[test]
fn test_identity_failure_exit_code() {
    let ws = Workspace::new();
    fs::write(ws.snapshot(), "{\"name\":\"legacy\"}\n").unwrap();
    write_source(&ws.source(), &(0..100).map(country).collect::<Vec<_>>());

    let err = update(&ws.config(), &Logger::discard()).unwrap_err();
    assert_eq!(err.exit_code(), 5);
    assert_eq!(fs::read_to_string(ws.snapshot()).unwrap(), "{\"name\":\"legacy\"}\n");
}

#[test]
fn test_persistence_failure_leaves_snapshot_and_no_temp() {
    let ws = Workspace::new();
    write_source(&ws.source(), &(0..100).map(country).collect::<Vec<_>>());
    update(&ws.config(), &Logger::discard()).unwrap();
    let before = fs::read(ws.snapshot()).unwrap();

    write_source(&ws.source(), &(0..101).map(country).collect::<Vec<_>>());
    let mut orchestrator = ws.orchestrator(&Logger::discard());

    fault_point::arm(points::SNAPSHOT_TEMP_WRITE);
    let err = orchestrator.run(&JsonlFileFetcher::new(ws.source())).unwrap_err();
    fault_point::disarm();

    assert_eq!(err.reason(), AbortReason::PersistenceFailed);
    assert_eq!(err.exit_code(), 6);
    assert_eq!(orchestrator.state(), RunState::Aborted(AbortReason::PersistenceFailed));
    assert_eq!(fs::read(ws.snapshot()).unwrap(), before);

    let temps = fs::read_dir(ws.dir.path())
        .unwrap()
        .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().ends_with(".tmp"))
        .count();
    assert_eq!(temps, 0);
}

#[test]
fn test_backup_failure_does_not_stop_commit() {
    let ws = Workspace::new();
    write_source(&ws.source(), &(0..100).map(country).collect::<Vec<_>>());
    update(&ws.config(), &Logger::discard()).unwrap();

    write_source(&ws.source(), &(1..101).map(country).collect::<Vec<_>>());
    let (logger, capture) = Logger::capture();

    fault_point::arm(points::BACKUP_COPY);
    let outcome = update(&ws.config(), &logger);
    fault_point::disarm();

    assert!(matches!(outcome, Ok(RunOutcome::Updated { .. })));
    assert_eq!(capture.events("BACKUP_FAILED").len(), 1);
}

#[test]
fn test_dir_sync_failure_still_reports_update() {
    let ws = Workspace::new();
    write_source(&ws.source(), &(0..100).map(country).collect::<Vec<_>>());
    let (logger, capture) = Logger::capture();
    let mut orchestrator = ws.orchestrator(&logger);

    fault_point::arm(points::SNAPSHOT_DIR_SYNC);
    let outcome = orchestrator.run(&JsonlFileFetcher::new(ws.source()));
    fault_point::disarm();

    assert!(matches!(outcome, Ok(RunOutcome::Updated { .. })));
    assert_eq!(orchestrator.state(), RunState::Done);
    assert_eq!(fs::read(ws.snapshot()).unwrap(), fs::read(ws.source()).unwrap());
    assert!(!capture.events("DIR_SYNC_FAILED").is_empty());
    assert!(capture.events("RUN_ABORTED").is_empty());
}
