//! Single-pass update run
//!
//! lock → backup → fetch → validate → diff → commit or no-change
//!
//! Every state change is logged as `RUN_STATE`. A run that reaches `Done`
//! logs exactly one `RUN_SUMMARY`; a run that stops early logs
//! `RUN_ABORTED` with its reason. Temp artifacts are cleaned up right after
//! the lock is taken and again right before it is released.

use std::fmt;

use uuid::Uuid;

use crate::diff::{ChangeDetector, ChangeSet, NO_CHANGES};
use crate::fetch::SourceFetcher;
use crate::observability::{log_event_with_fields, Event, Logger};
use crate::schema::SchemaValidator;
use crate::snapshot::{LockMode, SnapshotLock, SnapshotStore};

use super::errors::{AbortReason, PipelineError, PipelineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Locked,
    Fetched,
    Validated,
    Diffed,
    Committed,
    NoChange,
    Done,
    Aborted(AbortReason),
}

impl RunState {
    pub fn name(&self) -> &'static str {
        match self {
            RunState::Init => "INIT",
            RunState::Locked => "LOCKED",
            RunState::Fetched => "FETCHED",
            RunState::Validated => "VALIDATED",
            RunState::Diffed => "DIFFED",
            RunState::Committed => "COMMITTED",
            RunState::NoChange => "NO_CHANGE",
            RunState::Done => "DONE",
            RunState::Aborted(_) => "ABORTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Aborted(_))
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Aborted(reason) => write!(f, "ABORTED({})", reason),
            other => f.write_str(other.name()),
        }
    }
}

/// Successful end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The snapshot and change summary were replaced.
    Updated { changes: ChangeSet, summary: String },
    /// Fetched records match the snapshot; nothing was written.
    NoChanges,
}

impl RunOutcome {
    pub fn code(&self) -> &'static str {
        match self {
            RunOutcome::Updated { .. } => "UPDATED",
            RunOutcome::NoChanges => "NO_CHANGES",
        }
    }

    pub fn summary(&self) -> &str {
        match self {
            RunOutcome::Updated { summary, .. } => summary,
            RunOutcome::NoChanges => NO_CHANGES,
        }
    }

    pub fn exit_code(&self) -> i32 {
        0
    }
}

/// Drives one update of a snapshot from a source.
pub struct Orchestrator {
    store: SnapshotStore,
    validator: SchemaValidator,
    detector: ChangeDetector,
    lock_mode: LockMode,
    logger: Logger,
    state: RunState,
    history: Vec<RunState>,
    run_id: Option<Uuid>,
}

impl Orchestrator {
    pub fn new(store: SnapshotStore, detector: ChangeDetector, logger: Logger) -> Self {
        Self {
            store,
            validator: SchemaValidator::default(),
            detector,
            lock_mode: LockMode::Blocking,
            logger,
            state: RunState::Init,
            history: vec![RunState::Init],
            run_id: None,
        }
    }

    pub fn with_validator(mut self, validator: SchemaValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_lock_mode(mut self, mode: LockMode) -> Self {
        self.lock_mode = mode;
        self
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// State reached by the last run.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Every state the last run passed through, in order.
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    /// Execute one full run against `fetcher`.
    pub fn run(&mut self, fetcher: &dyn SourceFetcher) -> PipelineResult<RunOutcome> {
        let run_id = Uuid::new_v4();
        self.run_id = Some(run_id);
        self.state = RunState::Init;
        self.history = vec![RunState::Init];

        let run_id_str = run_id.to_string();
        let snapshot_str = self.store.snapshot_path().display().to_string();
        let source = fetcher.describe();
        log_event_with_fields(
            &self.logger,
            Event::RunStart,
            &[
                ("lock_mode", self.lock_mode.as_str()),
                ("run_id", run_id_str.as_str()),
                ("snapshot", snapshot_str.as_str()),
                ("source", source.as_str()),
            ],
        );

        let lock = match self.store.lock(self.lock_mode) {
            Ok(lock) => lock,
            Err(e) => return Err(self.abort(PipelineError::lock(e))),
        };
        self.advance(RunState::Locked);

        self.cleanup_temp_artifacts();
        let result = self.run_locked(&lock, fetcher);
        self.cleanup_temp_artifacts();
        drop(lock);

        match result {
            Ok(outcome) => {
                self.advance(RunState::Done);
                log_event_with_fields(
                    &self.logger,
                    Event::RunSummary,
                    &[
                        ("outcome", outcome.code()),
                        ("run_id", run_id_str.as_str()),
                        ("summary", outcome.summary()),
                    ],
                );
                Ok(outcome)
            }
            Err(e) => Err(self.abort(e)),
        }
    }

    fn run_locked(&mut self, lock: &SnapshotLock, fetcher: &dyn SourceFetcher) -> PipelineResult<RunOutcome> {
        // Logged by the store; a failed backup never stops the run.
        let _ = self.store.backup(lock);

        let records = fetcher.fetch().map_err(PipelineError::fetch)?;
        self.advance(RunState::Fetched);

        let report = self.validator.validate(&records);
        report.log(&self.logger);
        if !report.is_valid() {
            return Err(PipelineError::validation(&report));
        }
        self.advance(RunState::Validated);

        let diff = self
            .detector
            .diff_against_file(self.store.snapshot_path(), &records)
            .map_err(PipelineError::identity)?;
        self.advance(RunState::Diffed);

        if diff.changes.is_empty() {
            self.advance(RunState::NoChange);
            return Ok(RunOutcome::NoChanges);
        }

        self.store
            .commit(lock, &records)
            .map_err(|e| PipelineError::persistence("snapshot commit failed", e))?;

        let summary = diff.changes.summary();
        self.store.write_summary(lock, &summary).map_err(|e| {
            PipelineError::persistence("snapshot committed but change summary not written", e)
        })?;
        self.advance(RunState::Committed);

        Ok(RunOutcome::Updated {
            changes: diff.changes,
            summary,
        })
    }

    fn cleanup_temp_artifacts(&self) {
        if let Err(e) = self.store.cleanup_temp_artifacts() {
            let reason = e.to_string();
            self.logger
                .warn(Event::TempCleanupFailed.as_str(), &[("reason", reason.as_str())]);
        }
    }

    fn advance(&mut self, next: RunState) {
        let from = self.state.to_string();
        let to = next.to_string();
        let run_id = self.run_id.map(|id| id.to_string()).unwrap_or_default();
        log_event_with_fields(
            &self.logger,
            Event::RunState,
            &[("from", from.as_str()), ("run_id", run_id.as_str()), ("to", to.as_str())],
        );
        self.state = next;
        self.history.push(next);
    }

    fn abort(&mut self, err: PipelineError) -> PipelineError {
        self.advance(RunState::Aborted(err.reason()));

        let run_id = self.run_id.map(|id| id.to_string()).unwrap_or_default();
        let message = err.to_string();
        let exit_code = err.exit_code().to_string();
        log_event_with_fields(
            &self.logger,
            Event::RunAborted,
            &[
                ("exit_code", exit_code.as_str()),
                ("message", message.as_str()),
                ("reason", err.code()),
                ("run_id", run_id.as_str()),
            ],
        );
        err
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("snapshot", &self.store.snapshot_path())
            .field("lock_mode", &self.lock_mode)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Record;
    use crate::fetch::{FetchError, FetchResult};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    struct StaticFetcher(Vec<Record>);

    impl SourceFetcher for StaticFetcher {
        fn fetch(&self) -> FetchResult<Vec<Record>> {
            Ok(self.0.clone())
        }

        fn describe(&self) -> String {
            "static".to_string()
        }
    }

    struct FailingFetcher;

    impl SourceFetcher for FailingFetcher {
        fn fetch(&self) -> FetchResult<Vec<Record>> {
            Err(FetchError::Exhausted {
                attempts: 5,
                last: "connection refused".to_string(),
            })
        }

        fn describe(&self) -> String {
            "failing".to_string()
        }
    }

    fn country(code: &str, index: usize) -> Record {
        Record::try_from(json!({
            "iso_alpha2": code,
            "iso_alpha3": format!("{}X", code),
            "iso_numeric": format!("{:03}", index),
            "country_name": format!("Country {}", code),
            "continent": "EU",
            "capital": format!("Capital {}", code),
        }))
        .unwrap()
    }

    fn countries(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                let code = format!("{}{}", (b'A' + (i / 26) as u8) as char, (b'A' + (i % 26) as u8) as char);
                country(&code, i)
            })
            .collect()
    }

    fn orchestrator(dir: &TempDir, logger: Logger) -> Orchestrator {
        let store = SnapshotStore::new(dir.path().join("countries.jsonl"), logger.clone());
        let detector = ChangeDetector::new(Default::default(), Default::default(), logger.clone());
        Orchestrator::new(store, detector, logger).with_lock_mode(LockMode::NonBlocking)
    }

    #[test]
    fn test_first_run_updates() {
        let dir = TempDir::new().unwrap();
        let (logger, capture) = Logger::capture();
        let mut orch = orchestrator(&dir, logger);

        let outcome = orch.run(&StaticFetcher(countries(3))).unwrap();
        match &outcome {
            RunOutcome::Updated { changes, .. } => assert_eq!(changes.added().len(), 3),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(
            orch.history(),
            &[
                RunState::Init,
                RunState::Locked,
                RunState::Fetched,
                RunState::Validated,
                RunState::Diffed,
                RunState::Committed,
                RunState::Done,
            ]
        );
        assert_eq!(capture.events("RUN_SUMMARY").len(), 1);
        assert!(orch.store().changes_path().exists());
    }

    #[test]
    fn test_second_identical_run_is_no_change() {
        let dir = TempDir::new().unwrap();
        let (logger, capture) = Logger::capture();
        let mut orch = orchestrator(&dir, logger);
        let fetcher = StaticFetcher(countries(3));

        orch.run(&fetcher).unwrap();
        let outcome = orch.run(&fetcher).unwrap();

        assert_eq!(outcome, RunOutcome::NoChanges);
        assert_eq!(orch.state(), RunState::Done);
        assert!(orch.history().contains(&RunState::NoChange));
        let summaries = capture.events("RUN_SUMMARY");
        assert_eq!(summaries[1]["summary"], NO_CHANGES);
    }

    #[test]
    fn test_fetch_failure_aborts_without_writing() {
        let dir = TempDir::new().unwrap();
        let mut orch = orchestrator(&dir, Logger::discard());

        let err = orch.run(&FailingFetcher).unwrap_err();
        assert_eq!(err.reason(), AbortReason::FetchFailed);
        assert_eq!(orch.state(), RunState::Aborted(AbortReason::FetchFailed));
        assert!(!orch.store().exists());
    }

    #[test]
    fn test_validation_failure_logs_each_issue() {
        let dir = TempDir::new().unwrap();
        let (logger, capture) = Logger::capture();
        let mut orch = orchestrator(&dir, logger);

        let mut records = countries(2);
        records.push(Record::try_from(json!({"iso_alpha2": "ZZ"})).unwrap());
        let err = orch.run(&StaticFetcher(records)).unwrap_err();

        assert_eq!(err.exit_code(), 4);
        assert!(!err.issues().is_empty());
        let critical: Vec<_> = capture
            .events("VALIDATION_ISSUE")
            .into_iter()
            .filter(|l| l["issue_severity"] == "critical")
            .collect();
        assert_eq!(critical.len(), err.issues().len());
        assert_eq!(capture.events("RUN_ABORTED")[0]["reason"], "VALIDATION_FAILED");
        assert!(capture.events("RUN_SUMMARY").is_empty());
        assert!(!orch.store().exists());
    }

    #[test]
    fn test_corrupt_prior_snapshot_is_replaced() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("countries.jsonl"), "{broken\n").unwrap();
        let (logger, capture) = Logger::capture();
        let mut orch = orchestrator(&dir, logger);

        let outcome = orch.run(&StaticFetcher(countries(2))).unwrap();
        match &outcome {
            RunOutcome::Updated { changes, .. } => assert_eq!(changes.added().len(), 2),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(capture.events("PRIOR_SNAPSHOT_UNAVAILABLE").len(), 1);
        assert_eq!(orch.store().load().unwrap().unwrap(), countries(2));
    }

    #[test]
    fn test_stale_temp_removed_on_run() {
        let dir = TempDir::new().unwrap();
        let stale = dir.path().join(".countries.jsonl.0000.tmp");
        fs::write(&stale, b"partial").unwrap();

        let mut orch = orchestrator(&dir, Logger::discard());
        orch.run(&StaticFetcher(countries(1))).unwrap();
        assert!(!stale.exists());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(RunState::Locked.to_string(), "LOCKED");
        assert_eq!(
            RunState::Aborted(AbortReason::LockContention).to_string(),
            "ABORTED(LOCK_CONTENTION)"
        );
        assert!(RunState::Done.is_terminal());
        assert!(!RunState::Diffed.is_terminal());
    }
}
