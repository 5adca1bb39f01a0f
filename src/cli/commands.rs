//! CLI command implementations
//!
//! `update` logs JSON lines to stdout; its last line is `RUN_SUMMARY` or
//! `RUN_ABORTED`. `validate` and `diff` log to stderr and print one JSON
//! response on stdout.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::dataset::read_jsonl;
use crate::diff::ChangeDetector;
use crate::fetch::{GeoNamesFetcher, JsonlFileFetcher, SourceFetcher};
use crate::observability::{log_event_with_fields, Event, Logger};
use crate::pipeline::{AbortReason, Orchestrator, RunOutcome};
use crate::schema::SchemaValidator;
use crate::snapshot::{LockMode, SnapshotStore};

use super::args::Command;
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{diff_to_json, report_to_json, write_response};

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct UpdateOverrides {
    pub snapshot: Option<PathBuf>,
    pub source_file: Option<PathBuf>,
    pub no_wait: bool,
}

impl UpdateOverrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref snapshot) = self.snapshot {
            config.snapshot_path = snapshot.clone();
        }
        if let Some(ref source_file) = self.source_file {
            config.source_file = Some(source_file.clone());
        }
        if self.no_wait {
            config.lock_mode = LockMode::NonBlocking;
        }
    }
}

/// Dispatch a parsed command.
pub fn run_command(config_path: Option<&Path>, command: Command) -> CliResult<()> {
    let mut config = Config::load_or_default(config_path)?;

    match command {
        Command::Update {
            snapshot,
            source_file,
            no_wait,
        } => {
            let overrides = UpdateOverrides {
                snapshot,
                source_file,
                no_wait,
            };
            overrides.apply(&mut config);
            config.validate()?;

            let logger = Logger::stdout().with_min_severity(config.log_level);
            log_config(&logger, config_path, &config);
            update(&config, &logger).map(|_| ())
        }
        Command::Validate { input } => {
            let logger = Logger::stderr().with_min_severity(config.log_level);
            validate(&input, &logger, &mut io::stdout())
        }
        Command::Diff { old, new } => {
            let logger = Logger::stderr().with_min_severity(config.log_level);
            diff(&config, &old, &new, &logger, &mut io::stdout())
        }
    }
}

fn log_config(logger: &Logger, path: Option<&Path>, config: &Config) {
    let path = path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<defaults>".to_string());
    let snapshot = config.snapshot_path.display().to_string();
    log_event_with_fields(
        logger,
        Event::ConfigLoaded,
        &[
            ("duplicate_keys", config.duplicate_keys.as_str()),
            ("lock_mode", config.lock_mode.as_str()),
            ("path", path.as_str()),
            ("snapshot", snapshot.as_str()),
        ],
    );
}

/// Source fetcher selected by the config.
pub fn build_fetcher(config: &Config, logger: &Logger) -> Box<dyn SourceFetcher> {
    match config.source_file {
        Some(ref path) => Box::new(JsonlFileFetcher::new(path.clone())),
        None => Box::new(GeoNamesFetcher::new(
            config.source_url.clone(),
            config.retry_policy(),
            config.request_timeout(),
            logger.named("fetch"),
        )),
    }
}

pub fn build_orchestrator(config: &Config, logger: &Logger) -> CliResult<Orchestrator> {
    let mut store = SnapshotStore::new(config.snapshot_path.clone(), logger.named("snapshot"));
    if let Some(ref changes) = config.changes_path {
        store = store.with_changes_path(changes.clone());
    }

    let detector = ChangeDetector::new(
        config.identity_priority()?,
        config.duplicate_keys,
        logger.named("diff"),
    );

    Ok(Orchestrator::new(store, detector, logger.named("pipeline")).with_lock_mode(config.lock_mode))
}

/// Run the full update pipeline.
pub fn update(config: &Config, logger: &Logger) -> CliResult<RunOutcome> {
    let fetcher = build_fetcher(config, logger);
    let mut orchestrator = build_orchestrator(config, logger)?;
    orchestrator.run(fetcher.as_ref()).map_err(CliError::from)
}

/// Validate `input` and print the report. Fails with the validation exit
/// code when the report holds a critical issue.
pub fn validate<W: Write>(input: &Path, logger: &Logger, out: &mut W) -> CliResult<()> {
    let records = read_jsonl(input)
        .map_err(|e| CliError::io_error(format!("{}: {}", input.display(), e)))?;

    let report = SchemaValidator::default().validate(&records);
    report.log(logger);
    write_response(out, report_to_json(&report))?;

    if !report.is_valid() {
        return Err(CliError::aborted(
            AbortReason::ValidationFailed,
            format!("{} critical validation issue(s)", report.critical_count()),
        ));
    }
    Ok(())
}

/// Compare two JSONL files and print the change set.
pub fn diff<W: Write>(config: &Config, old: &Path, new: &Path, logger: &Logger, out: &mut W) -> CliResult<()> {
    let new_records = read_jsonl(new)
        .map_err(|e| CliError::io_error(format!("{}: {}", new.display(), e)))?;

    let detector = ChangeDetector::new(config.identity_priority()?, config.duplicate_keys, logger.clone());
    let report = detector
        .diff_against_file(old, &new_records)
        .map_err(|e| CliError::aborted(AbortReason::IdentityResolutionFailed, e.to_string()))?;

    write_response(out, diff_to_json(&report))
}
