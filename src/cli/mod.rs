//! CLI module for georef
//!
//! Provides command-line interface for:
//! - update: Full fetch → validate → diff → commit run
//! - validate: Report on a JSONL file
//! - diff: Change set between two JSONL files

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{build_fetcher, build_orchestrator, diff, run_command, update, validate, UpdateOverrides};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{diff_to_json, report_to_json, write_response};

/// Parse process arguments and run the selected command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.config.as_deref(), cli.command)
}
