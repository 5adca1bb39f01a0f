//! CLI argument definitions using clap
//!
//! Commands:
//! - georef update   [--config <path>] [--snapshot <path>] [--source-file <path>] [--no-wait]
//! - georef validate --input <path>
//! - georef diff     --old <path> --new <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// georef - validated, diffed and atomically committed country snapshots
#[derive(Parser, Debug)]
#[command(name = "georef")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch, validate, diff and commit the snapshot
    Update {
        /// Snapshot file (overrides config)
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Read candidate records from a local JSONL file instead of the network
        #[arg(long)]
        source_file: Option<PathBuf>,

        /// Fail immediately if another run holds the lock
        #[arg(long)]
        no_wait: bool,
    },

    /// Validate a JSONL file and print the report
    Validate {
        /// Records to validate
        #[arg(long)]
        input: PathBuf,
    },

    /// Compare two JSONL files and print the change set
    Diff {
        /// Prior record set
        #[arg(long)]
        old: PathBuf,

        /// Current record set
        #[arg(long)]
        new: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_update_overrides() {
        let cli = Cli::try_parse_from([
            "georef",
            "update",
            "--snapshot",
            "/data/countries.jsonl",
            "--no-wait",
            "--config",
            "georef.json",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("georef.json")));
        match cli.command {
            Command::Update {
                snapshot,
                source_file,
                no_wait,
            } => {
                assert_eq!(snapshot, Some(PathBuf::from("/data/countries.jsonl")));
                assert!(source_file.is_none());
                assert!(no_wait);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_diff_requires_both_sides() {
        assert!(Cli::try_parse_from(["georef", "diff", "--old", "a.jsonl"]).is_err());
    }
}
