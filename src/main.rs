//! georef CLI entry point
//!
//! Parses arguments and dispatches via `cli::run`. Errors go to stderr and
//! set the process exit code; all other logic lives in the CLI module.

use georef::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(e.exit_code());
    }
}
