//! Update pipeline
//!
//! Sequences fetch, validation, change detection and the durable commit
//! under the snapshot lock, and decides between commit and abort.
//!
//! # States
//!
//! ```text
//! INIT → LOCKED → FETCHED → VALIDATED → DIFFED → { COMMITTED | NO_CHANGE } → DONE
//!   \________\________\__________\__________\________________________→ ABORTED(reason)
//! ```
//!
//! `DONE` and `ABORTED` are terminal. Nothing is written before `DIFFED`
//! except the pre-write backup.

mod errors;
mod orchestrator;

pub use errors::{AbortReason, PipelineError, PipelineResult};
pub use orchestrator::{Orchestrator, RunOutcome, RunState};
