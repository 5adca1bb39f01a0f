//! georef - country reference dataset pipeline
//!
//! Fetches the country list, validates it against a fixed schema, diffs it
//! against the committed JSONL snapshot and, when something changed,
//! replaces the snapshot atomically under an exclusive lock.

pub mod cli;
pub mod dataset;
pub mod diff;
pub mod fault_point;
pub mod fetch;
pub mod observability;
pub mod pipeline;
pub mod schema;
pub mod snapshot;
