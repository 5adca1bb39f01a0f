//! Dataset model
//!
//! Records and their on-disk JSONL representation. Domain types here are
//! data-only; filesystem access is limited to `read_jsonl`.

mod errors;
mod jsonl;
mod record;

pub use errors::{DatasetError, DatasetResult};
pub use jsonl::{encode_jsonl, parse_jsonl, read_jsonl};
pub use record::{json_type_name, values_equal, Record};
