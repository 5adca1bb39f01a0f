//! Line-delimited JSON codec
//!
//! Format:
//! - UTF-8
//! - One JSON object per line, each line terminated by `\n`
//! - No separators between records
//! - Non-ASCII text written as-is, never `\u` escaped
//!
//! Blank lines are ignored when reading.

use std::fs;
use std::path::Path;

use serde_json::Value;

use super::errors::{DatasetError, DatasetResult};
use super::record::{json_type_name, Record};

/// Parses JSONL text into records. Line numbers in errors are 1-based.
pub fn parse_jsonl(text: &str) -> DatasetResult<Vec<Record>> {
    let mut records = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        if line.trim().is_empty() {
            continue;
        }

        let value: Value = serde_json::from_str(line).map_err(|source| {
            DatasetError::InvalidLine {
                line: line_no,
                source,
            }
        })?;

        match value {
            Value::Object(fields) => records.push(Record::from_map(fields)),
            other => {
                return Err(DatasetError::LineNotAnObject {
                    line: line_no,
                    found: json_type_name(&other),
                })
            }
        }
    }

    Ok(records)
}

/// Reads and parses a JSONL file.
pub fn read_jsonl(path: &Path) -> DatasetResult<Vec<Record>> {
    let text = fs::read_to_string(path)?;
    parse_jsonl(&text)
}

/// Encodes records to JSONL bytes, fully in memory.
pub fn encode_jsonl(records: &[Record]) -> DatasetResult<Vec<u8>> {
    let mut out = Vec::with_capacity(records.len() * 160);

    for (index, record) in records.iter().enumerate() {
        serde_json::to_writer(&mut out, record)
            .map_err(|source| DatasetError::Encode { index, source })?;
        out.push(b'\n');
    }

    Ok(out)
}
