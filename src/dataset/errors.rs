//! Dataset decode errors

use thiserror::Error;

pub type DatasetResult<T> = Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("line {line}: invalid JSON: {source}")]
    InvalidLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: expected a JSON object, found {found}")]
    LineNotAnObject { line: usize, found: &'static str },

    #[error("failed to encode record {index}: {source}")]
    Encode {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
