//! Fetch error types

use std::path::PathBuf;

use thiserror::Error;

use crate::dataset::DatasetError;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a status that retrying will not fix.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Every attempt failed; carries the last failure.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },

    #[error("cannot build HTTP client: {0}")]
    Client(String),

    /// The response arrived but held no usable country table.
    #[error("unexpected page layout: {0}")]
    Layout(String),

    #[error("cannot read source file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: DatasetError,
    },
}

impl FetchError {
    pub fn code(&self) -> &'static str {
        match self {
            FetchError::Status { .. } => "FETCH_HTTP_STATUS",
            FetchError::Exhausted { .. } => "FETCH_EXHAUSTED",
            FetchError::Client(_) => "FETCH_CLIENT",
            FetchError::Layout(_) => "FETCH_LAYOUT",
            FetchError::File { .. } => "FETCH_FILE",
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
