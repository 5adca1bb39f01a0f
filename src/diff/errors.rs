//! Change detection errors

use std::fmt;

use thiserror::Error;

pub type DiffResult<T> = Result<T, DiffError>;

/// Which input of a comparison a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Old,
    New,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Old => "old",
            Side::New => "new",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// No candidate identity field is present on every record of both sets.
    #[error("no identity field present on every record; tried: {}", .candidates.join(", "))]
    IdentityUnresolved { candidates: Vec<String> },

    #[error("identity priority list is empty")]
    EmptyPriority,

    #[error("duplicate identity key '{key}' in {side} records at indexes {first_index} and {second_index}")]
    DuplicateIdentity {
        side: Side,
        key: String,
        first_index: usize,
        second_index: usize,
    },
}

impl DiffError {
    pub fn code(&self) -> &'static str {
        match self {
            DiffError::IdentityUnresolved { .. } => "IDENTITY_UNRESOLVED",
            DiffError::EmptyPriority => "IDENTITY_PRIORITY_EMPTY",
            DiffError::DuplicateIdentity { .. } => "DUPLICATE_IDENTITY",
        }
    }
}
