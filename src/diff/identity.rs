//! Identity-key resolution
//!
//! The identity field is chosen once per comparison from a caller-supplied
//! priority list: the first candidate present on every record of both sets.
//! With no prior records the canonical field is used as-is; new records
//! lacking it are skipped by the lookup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dataset::Record;

use super::errors::{DiffError, DiffResult};

/// Default candidates, canonical first.
pub const DEFAULT_IDENTITY_FIELDS: &[&str] = &["iso_alpha2", "iso_alpha3", "iso_numeric"];

/// Ordered identity-field candidates. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPriority(Vec<String>);

impl IdentityPriority {
    pub fn new<I, S>(fields: I) -> DiffResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            return Err(DiffError::EmptyPriority);
        }
        Ok(Self(fields))
    }

    /// The preferred identity field.
    pub fn canonical(&self) -> &str {
        &self.0[0]
    }

    pub fn candidates(&self) -> &[String] {
        &self.0
    }

    /// First candidate present (null or not) on every record of both sets,
    /// falling back to the canonical field when `old` is empty.
    pub fn resolve(&self, old: &[Record], new: &[Record]) -> DiffResult<&str> {
        let universal = self.0.iter().find(|field| {
            old.iter()
                .chain(new.iter())
                .all(|record| record.contains(field))
        });

        match universal {
            Some(field) => Ok(field.as_str()),
            None if old.is_empty() => Ok(self.canonical()),
            None => Err(DiffError::IdentityUnresolved {
                candidates: self.0.clone(),
            }),
        }
    }
}

impl Default for IdentityPriority {
    fn default() -> Self {
        Self(DEFAULT_IDENTITY_FIELDS.iter().map(|s| s.to_string()).collect())
    }
}

/// What to do when one side holds two records with the same identity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeyPolicy {
    /// Fail the comparison.
    Reject,
    /// Keep the earliest record.
    FirstWins,
    /// Keep the latest record.
    #[default]
    LastWins,
}

impl DuplicateKeyPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateKeyPolicy::Reject => "reject",
            DuplicateKeyPolicy::FirstWins => "first_wins",
            DuplicateKeyPolicy::LastWins => "last_wins",
        }
    }
}

impl fmt::Display for DuplicateKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DuplicateKeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reject" => Ok(DuplicateKeyPolicy::Reject),
            "first_wins" => Ok(DuplicateKeyPolicy::FirstWins),
            "last_wins" => Ok(DuplicateKeyPolicy::LastWins),
            other => Err(format!("unknown duplicate key policy '{}'", other)),
        }
    }
}

/// Identity key carried by `value`: strings as-is, numbers as JSON text.
/// Null and non-scalar values carry no key.
pub fn identity_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
