//! Validation issues
//!
//! Issue codes and their severities:
//! - EMPTY_DATASET (CRITICAL)
//! - MISSING_REQUIRED_FIELD (CRITICAL)
//! - WRONG_FIELD_TYPE (WARNING)
//! - INVALID_CONTINENT (WARNING)
//! - INVALID_ISO_ALPHA2 (WARNING)
//! - INVALID_ISO_ALPHA3 (WARNING)
//! - LOW_COUNTRY_COUNT (WARNING)
//!
//! Critical issues block a commit. Warnings are logged and never do.

use std::fmt;

use super::types::ExpectedType;

/// Severity of a validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IssueSeverity {
    Info,
    Warning,
    Critical,
}

impl IssueSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueSeverity::Info => "info",
            IssueSeverity::Warning => "warning",
            IssueSeverity::Critical => "critical",
        }
    }
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fixed issue codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCode {
    EmptyDataset,
    MissingRequiredField,
    WrongFieldType,
    InvalidContinent,
    InvalidIsoAlpha2,
    InvalidIsoAlpha3,
    LowCountryCount,
}

impl IssueCode {
    pub fn code(&self) -> &'static str {
        match self {
            IssueCode::EmptyDataset => "EMPTY_DATASET",
            IssueCode::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            IssueCode::WrongFieldType => "WRONG_FIELD_TYPE",
            IssueCode::InvalidContinent => "INVALID_CONTINENT",
            IssueCode::InvalidIsoAlpha2 => "INVALID_ISO_ALPHA2",
            IssueCode::InvalidIsoAlpha3 => "INVALID_ISO_ALPHA3",
            IssueCode::LowCountryCount => "LOW_COUNTRY_COUNT",
        }
    }

    pub fn severity(&self) -> IssueSeverity {
        match self {
            IssueCode::EmptyDataset | IssueCode::MissingRequiredField => IssueSeverity::Critical,
            _ => IssueSeverity::Warning,
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One validation finding with its typed context.
///
/// `index` is the position of the offending record in the validated slice.
/// `value` fields hold the offending value as text (strings unquoted,
/// anything else as JSON).
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    EmptyDataset,
    MissingRequiredField {
        index: usize,
        field: &'static str,
    },
    WrongFieldType {
        index: usize,
        field: &'static str,
        expected: ExpectedType,
        found_type: &'static str,
    },
    InvalidContinent {
        index: usize,
        value: String,
    },
    InvalidIsoAlpha2 {
        index: usize,
        value: String,
    },
    InvalidIsoAlpha3 {
        index: usize,
        value: String,
    },
    LowCountryCount {
        count: usize,
        minimum: usize,
    },
}

impl ValidationIssue {
    pub fn code(&self) -> IssueCode {
        match self {
            ValidationIssue::EmptyDataset => IssueCode::EmptyDataset,
            ValidationIssue::MissingRequiredField { .. } => IssueCode::MissingRequiredField,
            ValidationIssue::WrongFieldType { .. } => IssueCode::WrongFieldType,
            ValidationIssue::InvalidContinent { .. } => IssueCode::InvalidContinent,
            ValidationIssue::InvalidIsoAlpha2 { .. } => IssueCode::InvalidIsoAlpha2,
            ValidationIssue::InvalidIsoAlpha3 { .. } => IssueCode::InvalidIsoAlpha3,
            ValidationIssue::LowCountryCount { .. } => IssueCode::LowCountryCount,
        }
    }

    pub fn severity(&self) -> IssueSeverity {
        self.code().severity()
    }

    pub fn is_critical(&self) -> bool {
        self.severity() == IssueSeverity::Critical
    }

    /// Record index the issue refers to, if it refers to one record.
    pub fn index(&self) -> Option<usize> {
        match self {
            ValidationIssue::MissingRequiredField { index, .. }
            | ValidationIssue::WrongFieldType { index, .. }
            | ValidationIssue::InvalidContinent { index, .. }
            | ValidationIssue::InvalidIsoAlpha2 { index, .. }
            | ValidationIssue::InvalidIsoAlpha3 { index, .. } => Some(*index),
            ValidationIssue::EmptyDataset | ValidationIssue::LowCountryCount { .. } => None,
        }
    }

    /// Human-readable message.
    pub fn message(&self) -> String {
        match self {
            ValidationIssue::EmptyDataset => "No country data found".to_string(),
            ValidationIssue::MissingRequiredField { index, field } => {
                format!("Country at index {} missing required field: {}", index, field)
            }
            ValidationIssue::WrongFieldType {
                index,
                field,
                expected,
                found_type,
            } => format!(
                "Country at index {}, field '{}' has wrong type: {}, expected {}",
                index, field, found_type, expected
            ),
            ValidationIssue::InvalidContinent { index, value } => {
                format!("Country at index {} has invalid continent code: {}", index, value)
            }
            ValidationIssue::InvalidIsoAlpha2 { index, value } => {
                format!("Country at index {} has invalid ISO alpha2 code: {}", index, value)
            }
            ValidationIssue::InvalidIsoAlpha3 { index, value } => {
                format!("Country at index {} has invalid ISO alpha3 code: {}", index, value)
            }
            ValidationIssue::LowCountryCount { count, minimum } => format!(
                "Suspiciously low number of countries: {} (minimum {})",
                count, minimum
            ),
        }
    }

    /// Diagnostic key/value pairs, in a fixed order.
    pub fn context(&self) -> Vec<(&'static str, String)> {
        match self {
            ValidationIssue::EmptyDataset => Vec::new(),
            ValidationIssue::MissingRequiredField { index, field } => {
                vec![("index", index.to_string()), ("field", field.to_string())]
            }
            ValidationIssue::WrongFieldType {
                index,
                field,
                expected,
                found_type,
            } => vec![
                ("index", index.to_string()),
                ("field", field.to_string()),
                ("found_type", found_type.to_string()),
                ("expected", expected.to_string()),
            ],
            ValidationIssue::InvalidContinent { index, value }
            | ValidationIssue::InvalidIsoAlpha2 { index, value }
            | ValidationIssue::InvalidIsoAlpha3 { index, value } => {
                vec![("index", index.to_string()), ("value", value.clone())]
            }
            ValidationIssue::LowCountryCount { count, minimum } => vec![
                ("count", count.to_string()),
                ("minimum", minimum.to_string()),
            ],
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code(), self.message())
    }
}
