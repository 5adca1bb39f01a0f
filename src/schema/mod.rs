//! Schema validation for country record sets
//!
//! # Design Principles
//!
//! - Fixed schema: required fields, field types, continent whitelist
//! - Severity-tiered issues: critical blocks a commit, warnings never do
//! - Every issue reported, not just the first
//! - Deterministic issue order
//! - Pure: no I/O, no mutation of records

mod issues;
mod types;
mod validator;

pub use issues::{IssueCode, IssueSeverity, ValidationIssue};
pub use types::{
    CountrySchema, ExpectedType, FieldType, FIELD_TYPES, MIN_RECORD_COUNT, REQUIRED_FIELDS,
    VALID_CONTINENTS,
};
pub use validator::{SchemaValidator, ValidationReport};
