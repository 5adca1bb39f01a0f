//! Schema validator for country record sets
//!
//! Checks run in a fixed order so reports are reproducible:
//!
//! 1. Empty-set check
//! 2. Structural pass, record by record:
//!    required fields (required order), field types (declaration order),
//!    continent whitelist
//! 3. Quality pass: record count floor, then ISO code lengths record by record
//!
//! The validator never mutates records and has no side effects.

use serde_json::Value;

use crate::dataset::{json_type_name, Record};
use crate::observability::{Event, Logger, Severity};

use super::issues::{IssueCode, IssueSeverity, ValidationIssue};
use super::types::CountrySchema;

/// Outcome of validating one record set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
    critical_count: usize,
    warning_count: usize,
}

impl ValidationReport {
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let critical_count = issues
            .iter()
            .filter(|i| i.severity() == IssueSeverity::Critical)
            .count();
        let warning_count = issues
            .iter()
            .filter(|i| i.severity() == IssueSeverity::Warning)
            .count();

        Self {
            issues,
            critical_count,
            warning_count,
        }
    }

    /// True iff there is no critical issue. Warnings never affect validity.
    pub fn is_valid(&self) -> bool {
        self.critical_count == 0
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn critical_count(&self) -> usize {
        self.critical_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    /// Number of issues carrying `code`.
    pub fn count_of(&self, code: IssueCode) -> usize {
        self.issues.iter().filter(|i| i.code() == code).count()
    }

    /// Critical issues only, in report order.
    pub fn critical_issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.is_critical())
    }

    /// Emits one log line per issue followed by a totals line.
    pub fn log(&self, logger: &Logger) {
        for issue in &self.issues {
            let severity = match issue.severity() {
                IssueSeverity::Critical => Severity::Error,
                IssueSeverity::Warning => Severity::Warn,
                IssueSeverity::Info => Severity::Info,
            };
            let message = issue.message();
            let context = issue.context();

            let mut fields: Vec<(&str, &str)> = vec![
                ("code", issue.code().code()),
                ("issue_severity", issue.severity().as_str()),
                ("message", message.as_str()),
            ];
            fields.extend(context.iter().map(|(k, v)| (*k, v.as_str())));

            logger.log(severity, Event::ValidationIssue.as_str(), &fields);
        }

        let critical = self.critical_count.to_string();
        let warnings = self.warning_count.to_string();
        let valid = self.is_valid().to_string();
        logger.info(
            Event::ValidationComplete.as_str(),
            &[
                ("critical_count", critical.as_str()),
                ("is_valid", valid.as_str()),
                ("warning_count", warnings.as_str()),
            ],
        );
    }
}

/// Validates record sets against a fixed `CountrySchema`.
#[derive(Debug, Clone, Default)]
pub struct SchemaValidator {
    schema: CountrySchema,
}

impl SchemaValidator {
    pub fn new(schema: CountrySchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &CountrySchema {
        &self.schema
    }

    /// Validates `records` and returns every issue found.
    pub fn validate(&self, records: &[Record]) -> ValidationReport {
        let mut issues = Vec::new();

        if records.is_empty() {
            issues.push(ValidationIssue::EmptyDataset);
        }

        for (index, record) in records.iter().enumerate() {
            self.check_structure(index, record, &mut issues);
        }

        self.check_quality(records, &mut issues);

        ValidationReport::from_issues(issues)
    }

    fn check_structure(&self, index: usize, record: &Record, issues: &mut Vec<ValidationIssue>) {
        for field in self.schema.required_fields {
            if !record.contains(field) {
                issues.push(ValidationIssue::MissingRequiredField { index, field });
            }
        }

        for (field, expected) in self.schema.field_types {
            match record.get(field) {
                None | Some(Value::Null) => {}
                Some(value) if expected.matches(value) => {}
                Some(value) => issues.push(ValidationIssue::WrongFieldType {
                    index,
                    field,
                    expected: *expected,
                    found_type: json_type_name(value),
                }),
            }
        }

        if let Some(value) = record.get(self.schema.continent_field) {
            let known = value
                .as_str()
                .map(|code| self.schema.valid_continents.contains(&code))
                .unwrap_or(false);
            if !known {
                issues.push(ValidationIssue::InvalidContinent {
                    index,
                    value: display_value(value),
                });
            }
        }
    }

    fn check_quality(&self, records: &[Record], issues: &mut Vec<ValidationIssue>) {
        if records.len() < self.schema.min_record_count {
            issues.push(ValidationIssue::LowCountryCount {
                count: records.len(),
                minimum: self.schema.min_record_count,
            });
        }

        for (index, record) in records.iter().enumerate() {
            if let Some(value) = record.get(self.schema.alpha2_field) {
                if !has_char_len(value, 2) {
                    issues.push(ValidationIssue::InvalidIsoAlpha2 {
                        index,
                        value: display_value(value),
                    });
                }
            }

            if let Some(value) = record.get(self.schema.alpha3_field) {
                if !has_char_len(value, 3) {
                    issues.push(ValidationIssue::InvalidIsoAlpha3 {
                        index,
                        value: display_value(value),
                    });
                }
            }
        }
    }
}

/// A string of exactly `len` Unicode scalar values.
fn has_char_len(value: &Value, len: usize) -> bool {
    value
        .as_str()
        .map(|s| s.chars().count() == len)
        .unwrap_or(false)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
