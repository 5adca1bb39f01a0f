//! JSON output for CLI commands
//!
//! - Output: single JSON object per command on stdout
//! - UTF-8 only
//! - Log lines go to a separate stream

use std::io::Write;

use serde_json::{json, Map, Value};

use crate::diff::DiffReport;
use crate::schema::ValidationReport;

use super::errors::CliResult;

/// Write a success response
pub fn write_response<W: Write>(out: &mut W, data: Value) -> CliResult<()> {
    let response = json!({
        "status": "ok",
        "data": data
    });

    serde_json::to_writer(&mut *out, &response)?;
    writeln!(out)?;
    out.flush()?;

    Ok(())
}

pub fn report_to_json(report: &ValidationReport) -> Value {
    let issues: Vec<Value> = report
        .issues()
        .iter()
        .map(|issue| {
            let context: Map<String, Value> = issue
                .context()
                .into_iter()
                .map(|(k, v)| (k.to_string(), Value::String(v)))
                .collect();
            json!({
                "code": issue.code().code(),
                "severity": issue.severity().as_str(),
                "message": issue.message(),
                "context": context,
            })
        })
        .collect();

    json!({
        "is_valid": report.is_valid(),
        "critical_count": report.critical_count(),
        "warning_count": report.warning_count(),
        "issues": issues,
    })
}

pub fn diff_to_json(report: &DiffReport) -> Value {
    json!({
        "identity_field": report.identity_field,
        "added": report.changes.added(),
        "removed": report.changes.removed(),
        "modified": report.changes.modified(),
        "skipped": report.skipped.len(),
        "summary": report.changes.summary(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ChangeSet;
    use crate::schema::ValidationIssue;

    #[test]
    fn test_write_response_is_one_line() {
        let mut out = Vec::new();
        write_response(&mut out, json!({"n": 1})).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "{\"status\":\"ok\",\"data\":{\"n\":1}}\n");
    }

    #[test]
    fn test_report_to_json() {
        let report = ValidationReport::from_issues(vec![ValidationIssue::InvalidContinent {
            index: 0,
            value: "ZZ".to_string(),
        }]);
        let value = report_to_json(&report);
        assert_eq!(value["is_valid"], true);
        assert_eq!(value["warning_count"], 1);
        assert_eq!(value["issues"][0]["code"], "INVALID_CONTINENT");
        assert_eq!(value["issues"][0]["context"]["index"], "0");
    }

    #[test]
    fn test_diff_to_json() {
        let report = DiffReport {
            changes: ChangeSet::from_keys(&["FR"], &[], &["US"]),
            identity_field: "iso_alpha2".to_string(),
            skipped: Vec::new(),
        };
        let value = diff_to_json(&report);
        assert_eq!(value["added"], json!(["FR"]));
        assert_eq!(value["summary"], "Added 1 countries: FR | Modified 1 countries: US");
    }
}
