//! GeoNames country table extraction
//!
//! Pulls `<table id="countries">` out of the country list page and turns
//! each data row into a record keyed by normalized header names.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Number, Value};

use crate::dataset::Record;

use super::errors::{FetchError, FetchResult};

struct Patterns {
    table: Regex,
    row: Regex,
    header_cell: Regex,
    data_cell: Regex,
    line_break: Regex,
    tag: Regex,
    whitespace: Regex,
    numeric_entity: Regex,
}

fn patterns() -> FetchResult<&'static Patterns> {
    static PATTERNS: OnceLock<Result<Patterns, regex::Error>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Ok(Patterns {
                table: Regex::new(r#"(?is)<table\b[^>]*\bid\s*=\s*["']?countries["']?[^>]*>(.*?)</table>"#)?,
                row: Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>")?,
                header_cell: Regex::new(r"(?is)<th\b[^>]*>(.*?)</th>")?,
                data_cell: Regex::new(r"(?is)<td\b[^>]*>(.*?)</td>")?,
                line_break: Regex::new(r"(?i)<br\s*/?>")?,
                tag: Regex::new(r"(?s)<[^>]*>")?,
                whitespace: Regex::new(r"\s+")?,
                numeric_entity: Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);")?,
            })
        })
        .as_ref()
        .map_err(|e| FetchError::Layout(format!("table pattern: {}", e)))
}

/// Record field name for a column header.
pub fn field_name_for_header(header: &str) -> String {
    match header {
        "ISO-3166 alpha2" => "iso_alpha2".to_string(),
        "ISO-3166 alpha3" => "iso_alpha3".to_string(),
        "ISO-3166 numeric" => "iso_numeric".to_string(),
        "fips" => "fips".to_string(),
        "Country" => "country_name".to_string(),
        "Capital" => "capital".to_string(),
        "Area in km²" => "area_km2".to_string(),
        "Population" => "population".to_string(),
        "Continent" => "continent".to_string(),
        other => other.to_lowercase().replace(' ', "_"),
    }
}

fn decode_entities(p: &Patterns, text: &str) -> String {
    let numeric = p
        .numeric_entity
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let raw = &caps[1];
            let code = match raw.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => raw.parse::<u32>().ok(),
            };
            code.and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        });

    numeric
        .replace("&nbsp;", " ")
        .replace("&sup2;", "²")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Visible text of an HTML fragment, trimmed.
fn cell_text(p: &Patterns, html: &str) -> String {
    let with_breaks = p.line_break.replace_all(html, " ");
    let stripped = p.tag.replace_all(&with_breaks, "");
    decode_entities(p, &stripped).trim().to_string()
}

fn header_text(p: &Patterns, html: &str) -> String {
    let text = cell_text(p, html);
    p.whitespace.replace_all(&text, " ").into_owned()
}

/// Numeric columns become int or float after dropping thousands
/// separators. Anything unparseable stays a string.
fn convert_value(field: &str, text: String) -> Value {
    if field != "area_km2" && field != "population" {
        return Value::String(text);
    }

    let cleaned = text.replace(',', "");
    let converted = if cleaned.contains('.') {
        cleaned
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
    } else {
        cleaned.parse::<i64>().ok().map(|n| Value::Number(n.into()))
    };

    converted.unwrap_or(Value::String(text))
}

/// Parse the country table out of a GeoNames country list page.
///
/// The first row carrying `<th>` cells supplies the headers. Data rows
/// whose cell count differs from the header count are dropped.
pub fn parse_country_table(html: &str) -> FetchResult<Vec<Record>> {
    let p = patterns()?;

    let table = p
        .table
        .captures(html)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| FetchError::Layout("no table with id \"countries\"".to_string()))?
        .as_str();

    let mut rows = p.row.captures_iter(table).filter_map(|caps| caps.get(1));

    let headers: Vec<String> = rows
        .by_ref()
        .map(|row| {
            p.header_cell
                .captures_iter(row.as_str())
                .filter_map(|c| c.get(1))
                .map(|m| header_text(p, m.as_str()))
                .collect::<Vec<_>>()
        })
        .find(|cells| !cells.is_empty())
        .ok_or_else(|| FetchError::Layout("country table has no header row".to_string()))?;

    let fields: Vec<String> = headers.iter().map(|h| field_name_for_header(h)).collect();

    let records = rows
        .filter_map(|row| {
            let cells: Vec<String> = p
                .data_cell
                .captures_iter(row.as_str())
                .filter_map(|c| c.get(1))
                .map(|m| cell_text(p, m.as_str()))
                .collect();

            if cells.len() != fields.len() {
                return None;
            }

            Some(
                fields
                    .iter()
                    .zip(cells)
                    .map(|(field, text)| (field.clone(), convert_value(field, text)))
                    .collect::<Record>(),
            )
        })
        .collect();

    Ok(records)
}
