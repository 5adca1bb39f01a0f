//! Schema type definitions
//!
//! Supported scalar types:
//! - string: UTF-8 string
//! - int: integer
//! - float: non-integral number
//!
//! A field may accept a union of types (`int|float` for numeric fields).

use std::fmt;

use serde_json::Value;

/// A scalar JSON type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Int,
    Float,
}

impl FieldType {
    /// Returns the type name for messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
        }
    }

    /// Whether `value` is of this type. Integers are not floats.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Int => value.is_i64() || value.is_u64(),
            FieldType::Float => value.is_f64(),
        }
    }
}

/// Expected type of a field: one type or a union.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedType {
    One(FieldType),
    AnyOf(&'static [FieldType]),
}

impl ExpectedType {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ExpectedType::One(t) => t.matches(value),
            ExpectedType::AnyOf(types) => types.iter().any(|t| t.matches(value)),
        }
    }
}

impl fmt::Display for ExpectedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedType::One(t) => write!(f, "{}", t.type_name()),
            ExpectedType::AnyOf(types) => {
                let names: Vec<_> = types.iter().map(FieldType::type_name).collect();
                write!(f, "{}", names.join("|"))
            }
        }
    }
}

const NUMERIC: ExpectedType = ExpectedType::AnyOf(&[FieldType::Int, FieldType::Float]);
const TEXT: ExpectedType = ExpectedType::One(FieldType::String);

/// Fields every country record must carry.
pub const REQUIRED_FIELDS: &[&str] = &[
    "iso_alpha2",
    "iso_alpha3",
    "iso_numeric",
    "country_name",
    "continent",
];

/// Expected type per field, in declaration order.
pub const FIELD_TYPES: &[(&str, ExpectedType)] = &[
    ("iso_alpha2", TEXT),
    ("iso_alpha3", TEXT),
    ("iso_numeric", TEXT),
    ("fips", TEXT),
    ("country_name", TEXT),
    ("capital", TEXT),
    ("area_km2", NUMERIC),
    ("population", NUMERIC),
    ("continent", TEXT),
];

/// Continent codes accepted in the `continent` field.
pub const VALID_CONTINENTS: &[&str] = &["AF", "AS", "EU", "NA", "SA", "OC", "AN"];

/// Below this many records the dataset looks truncated.
pub const MIN_RECORD_COUNT: usize = 100;

/// The fixed country schema.
#[derive(Debug, Clone)]
pub struct CountrySchema {
    pub required_fields: &'static [&'static str],
    pub field_types: &'static [(&'static str, ExpectedType)],
    pub continent_field: &'static str,
    pub valid_continents: &'static [&'static str],
    pub alpha2_field: &'static str,
    pub alpha3_field: &'static str,
    pub min_record_count: usize,
}

impl CountrySchema {
    /// Schema of the GeoNames country list.
    pub fn geonames() -> Self {
        Self {
            required_fields: REQUIRED_FIELDS,
            field_types: FIELD_TYPES,
            continent_field: "continent",
            valid_continents: VALID_CONTINENTS,
            alpha2_field: "iso_alpha2",
            alpha3_field: "iso_alpha3",
            min_record_count: MIN_RECORD_COUNT,
        }
    }

    /// Expected type of `field`, if declared.
    pub fn expected_type(&self, field: &str) -> Option<ExpectedType> {
        self.field_types
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, t)| *t)
    }
}

impl Default for CountrySchema {
    fn default() -> Self {
        Self::geonames()
    }
}
