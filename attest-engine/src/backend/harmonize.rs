//! Datatype harmonization.
//!
//! Platforms report datatypes under many names (`BIGINT`, `Int64`, `NUMBER`,
//! `varchar(64)`, ...). Schema comparison only works over a canonical set of
//! categories, so backends collapse their native names through this table
//! before any comparison happens.
//!
//! The canonical categories are `int`, `float`, `decimal`, `date`,
//! `timestamp`, `string`. Complex types (array, struct, map) pass through
//! unchanged and are excluded from datatype comparison. The mapping is
//! idempotent: canonical names map to themselves.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Exact (lowercased) platform type names per canonical category.
static EXACT_MAPPINGS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for name in [
        "int", "integer", "bigint", "smallint", "tinyint", "long", "short", "byte", "int8",
        "int16", "int32", "int64", "uint8", "uint16", "uint32", "uint64",
    ] {
        m.insert(name, "int");
    }
    for name in [
        "float", "double", "real", "float4", "float8", "float16", "float32", "float64",
        "double precision",
    ] {
        m.insert(name, "float");
    }
    for name in ["decimal", "numeric", "number", "bignumeric"] {
        m.insert(name, "decimal");
    }
    for name in ["date", "date32", "date64"] {
        m.insert(name, "date");
    }
    for name in ["timestamp", "datetime", "timestamptz", "timestamp_ntz", "timestamp_tz"] {
        m.insert(name, "timestamp");
    }
    for name in [
        "string", "varchar", "char", "text", "utf8", "largeutf8", "utf8view", "character varying",
    ] {
        m.insert(name, "string");
    }
    m
});

/// Parameterized platform type names, e.g. `decimal(18,2)` or
/// `Timestamp(Nanosecond, None)`.
static PATTERN_MAPPINGS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"^(decimal|numeric|number)\d*\s*\(").unwrap(), "decimal"),
        (Regex::new(r"^(varchar|char|character)\s*\(").unwrap(), "string"),
        (Regex::new(r"^(timestamp|datetime)\s*\(").unwrap(), "timestamp"),
        (Regex::new(r"^time\s*\(").unwrap(), "timestamp"),
        (Regex::new(r"^(int|integer|bigint)\s*\(").unwrap(), "int"),
        (Regex::new(r"^(float|double)\s*\(").unwrap(), "float"),
    ]
});

/// Returns true if the datatype name denotes a complex (nested) type.
///
/// Complex types are never harmonized and never datatype-compared.
pub fn is_complex_dtype(dtype: &str) -> bool {
    let lower = dtype.to_lowercase();
    lower.starts_with("array")
        || lower.starts_with("struct")
        || lower.starts_with("map")
        || lower.starts_with("list")
        || lower.starts_with("largelist")
        || lower.contains('<')
}

/// Collapses one platform datatype name into its canonical category.
///
/// Unknown simple types and complex types pass through unchanged.
pub fn harmonize_dtype(dtype: &str) -> String {
    if is_complex_dtype(dtype) {
        return dtype.to_string();
    }

    let lower = dtype.trim().to_lowercase();
    if let Some(canonical) = EXACT_MAPPINGS.get(lower.as_str()) {
        return (*canonical).to_string();
    }
    for (pattern, canonical) in PATTERN_MAPPINGS.iter() {
        if pattern.is_match(&lower) {
            return (*canonical).to_string();
        }
    }
    dtype.to_string()
}
