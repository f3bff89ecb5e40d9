//! Built-in conversion transforms.
//!
//! Each builtin has two faces: the source text emitted as the body of its
//! `__convert_<n>` routine, and an executable version used by the evaluator.
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::eval::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Builtin {
    /// Date strings to a normalized RFC 3339 timestamp.
    IsoDate,
    /// Decimal strings to integers; numbers pass through.
    IntString,
}

const ISO_DATE_SOURCE: &str = r#"if (value instanceof Date)
    return value;
const dt = typeof value === "string" ? Date.parse(value) : NaN;
if (isNaN(dt))
    throw new TypeError("Unable to convert to date. value: " + value);
return new Date(dt);"#;

const INT_STRING_SOURCE: &str = r#"if (typeof value === "number")
    return value;
const i = typeof value === "string" ? parseInt(value, 10) : NaN;
if (isNaN(i))
    throw new TypeError("Unable to convert to number. value: " + value);
return i;"#;

impl Builtin {
    pub fn source(self) -> &'static str {
        match self {
            Builtin::IsoDate => ISO_DATE_SOURCE,
            Builtin::IntString => INT_STRING_SOURCE,
        }
    }

    pub fn apply(self, value: Value) -> Result<Value, String> {
        match self {
            Builtin::IsoDate => iso_date(value),
            Builtin::IntString => int_string(value),
        }
    }
}

fn iso_date(value: Value) -> Result<Value, String> {
    let Value::String(src) = &value else {
        return Err(format!("Unable to convert to date. value: {}", value.display()));
    };
    let src = src.trim();
    match parse_date(src) {
        Some(utc) => Ok(Value::String(utc.to_rfc3339())),
        None => Err(format!("Unable to convert to date. value: {src}")),
    }
}

/// The ISO forms `Date.parse` accepts. Forms without an offset are read as
/// UTC.
fn parse_date(src: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(src) {
        return Some(dt.to_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(src, format) {
            return Some(dt.and_utc());
        }
    }
    let date = NaiveDate::parse_from_str(src, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{src}-01"), "%Y-%m-%d"))
        .or_else(|_| NaiveDate::parse_from_str(&format!("{src}-01-01"), "%Y-%m-%d"))
        .ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

fn int_string(value: Value) -> Result<Value, String> {
    match &value {
        Value::Number(_) => Ok(value),
        Value::String(s) => match leading_int(s) {
            Some(i) => Ok(Value::Number(i)),
            None => Err(format!("Unable to convert to number. value: {s}")),
        },
        other => Err(format!("Unable to convert to number. value: {}", other.display())),
    }
}

/// `parseInt(s, 10)`: optional sign and the longest digit prefix after
/// leading whitespace. Long digit runs lose precision instead of failing.
fn leading_int(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1.0, &s[1..]),
        Some(b'+') => (1.0, &s[1..]),
        _ => (1.0, s),
    };
    let end = rest.bytes().take_while(u8::is_ascii_digit).count();
    if end == 0 {
        return None;
    }
    rest[..end].parse::<f64>().ok().map(|n| sign * n)
}
