use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Serialize, Serializer};

use crate::error::{StageError, StageResult};

/// Serial numbers past this day fall after 9999-12-31.
const MAX_SERIAL_DAYS: f64 = 2_958_466.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Boolean(bool),
    Integer(i64),
    Unsigned(u64),
    Float32(f32),
    Float64(f64),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Unsigned(u) => u.to_string(),
            Value::Float32(f) => f.to_string(),
            Value::Float64(f) => f.to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Boolean(_) => "bool",
            Value::Integer(_) => "signed integer",
            Value::Unsigned(_) => "unsigned integer",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::DateTime(_) => "datetime",
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Value::String(s) => s,
            other => other.as_display(),
        }
    }

    pub fn try_bool(&self, field: &str) -> StageResult<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            other => Err(mismatch(field, "bool", other)),
        }
    }

    pub fn try_i64(&self, field: &str) -> StageResult<i64> {
        match self {
            Value::Integer(i) => Ok(*i),
            Value::Unsigned(u) => i64::try_from(*u).map_err(|_| mismatch(field, "i64", self)),
            other => Err(mismatch(field, "i64", other)),
        }
    }

    pub fn try_u64(&self, field: &str) -> StageResult<u64> {
        match self {
            Value::Unsigned(u) => Ok(*u),
            Value::Integer(i) => u64::try_from(*i).map_err(|_| mismatch(field, "u64", self)),
            other => Err(mismatch(field, "u64", other)),
        }
    }

    pub fn try_f64(&self, field: &str) -> StageResult<f64> {
        match self {
            Value::Float64(f) => Ok(*f),
            Value::Float32(f) => Ok(f64::from(*f)),
            other => Err(mismatch(field, "f64", other)),
        }
    }

    pub fn try_f32(&self, field: &str) -> StageResult<f32> {
        match self {
            Value::Float32(f) => Ok(*f),
            other => Err(mismatch(field, "f32", other)),
        }
    }

    pub fn try_datetime(&self, field: &str) -> StageResult<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Ok(*dt),
            other => Err(mismatch(field, "datetime", other)),
        }
    }
}

fn mismatch(field: &str, expected: &str, found: &Value) -> StageError {
    StageError::Assign {
        field: field.to_string(),
        message: format!("expected {expected}, got {}", found.type_name()),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Unsigned(u) => serializer.serialize_u64(*u),
            Value::Float32(f) => serializer.serialize_f32(*f),
            Value::Float64(f) => serializer.serialize_f64(*f),
            Value::DateTime(dt) => {
                serializer.serialize_str(&dt.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
        }
    }
}

/// Parses a number the way a spreadsheet cell would report it.
pub fn parse_cell_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Boolean reading of a cell: spreadsheet `TRUE`/`FALSE` literals or any number (non-zero is true).
pub fn parse_cell_bool(text: &str) -> Option<bool> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        return Some(true);
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return Some(false);
    }
    parse_cell_number(trimmed).map(|n| n != 0.0)
}

/// Converts a spreadsheet serial number (1900 date system) into a timestamp.
pub fn datetime_from_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..MAX_SERIAL_DAYS).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * SECONDS_PER_DAY).round() as i64;
    epoch.checked_add_signed(TimeDelta::try_seconds(seconds)?)
}

pub fn parse_naive_date(value: &str) -> StageResult<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(parsed);
        }
    }
    Err(StageError::coercion(
        value,
        "date",
        "unrecognized date format",
    ))
}

pub fn parse_naive_datetime(value: &str) -> StageResult<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    let trimmed = value.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(parsed);
        }
    }
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.naive_utc());
    }
    if let Ok(date) = parse_naive_date(trimmed)
        && let Some(midnight) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(midnight);
    }
    Err(StageError::coercion(
        value,
        "datetime",
        "unrecognized date/time format",
    ))
}

/// Date/time reading of a cell: serial numbers first, then textual formats.
pub fn parse_cell_datetime(text: &str) -> Option<NaiveDateTime> {
    match parse_cell_number(text) {
        Some(serial) => datetime_from_serial(serial),
        None => parse_naive_datetime(text).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_numbers_follow_the_1900_date_system() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(datetime_from_serial(45418.5), Some(expected));
        assert_eq!(datetime_from_serial(-1.0), None);
        assert_eq!(datetime_from_serial(f64::NAN), None);
    }

    #[test]
    fn parse_naive_datetime_accepts_dates_and_timestamps() {
        let expected =
            NaiveDateTime::parse_from_str("2024-05-06 14:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(
            parse_naive_datetime("2024-05-06T14:30:00").unwrap(),
            expected
        );
        assert_eq!(
            parse_naive_datetime("06/05/2024 14:30:00").unwrap(),
            expected
        );
        assert_eq!(
            parse_naive_datetime("2024-05-06").unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 6)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert!(parse_naive_datetime("last tuesday").is_err());
    }

    #[test]
    fn cell_bool_reads_literals_and_numbers() {
        assert_eq!(parse_cell_bool("TRUE"), Some(true));
        assert_eq!(parse_cell_bool("false"), Some(false));
        assert_eq!(parse_cell_bool("0"), Some(false));
        assert_eq!(parse_cell_bool("2.5"), Some(true));
        assert_eq!(parse_cell_bool("maybe"), None);
        assert_eq!(parse_cell_bool(""), None);
    }

    #[test]
    fn typed_accessors_report_mismatches() {
        assert_eq!(Value::Integer(7).try_i64("Year").unwrap(), 7);
        assert_eq!(Value::Float32(1.5).try_f64("Yield").unwrap(), 1.5);
        let err = Value::String("x".into()).try_bool("Flag").unwrap_err();
        assert!(err.to_string().contains("expected bool"));
        assert!(Value::Integer(-1).try_u64("Count").is_err());
    }
}
