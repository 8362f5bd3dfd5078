//! Raw cell/text to typed [`Value`] conversion.
//!
//! Floating point targets never yield infinities: anything that reads as
//! infinite is clamped to the type's largest finite magnitude because the
//! staging stores reject infinity.

use chrono::NaiveDateTime;

use crate::{
    data::{Value, parse_cell_bool, parse_cell_datetime, parse_cell_number},
    error::{StageError, StageResult},
    schema::{FieldType, IntWidth},
    sheet::Cell,
};

const TRUTHY_PREFIXES: &[char] = &['Y', 'y', 'T', 't', '1'];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoercionOptions {
    pub error_on_nan: bool,
}

/// A value before coercion: literal text (header names, constants) or a sheet cell.
#[derive(Debug, Clone, Copy)]
pub enum RawValue<'a> {
    Text(&'a str),
    Cell(&'a Cell),
}

impl<'a> RawValue<'a> {
    /// A cell that may lie past the end of its row; missing cells read as empty text.
    pub fn from_cell(cell: Option<&'a Cell>) -> Self {
        match cell {
            Some(cell) => RawValue::Cell(cell),
            None => RawValue::Text(""),
        }
    }

    pub fn text(&self) -> &'a str {
        match self {
            RawValue::Text(text) => text,
            RawValue::Cell(cell) => cell.text(),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Text(text) => parse_cell_number(text),
            RawValue::Cell(cell) => cell.as_f64(),
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            RawValue::Text(text) => parse_cell_bool(text),
            RawValue::Cell(cell) => cell.as_bool(),
        }
    }

    fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            RawValue::Text(text) => parse_cell_datetime(text),
            RawValue::Cell(cell) => cell.as_datetime(),
        }
    }
}

/// The value a field holds when no rule populates it.
pub fn zero_value(target: &FieldType) -> Value {
    match target {
        FieldType::String => Value::String(String::new()),
        FieldType::Boolean => Value::Boolean(false),
        FieldType::Signed(_) => Value::Integer(0),
        FieldType::Unsigned(_) => Value::Unsigned(0),
        FieldType::Float32 => Value::Float32(0.0),
        FieldType::Float64 => Value::Float64(0.0),
        FieldType::DateTime => Value::DateTime(NaiveDateTime::default()),
    }
}

pub fn coerce(
    raw: RawValue<'_>,
    target: &FieldType,
    options: CoercionOptions,
) -> StageResult<Value> {
    match target {
        FieldType::String => Ok(Value::String(raw.text().to_string())),
        FieldType::Boolean => Ok(Value::Boolean(coerce_bool(raw))),
        FieldType::Signed(width) => coerce_signed(raw, *width).map(Value::Integer),
        FieldType::Unsigned(width) => coerce_unsigned(raw, *width).map(Value::Unsigned),
        FieldType::Float32 => coerce_float(raw, target, options, f64::from(f32::MAX))
            .map(|f| Value::Float32(f as f32)),
        FieldType::Float64 => coerce_float(raw, target, options, f64::MAX).map(Value::Float64),
        FieldType::DateTime => raw.as_datetime().map(Value::DateTime).ok_or_else(|| {
            StageError::coercion(raw.text(), target.as_str(), "not a date/time value")
        }),
    }
}

fn coerce_bool(raw: RawValue<'_>) -> bool {
    if raw.as_bool() == Some(true) {
        return true;
    }
    let text = raw.text();
    if text.starts_with(TRUTHY_PREFIXES) {
        return true;
    }
    let lowered = text.to_lowercase();
    lowered.contains("true") || lowered.contains("yes")
}

/// Integer reading of the raw value. Integral spreadsheet numbers such as `500.0` are accepted.
fn parse_integer(raw: RawValue<'_>, target: &str) -> StageResult<i128> {
    let text = raw.text().trim();
    if let Ok(parsed) = text.parse::<i128>() {
        return Ok(parsed);
    }
    match raw.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1.9e19 => Ok(f as i128),
        _ => Err(StageError::coercion(raw.text(), target, "not an integer")),
    }
}

fn coerce_signed(raw: RawValue<'_>, width: IntWidth) -> StageResult<i64> {
    let target = FieldType::Signed(width);
    let parsed = parse_integer(raw, target.as_str())?;
    let (min, max) = width.signed_range();
    if parsed < i128::from(min) || parsed > i128::from(max) {
        return Err(StageError::coercion(
            raw.text(),
            target.as_str(),
            format!("outside the {}-bit signed range", width.bits()),
        ));
    }
    Ok(parsed as i64)
}

fn coerce_unsigned(raw: RawValue<'_>, width: IntWidth) -> StageResult<u64> {
    let target = FieldType::Unsigned(width);
    let parsed = parse_integer(raw, target.as_str())?;
    if parsed < 0 || parsed > i128::from(width.unsigned_max()) {
        return Err(StageError::coercion(
            raw.text(),
            target.as_str(),
            format!("outside the {}-bit unsigned range", width.bits()),
        ));
    }
    Ok(parsed as u64)
}

fn coerce_float(
    raw: RawValue<'_>,
    target: &FieldType,
    options: CoercionOptions,
    max_finite: f64,
) -> StageResult<f64> {
    let text = raw.text();
    if text.contains("inf") {
        return Ok(clamp_infinite(text.contains('-'), max_finite));
    }
    let parsed = match target {
        FieldType::Float32 => text.trim().parse::<f32>().ok().map(f64::from),
        _ => raw.as_f64(),
    };
    match parsed {
        Some(f) if f.is_infinite() => Ok(clamp_infinite(f.is_sign_negative(), max_finite)),
        Some(f) => Ok(f),
        None if options.error_on_nan => Err(StageError::coercion(
            text,
            target.as_str(),
            "not a number",
        )),
        None => Ok(f64::NAN),
    }
}

fn clamp_infinite(negative: bool, max_finite: f64) -> f64 {
    if negative { -max_finite } else { max_finite }
}
