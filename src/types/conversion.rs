//! Conversion of JSON cells into canonical values.
//!
//! The parsing helpers return `Result<T, String>` so callers can wrap the
//! message into their own error type; [`convert_value`] wraps them into
//! [`ConversionError`].

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;

use crate::error::ConversionError;
use crate::types::{CanonicalType, ColumnDescriptor, Value};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Converts one JSON cell according to the column's canonical type.
///
/// JSON `null` is always [`Value::Null`].
///
/// # Errors
/// Returns `ConversionError::InvalidValue` when the cell cannot represent the type.
pub fn convert_value(
    column: &ColumnDescriptor,
    raw: &JsonValue,
) -> Result<Value, ConversionError> {
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let invalid = || ConversionError::InvalidValue {
        column: column.name.clone(),
        target: column.canonical_type.to_string(),
        value: raw.to_string(),
    };

    match column.canonical_type {
        CanonicalType::Text => Ok(Value::Text(match raw {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        })),

        CanonicalType::Integer => parse_integer(raw).map(Value::Integer).ok_or_else(invalid),

        CanonicalType::Float => match raw {
            JsonValue::Number(n) => n.as_f64().map(Value::Float).ok_or_else(invalid),
            JsonValue::String(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| invalid()),
            _ => Err(invalid()),
        },

        CanonicalType::Boolean => match raw {
            JsonValue::Bool(b) => Ok(Value::Boolean(*b)),
            JsonValue::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Boolean(true)),
            JsonValue::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Boolean(false)),
            _ => Err(invalid()),
        },

        CanonicalType::Date => match raw {
            JsonValue::String(s) => parse_date(s).map(Value::Date).map_err(|_| invalid()),
            _ => Err(invalid()),
        },

        CanonicalType::Datetime => match raw {
            JsonValue::String(s) => parse_datetime(s).map(Value::Datetime).map_err(|_| invalid()),
            JsonValue::Number(n) => n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(|dt| Value::Datetime(dt.fixed_offset()))
                .ok_or_else(invalid),
            _ => Err(invalid()),
        },

        CanonicalType::Time => match raw {
            JsonValue::String(s) => parse_time(s).map(Value::Time).map_err(|_| invalid()),
            _ => Err(invalid()),
        },

        CanonicalType::BinaryText => match raw {
            JsonValue::String(s) => Ok(Value::BinaryText(s.clone())),
            _ => Err(invalid()),
        },

        CanonicalType::Unsupported => Err(invalid()),
    }
}

fn parse_integer(raw: &JsonValue) -> Option<i64> {
    match raw {
        JsonValue::Number(n) => n.as_i64().or_else(|| {
            // Aggregations over integer fields come back as 42.0
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parses a date string (YYYY-MM-DD), ignoring any time part.
pub fn parse_date(date_str: &str) -> Result<NaiveDate, String> {
    let date_part = date_str
        .split(['T', ' '])
        .next()
        .unwrap_or(date_str);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| format!("Invalid date: {date_str} ({e})"))
}

/// Parses a datetime string.
///
/// Supports RFC 3339 with an offset (`2024-01-15T10:30:00.000Z`), the same
/// without an offset or with a space separator (read as UTC), and a bare date.
pub fn parse_datetime(datetime_str: &str) -> Result<DateTime<FixedOffset>, String> {
    let trimmed = datetime_str.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt);
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc().fixed_offset());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc().fixed_offset());
    }

    Err(format!("Invalid datetime: {datetime_str}"))
}

/// Parses a time-of-day string. A trailing `Z` or `±hh:mm` offset is dropped.
pub fn parse_time(time_str: &str) -> Result<NaiveTime, String> {
    let trimmed = time_str.trim();
    let without_zone = trimmed.strip_suffix('Z').unwrap_or_else(|| {
        match trimmed.rfind(['+', '-']) {
            Some(idx) if idx > 0 => &trimmed[..idx],
            _ => trimmed,
        }
    });

    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(without_zone, format).ok())
        .ok_or_else(|| format!("Invalid time: {time_str}"))
}
