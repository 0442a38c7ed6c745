//! Row decoding helpers.
//!
//! libSQL rows are column-indexed and untyped beyond the storage class. These
//! helpers turn TEXT and INTEGER columns into typed values at the adapter
//! boundary so repos never hand raw strings upward.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde_json::{Map, Value};

use crate::error::DatabaseError;

/// Parse a required TEXT column as `DateTime<Utc>`.
///
/// Handles both RFC 3339 (`"2026-02-09T14:30:00+00:00"`) and `SQLite`'s default
/// format (`"2026-02-09 14:30:00"`).
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string cannot be parsed as either format.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Query(format!("Failed to parse datetime '{s}': {e}")))
}

/// Format a timestamp for a TEXT column.
///
/// Fixed microsecond precision keeps stored values ordered under plain string
/// comparison.
#[must_use]
pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time at the precision [`format_datetime`] stores.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Parse an optional TEXT column as `Option<DateTime<Utc>>`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if a non-empty string cannot be parsed.
pub fn parse_optional_datetime(s: Option<&str>) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(parse_datetime(s)?)),
        _ => Ok(None),
    }
}

/// Parse a TEXT column into a serde-deserializable enum.
///
/// # Errors
///
/// Returns `DatabaseError::InvalidState` if the string does not match any variant.
pub fn parse_enum<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, DatabaseError> {
    serde_json::from_value(Value::String(s.to_string()))
        .map_err(|e| DatabaseError::InvalidState(format!("Failed to parse enum from '{s}': {e}")))
}

/// Read a nullable TEXT column. Returns `None` for both SQL NULL and empty string.
///
/// `row.get::<String>(idx)` on a NULL column returns an error, not `""`.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row.get::<Option<String>>(idx)? {
        Some(s) if s.is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// Parse a JSON TEXT column.
///
/// # Errors
///
/// Returns `DatabaseError::InvalidState` naming the column on malformed JSON.
pub fn parse_json(column: &str, s: &str) -> Result<Value, DatabaseError> {
    serde_json::from_str(s)
        .map_err(|e| DatabaseError::InvalidState(format!("Invalid JSON in column '{column}': {e}")))
}

/// Parse a JSON TEXT column that must hold an object.
///
/// # Errors
///
/// Returns `DatabaseError::InvalidState` on malformed JSON or a non-object value.
pub fn parse_json_object(column: &str, s: &str) -> Result<Map<String, Value>, DatabaseError> {
    match parse_json(column, s)? {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::InvalidState(format!(
            "Column '{column}' holds {other} instead of a JSON object"
        ))),
    }
}

/// Serialize a value for a JSON TEXT column.
///
/// # Errors
///
/// Returns `DatabaseError::Other` if serialization fails.
pub fn to_json_text<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::Other(e.into()))
}

/// Decode a stored INTEGER version.
///
/// # Errors
///
/// Returns `DatabaseError::InvalidState` for a negative value.
pub fn version_from_db(raw: i64) -> Result<u64, DatabaseError> {
    u64::try_from(raw).map_err(|_| DatabaseError::InvalidState(format!("negative version {raw}")))
}

/// Encode a version for an INTEGER column.
///
/// # Errors
///
/// Returns `DatabaseError::InvalidState` when the version exceeds `i64::MAX`.
pub fn version_to_db(version: u64) -> Result<i64, DatabaseError> {
    i64::try_from(version)
        .map_err(|_| DatabaseError::InvalidState(format!("version {version} out of range")))
}
