//! Row Model
//!
//! Typed values, rows, and row sets produced by queries, plus the `FromRow`
//! trait for decoding rows into concrete structs.
//!
//! Query results are drained from the underlying lazy cursor at query time:
//! a [`RowSet`] is a finite, restartable sequence that never holds a
//! statement handle across the API boundary.

use crate::executor::TideError;
use chrono::NaiveDateTime;
use rusqlite::types::Value;
use std::sync::Arc;

/// Datetime format used for SQLite TEXT datetime columns.
///
/// This matches what `CURRENT_TIMESTAMP` / `datetime('now')` produce. All
/// datetime decoding takes the format as an explicit argument; this constant
/// is the convention, not an implicit default.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single SQLite value, mirroring SQLite's storage classes
#[derive(Debug, Clone, PartialEq)]
pub enum SqliteValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<Value> for SqliteValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => SqliteValue::Null,
            Value::Integer(i) => SqliteValue::Integer(i),
            Value::Real(f) => SqliteValue::Real(f),
            Value::Text(s) => SqliteValue::Text(s),
            Value::Blob(b) => SqliteValue::Blob(b),
        }
    }
}

impl SqliteValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqliteValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqliteValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as an `f64`. Integers are promoted, since SQLite
    /// columns are dynamically typed and a REAL column may store integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqliteValue::Real(f) => Some(*f),
            SqliteValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqliteValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            SqliteValue::Blob(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the value as a boolean. SQLite has no boolean storage class;
    /// any nonzero integer is `true`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqliteValue::Integer(i) => Some(*i != 0),
            _ => None,
        }
    }

    /// Parses a TEXT value as a datetime using the given format string.
    ///
    /// The format is an explicit argument; pass [`DATETIME_FORMAT`] for
    /// columns populated by `CURRENT_TIMESTAMP`.
    pub fn as_datetime(&self, format: &str) -> Option<NaiveDateTime> {
        self.as_str()
            .and_then(|s| NaiveDateTime::parse_from_str(s, format).ok())
    }

    /// Name of the storage class, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            SqliteValue::Null => "NULL",
            SqliteValue::Integer(_) => "INTEGER",
            SqliteValue::Real(_) => "REAL",
            SqliteValue::Text(_) => "TEXT",
            SqliteValue::Blob(_) => "BLOB",
        }
    }
}

/// One result row: an ordered mapping of column name to value
///
/// The column header is shared across all rows of one result set.
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteRow {
    columns: Arc<Vec<String>>,
    values: Vec<SqliteValue>,
}

impl SqliteRow {
    /// Builds a row from a shared column header and its values.
    ///
    /// Mainly useful for tests and custom executor implementations; ordinary
    /// code receives rows from `query_rows`.
    pub fn new(columns: Arc<Vec<String>>, values: Vec<SqliteValue>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Value by column name
    pub fn get(&self, column: &str) -> Option<&SqliteValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    /// Value by position
    pub fn value(&self, idx: usize) -> Option<&SqliteValue> {
        self.values.get(idx)
    }

    pub fn values(&self) -> &[SqliteValue] {
        &self.values
    }

    fn require(&self, column: &str) -> Result<&SqliteValue, TideError> {
        self.get(column).ok_or_else(|| {
            TideError::Decode(format!("column `{column}` is not present in the result row"))
        })
    }

    fn decode_mismatch(column: &str, expected: &str, value: &SqliteValue) -> TideError {
        TideError::Decode(format!(
            "column `{column}`: expected {expected}, found {}",
            value.type_name()
        ))
    }

    /// # Errors
    ///
    /// Returns `TideError::Decode` if the column is missing or not an INTEGER.
    pub fn get_i64(&self, column: &str) -> Result<i64, TideError> {
        let value = self.require(column)?;
        value
            .as_i64()
            .ok_or_else(|| Self::decode_mismatch(column, "INTEGER", value))
    }

    /// # Errors
    ///
    /// Returns `TideError::Decode` if the column is missing or neither REAL
    /// nor INTEGER.
    pub fn get_f64(&self, column: &str) -> Result<f64, TideError> {
        let value = self.require(column)?;
        value
            .as_f64()
            .ok_or_else(|| Self::decode_mismatch(column, "REAL", value))
    }

    /// # Errors
    ///
    /// Returns `TideError::Decode` if the column is missing or not TEXT.
    pub fn get_text(&self, column: &str) -> Result<String, TideError> {
        let value = self.require(column)?;
        value
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| Self::decode_mismatch(column, "TEXT", value))
    }

    /// # Errors
    ///
    /// Returns `TideError::Decode` if the column is missing or not a BLOB.
    pub fn get_blob(&self, column: &str) -> Result<Vec<u8>, TideError> {
        let value = self.require(column)?;
        value
            .as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Self::decode_mismatch(column, "BLOB", value))
    }

    /// # Errors
    ///
    /// Returns `TideError::Decode` if the column is missing or not an INTEGER.
    pub fn get_bool(&self, column: &str) -> Result<bool, TideError> {
        let value = self.require(column)?;
        value
            .as_bool()
            .ok_or_else(|| Self::decode_mismatch(column, "INTEGER", value))
    }

    /// Decodes a TEXT column as a datetime with an explicit format string
    ///
    /// # Errors
    ///
    /// Returns `TideError::Decode` if the column is missing, not TEXT, or
    /// does not parse with the given format.
    pub fn get_datetime(&self, column: &str, format: &str) -> Result<NaiveDateTime, TideError> {
        let text = self.get_text(column)?;
        NaiveDateTime::parse_from_str(&text, format).map_err(|e| {
            TideError::Decode(format!(
                "column `{column}`: cannot parse '{text}' with format '{format}': {e}"
            ))
        })
    }
}

/// The finite, restartable result of one query
///
/// `iter()` can be called any number of times; the rows were materialized
/// when the query ran.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    rows: Vec<SqliteRow>,
}

impl RowSet {
    pub fn new(rows: Vec<SqliteRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&SqliteRow> {
        self.rows.first()
    }

    pub fn rows(&self) -> &[SqliteRow] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SqliteRow> {
        self.rows.iter()
    }
}

impl IntoIterator for RowSet {
    type Item = SqliteRow;
    type IntoIter = std::vec::IntoIter<SqliteRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a RowSet {
    type Item = &'a SqliteRow;
    type IntoIter = std::slice::Iter<'a, SqliteRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Trait for decoding a row into a concrete type
///
/// This is the generic deserialization seam: implement it for a struct and
/// use `query_as` / `find_as` to get typed results.
pub trait FromRow: Sized {
    /// # Errors
    ///
    /// Returns `TideError::Decode` when a column is missing or has an
    /// unexpected storage class.
    fn from_row(row: &SqliteRow) -> Result<Self, TideError>;
}
