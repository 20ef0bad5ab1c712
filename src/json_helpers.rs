//! JSON serialization helpers for Tidepool
//!
//! Converts rows and row sets into `serde_json::Value` for callers that ship
//! query results straight to an API response or a log line.
//!
//! Non-finite floats have no JSON number representation, so they are
//! rendered as the strings `"NaN"`, `"Infinity"`, and `"-Infinity"`; lenient
//! deserializers can round-trip them.

use crate::row::{RowSet, SqliteRow, SqliteValue};
use serde_json::{Map, Value as JsonValue};

/// Convert a single SQLite value to JSON
///
/// Blobs become arrays of byte values.
#[must_use]
pub fn value_to_json(value: &SqliteValue) -> JsonValue {
    match value {
        SqliteValue::Null => JsonValue::Null,
        SqliteValue::Integer(i) => JsonValue::from(*i),
        SqliteValue::Real(f) => {
            if f.is_nan() {
                JsonValue::from("NaN")
            } else if f.is_infinite() {
                if *f > 0.0 {
                    JsonValue::from("Infinity")
                } else {
                    JsonValue::from("-Infinity")
                }
            } else {
                serde_json::Number::from_f64(*f)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null)
            }
        }
        SqliteValue::Text(s) => JsonValue::from(s.clone()),
        SqliteValue::Blob(b) => JsonValue::Array(b.iter().map(|byte| JsonValue::from(*byte)).collect()),
    }
}

/// Convert a row to a JSON object keyed by column name
#[must_use]
pub fn row_to_json(row: &SqliteRow) -> JsonValue {
    let mut map = Map::new();
    for column in row.columns() {
        if let Some(value) = row.get(column) {
            map.insert(column.clone(), value_to_json(value));
        }
    }
    JsonValue::Object(map)
}

/// Convert a row set to a JSON array of objects
#[must_use]
pub fn rows_to_json(rows: &RowSet) -> JsonValue {
    JsonValue::Array(rows.iter().map(row_to_json).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_value_to_json_basic_types() {
        assert_eq!(value_to_json(&SqliteValue::Null), JsonValue::Null);
        assert_eq!(value_to_json(&SqliteValue::Integer(42)), json!(42));
        assert_eq!(value_to_json(&SqliteValue::Real(1.5)), json!(1.5));
        assert_eq!(
            value_to_json(&SqliteValue::Text("otter".to_string())),
            json!("otter")
        );
        assert_eq!(
            value_to_json(&SqliteValue::Blob(vec![1, 2, 3])),
            json!([1, 2, 3])
        );
    }

    #[test]
    fn test_non_finite_floats_become_strings() {
        assert_eq!(value_to_json(&SqliteValue::Real(f64::NAN)), json!("NaN"));
        assert_eq!(
            value_to_json(&SqliteValue::Real(f64::INFINITY)),
            json!("Infinity")
        );
        assert_eq!(
            value_to_json(&SqliteValue::Real(f64::NEG_INFINITY)),
            json!("-Infinity")
        );
    }

    #[test]
    fn test_row_to_json() {
        let columns = Arc::new(vec!["id".to_string(), "name".to_string()]);
        let row = SqliteRow::new(
            columns,
            vec![
                SqliteValue::Integer(1),
                SqliteValue::Text("otter".to_string()),
            ],
        );
        assert_eq!(row_to_json(&row), json!({"id": 1, "name": "otter"}));

        let set = RowSet::new(vec![row]);
        assert_eq!(rows_to_json(&set), json!([{"id": 1, "name": "otter"}]));
    }
}
