//! `SchemaVersion` - Represents entries in the `schema_version` ledger table

use crate::executor::TideError;
use crate::row::{FromRow, SqliteRow, DATETIME_FORMAT};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Outcome of one migration script execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VersionStatus {
    Success,
    Error,
}

impl VersionStatus {
    /// The string persisted in the ledger's `status` column
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            VersionStatus::Success => "SUCCESS",
            VersionStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionStatus {
    type Err = TideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(VersionStatus::Success),
            "ERROR" => Ok(VersionStatus::Error),
            other => Err(TideError::Decode(format!(
                "unknown schema version status '{other}'"
            ))),
        }
    }
}

/// One row of the `schema_version` ledger
///
/// A record is appended the moment a script is identified as not yet
/// recorded, with status ERROR if execution failed and SUCCESS otherwise.
/// Once written it is immutable; retries append new rows rather than
/// updating old ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaVersion {
    /// Auto-incrementing ledger id (insertion order)
    pub id: i64,
    /// Script file name, the script's unique identity
    pub script: String,
    /// FNV-64 content checksum, persisted as a decimal string
    pub checksum: String,
    /// Human-readable execution duration (e.g. `"12.345ms"`)
    pub execution_time: String,
    /// Execution outcome
    pub status: VersionStatus,
    /// Store-generated insertion timestamp
    pub created_time: NaiveDateTime,
}

impl FromRow for SchemaVersion {
    fn from_row(row: &SqliteRow) -> Result<Self, TideError> {
        Ok(Self {
            id: row.get_i64("id")?,
            script: row.get_text("script")?,
            checksum: row.get_text("checksum")?,
            execution_time: row.get_text("execution_time")?,
            status: row.get_text("status")?.parse()?,
            created_time: row.get_datetime("created_time", DATETIME_FORMAT)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::SqliteValue;
    use std::sync::Arc;

    fn ledger_row(status: &str) -> SqliteRow {
        let columns = Arc::new(vec![
            "id".to_string(),
            "script".to_string(),
            "checksum".to_string(),
            "execution_time".to_string(),
            "status".to_string(),
            "created_time".to_string(),
        ]);
        SqliteRow::new(
            columns,
            vec![
                SqliteValue::Integer(3),
                SqliteValue::Text("001_init.sql".to_string()),
                SqliteValue::Text("14695981039346656037".to_string()),
                SqliteValue::Text("1.204s".to_string()),
                SqliteValue::Text(status.to_string()),
                SqliteValue::Text("2024-01-20 12:00:00".to_string()),
            ],
        )
    }

    #[test]
    fn test_from_row() {
        let record = SchemaVersion::from_row(&ledger_row("SUCCESS")).unwrap();
        assert_eq!(record.id, 3);
        assert_eq!(record.script, "001_init.sql");
        assert_eq!(record.checksum, "14695981039346656037");
        assert_eq!(record.execution_time, "1.204s");
        assert_eq!(record.status, VersionStatus::Success);
        assert_eq!(
            record.created_time.format(DATETIME_FORMAT).to_string(),
            "2024-01-20 12:00:00"
        );
    }

    #[test]
    fn test_from_row_rejects_unknown_status() {
        let err = SchemaVersion::from_row(&ledger_row("PENDING")).unwrap_err();
        assert!(err.to_string().contains("unknown schema version status"));
    }

    #[test]
    fn test_status_round_trip() {
        assert_eq!(VersionStatus::Success.as_str(), "SUCCESS");
        assert_eq!(VersionStatus::Error.as_str(), "ERROR");
        assert_eq!(
            "SUCCESS".parse::<VersionStatus>().unwrap(),
            VersionStatus::Success
        );
        assert_eq!(
            "ERROR".parse::<VersionStatus>().unwrap(),
            VersionStatus::Error
        );
    }

    #[test]
    fn test_status_serializes_as_ledger_string() {
        let json = serde_json::to_string(&VersionStatus::Error).unwrap();
        assert_eq!(json, "\"ERROR\"");
    }
}
