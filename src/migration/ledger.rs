//! Version ledger - the `schema_version` table
//!
//! The ledger records one row per applied or attempted migration script.
//! It is created lazily on the first migration run, mutated only by
//! appending rows, and never updated in place.

use crate::executor::{TideError, TideExecutor};
use crate::migration::record::{SchemaVersion, VersionStatus};
use crate::row::FromRow;

/// Name of the ledger table
pub const SCHEMA_VERSION_TABLE: &str = "schema_version";

const CREATE_LEDGER_SQL: &str = "\
CREATE TABLE IF NOT EXISTS schema_version
(
  id             INTEGER PRIMARY KEY AUTOINCREMENT,
  script         TEXT    NOT NULL,
  checksum       TEXT    NOT NULL,
  execution_time TEXT    NOT NULL,
  status         TEXT    NOT NULL,
  created_time   datetime default current_timestamp
);
";

const SELECT_VERSIONS_SQL: &str = "\
SELECT id, script, checksum, execution_time, status, created_time \
FROM schema_version ORDER BY id ASC";

const INSERT_VERSION_SQL: &str = "\
INSERT INTO schema_version (script, checksum, execution_time, status) \
VALUES (?1, ?2, ?3, ?4)";

/// Create the ledger table if it does not exist
///
/// Idempotent; safe to call on every startup.
///
/// # Errors
///
/// Returns `TideError` if the existence check or the DDL fails.
pub fn ensure_exists(executor: &dyn TideExecutor) -> Result<(), TideError> {
    if executor.has_table(SCHEMA_VERSION_TABLE)? {
        return Ok(());
    }
    log::info!("creating migration ledger table {SCHEMA_VERSION_TABLE}");
    executor.execute_batch(CREATE_LEDGER_SQL)
}

/// All ledger records in insertion order
///
/// Returns an empty vector (not an error) when the table has no rows.
///
/// # Errors
///
/// Returns `TideError` if the query fails, including when the ledger table
/// has never been created.
pub fn list_records(executor: &dyn TideExecutor) -> Result<Vec<SchemaVersion>, TideError> {
    let rows = executor.query_rows(SELECT_VERSIONS_SQL, &[])?;
    rows.iter().map(SchemaVersion::from_row).collect()
}

/// Append one ledger row
///
/// `id` and `created_time` are store-generated. No duplicate checking is
/// performed here; deciding whether a script was already recorded is the
/// runner's responsibility.
///
/// # Errors
///
/// Returns `TideError` if the insert fails.
pub fn append_record(
    executor: &dyn TideExecutor,
    script: &str,
    checksum: u64,
    execution_time: &str,
    status: VersionStatus,
) -> Result<(), TideError> {
    let checksum = checksum.to_string();
    executor.insert(
        INSERT_VERSION_SQL,
        &[&script, &checksum, &execution_time, &status.as_str()],
    )?;
    Ok(())
}

/// Pure lookup over an already-fetched record slice
///
/// When a script name appears multiple times (histories written by older
/// tooling; the runner itself never appends duplicates), the most recent
/// record wins, so the checksum comparison reflects the latest recorded
/// state.
#[must_use]
pub fn find_by_script<'a>(script: &str, records: &'a [SchemaVersion]) -> Option<&'a SchemaVersion> {
    // records are ordered by id ascending
    records.iter().rev().find(|record| record.script == script)
}

/// First record with status ERROR, if any
#[must_use]
pub fn first_error(records: &[SchemaVersion]) -> Option<&SchemaVersion> {
    records
        .iter()
        .find(|record| record.status == VersionStatus::Error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rusqlite::Connection;

    fn record(id: i64, script: &str, checksum: &str, status: VersionStatus) -> SchemaVersion {
        SchemaVersion {
            id,
            script: script.to_string(),
            checksum: checksum.to_string(),
            execution_time: "1ms".to_string(),
            status,
            created_time: NaiveDate::from_ymd_opt(2024, 1, 20)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_ensure_exists_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(!conn.has_table(SCHEMA_VERSION_TABLE).unwrap());

        ensure_exists(&conn).unwrap();
        assert!(conn.has_table(SCHEMA_VERSION_TABLE).unwrap());

        // second call is a no-op
        ensure_exists(&conn).unwrap();
        assert!(list_records(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_append_and_list_round_trip() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_exists(&conn).unwrap();

        append_record(&conn, "001_init.sql", 42, "1.2ms", VersionStatus::Success).unwrap();
        append_record(&conn, "002_seed.sql", 7, "300µs", VersionStatus::Error).unwrap();

        let records = list_records(&conn).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].script, "001_init.sql");
        assert_eq!(records[0].checksum, "42");
        assert_eq!(records[0].status, VersionStatus::Success);
        assert_eq!(records[1].script, "002_seed.sql");
        assert_eq!(records[1].status, VersionStatus::Error);
    }

    #[test]
    fn test_list_records_errors_without_ledger() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(list_records(&conn).is_err());
    }

    #[test]
    fn test_find_by_script_prefers_most_recent() {
        let records = vec![
            record(1, "001_init.sql", "111", VersionStatus::Success),
            record(2, "002_seed.sql", "222", VersionStatus::Success),
            record(3, "001_init.sql", "333", VersionStatus::Success),
        ];

        let found = find_by_script("001_init.sql", &records).unwrap();
        assert_eq!(found.id, 3);
        assert_eq!(found.checksum, "333");

        assert!(find_by_script("999_missing.sql", &records).is_none());
    }

    #[test]
    fn test_first_error() {
        let clean = vec![record(1, "001_init.sql", "111", VersionStatus::Success)];
        assert!(first_error(&clean).is_none());

        let broken = vec![
            record(1, "001_init.sql", "111", VersionStatus::Success),
            record(2, "002_seed.sql", "222", VersionStatus::Error),
            record(3, "003_more.sql", "333", VersionStatus::Error),
        ];
        assert_eq!(first_error(&broken).unwrap().id, 2);
    }
}
