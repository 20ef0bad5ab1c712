//! Connection Module
//!
//! Provides connection establishment and liveness checks for the embedded
//! SQLite store.
//!
//! This module wraps `rusqlite::Connection` and provides:
//! - Data-source path validation
//! - Connection open with pragmas applied (WAL journal mode, busy timeout)
//! - Bounded retry with fixed delay for the initial open
//! - `SELECT 1` liveness ping

use rusqlite::Connection;
use std::fmt;
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Connection error type
#[derive(Debug)]
pub enum ConnectionError {
    /// Invalid data source (empty, or pointing at a directory)
    InvalidDataSource(String),
    /// SQLite error while opening the database
    Open(rusqlite::Error),
    /// Open still failing after the configured number of attempts
    RetriesExhausted {
        attempts: u32,
        source: rusqlite::Error,
    },
    /// Liveness check (`SELECT 1`) failed
    Ping(rusqlite::Error),
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::InvalidDataSource(s) => {
                write!(f, "Invalid data source: {s}")
            }
            ConnectionError::Open(e) => {
                write!(f, "SQLite open error: {e}")
            }
            ConnectionError::RetriesExhausted { attempts, source } => {
                write!(
                    f,
                    "Failed to open data source after {attempts} attempt(s): {source}"
                )
            }
            ConnectionError::Ping(e) => {
                write!(f, "Liveness check failed: {e}")
            }
        }
    }
}

impl std::error::Error for ConnectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectionError::InvalidDataSource(_) => None,
            ConnectionError::Open(e)
            | ConnectionError::RetriesExhausted { source: e, .. }
            | ConnectionError::Ping(e) => Some(e),
        }
    }
}

impl From<rusqlite::Error> for ConnectionError {
    fn from(err: rusqlite::Error) -> Self {
        ConnectionError::Open(err)
    }
}

/// Validates a data source before any open is attempted
///
/// # Supported Forms
///
/// - A filesystem path to the database file (created if absent)
/// - `:memory:` for an in-memory database
/// - A `file:` URI
///
/// # Errors
///
/// Returns `ConnectionError::InvalidDataSource` if the data source is empty
/// or names an existing directory.
pub fn validate_data_source(data_source: &str) -> Result<(), ConnectionError> {
    if data_source.is_empty() {
        return Err(ConnectionError::InvalidDataSource(
            "data source cannot be empty".to_string(),
        ));
    }

    if data_source == ":memory:" || data_source.starts_with("file:") {
        return Ok(());
    }

    if Path::new(data_source).is_dir() {
        return Err(ConnectionError::InvalidDataSource(format!(
            "data source {data_source} is a directory, expected a database file"
        )));
    }

    Ok(())
}

/// Opens a SQLite database and applies the standard pragmas
///
/// WAL journal mode keeps readers unblocked while a migration or write is in
/// flight; the busy timeout covers overlapping writers from the pool.
///
/// # Errors
///
/// Returns `ConnectionError::Open` if the database cannot be opened or a
/// pragma cannot be applied.
pub fn open(data_source: &str) -> Result<Connection, ConnectionError> {
    let conn = Connection::open(data_source).map_err(ConnectionError::Open)?;

    conn.busy_timeout(Duration::from_secs(5))
        .map_err(ConnectionError::Open)?;

    // journal_mode returns the resulting mode as a row, so query_row it
    let _mode: String = conn
        .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
        .map_err(ConnectionError::Open)?;

    Ok(conn)
}

/// Opens a SQLite database, retrying a bounded number of times with a fixed delay
///
/// This is the initial-open path used by the pool: the data source is
/// validated once, then `open` is attempted up to `attempts` times with
/// `delay` between attempts.
///
/// # Errors
///
/// Returns `ConnectionError::InvalidDataSource` without attempting an open if
/// validation fails, or `ConnectionError::RetriesExhausted` once every
/// attempt has failed.
pub fn open_with_retry(
    data_source: &str,
    attempts: u32,
    delay: Duration,
) -> Result<Connection, ConnectionError> {
    validate_data_source(data_source)?;

    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match open(data_source) {
            Ok(conn) => return Ok(conn),
            Err(ConnectionError::Open(e)) => {
                log::error!("retry [{attempt}] open data source error. {e}");
                if attempt >= attempts {
                    return Err(ConnectionError::RetriesExhausted {
                        attempts,
                        source: e,
                    });
                }
                thread::sleep(delay);
            }
            Err(other) => return Err(other),
        }
    }
}

/// Checks that a connection is alive by executing `SELECT 1`
///
/// # Errors
///
/// Returns `ConnectionError::Ping` if the query fails.
pub fn ping(conn: &Connection) -> Result<(), ConnectionError> {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .map(|_| ())
        .map_err(ConnectionError::Ping)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_data_source_valid() {
        let valid = vec![
            ":memory:",
            "file:shared?mode=memory&cache=shared",
            "/tmp/tidepool_nonexistent_test.db",
            "relative.db",
        ];

        for s in valid {
            assert!(validate_data_source(s).is_ok(), "Should validate: {}", s);
        }
    }

    #[test]
    fn test_validate_data_source_invalid() {
        assert!(validate_data_source("").is_err());

        let dir = std::env::temp_dir();
        assert!(validate_data_source(dir.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_open_and_ping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conn_test.db");
        let conn = open(path.to_str().unwrap()).expect("open should succeed");
        ping(&conn).expect("ping should succeed");
    }

    #[test]
    fn test_open_with_retry_exhausts_attempts() {
        // A database file inside a directory that does not exist cannot be opened
        let err = open_with_retry(
            "/nonexistent-tidepool-dir/sub/db.sqlite",
            2,
            Duration::from_millis(1),
        )
        .expect_err("open should fail");

        match err {
            ConnectionError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 2),
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[test]
    fn test_connection_error_display() {
        let err = ConnectionError::InvalidDataSource("test".to_string());
        assert!(err.to_string().contains("Invalid data source"));
    }
}
