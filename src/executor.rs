//! `TideExecutor` Module
//!
//! Provides the `TideExecutor` trait that abstracts statement execution over
//! `rusqlite`.
//!
//! This trait is the seam between the data-access surface and the storage
//! engine: the migration runner, the version ledger, and the client helpers
//! all speak to it, so they work unchanged against a raw connection, a
//! pooled connection, or a transaction.

use crate::connection::ConnectionError;
use crate::migration::MigrationError;
use crate::row::{FromRow, RowSet, SqliteRow, SqliteValue};
use rusqlite::types::Value;
use rusqlite::{Connection, ToSql};
use std::fmt;
use std::sync::Arc;

/// Table-existence probe against the catalog
const SQLITE_MASTER_COUNT_SQL: &str =
    "SELECT count(1) FROM sqlite_master WHERE type = 'table' AND name = ?1";

/// Storage-level error type
#[derive(Debug)]
pub enum TideError {
    /// SQLite error from `rusqlite`
    Sqlite(rusqlite::Error),
    /// Query shape error (e.g. a scalar query returning no rows)
    Query(String),
    /// Row decoding error
    Decode(String),
    /// No pooled connection became available in time
    PoolTimeout(String),
    /// Connection establishment error
    Connection(ConnectionError),
    /// Migration subsystem error
    Migration(Box<MigrationError>),
    /// Other execution errors
    Other(String),
}

impl fmt::Display for TideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TideError::Sqlite(e) => {
                write!(f, "SQLite error: {e}")
            }
            TideError::Query(s) => {
                write!(f, "Query error: {s}")
            }
            TideError::Decode(s) => {
                write!(f, "Decode error: {s}")
            }
            TideError::PoolTimeout(s) => {
                write!(f, "Pool timeout: {s}")
            }
            TideError::Connection(e) => {
                write!(f, "Connection error: {e}")
            }
            TideError::Migration(e) => {
                write!(f, "Migration error: {e}")
            }
            TideError::Other(s) => {
                write!(f, "Execution error: {s}")
            }
        }
    }
}

impl std::error::Error for TideError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TideError::Sqlite(e) => Some(e),
            TideError::Connection(e) => Some(e),
            TideError::Migration(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for TideError {
    fn from(err: rusqlite::Error) -> Self {
        TideError::Sqlite(err)
    }
}

impl From<ConnectionError> for TideError {
    fn from(err: ConnectionError) -> Self {
        TideError::Connection(err)
    }
}

impl From<MigrationError> for TideError {
    fn from(err: MigrationError) -> Self {
        TideError::Migration(Box::new(err))
    }
}

/// Trait for executing database operations
///
/// Implemented for `rusqlite::Connection`, [`crate::pool::PooledConnection`],
/// and [`crate::transaction::Transaction`], so callers can be written once
/// against `&dyn TideExecutor`.
pub trait TideExecutor {
    /// Execute a SQL statement and return the number of rows affected
    ///
    /// # Arguments
    ///
    /// * `sql` - SQL statement (positional parameters `?1`, `?2`, ...)
    /// * `params` - Parameters to bind
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the statement fails.
    fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> Result<usize, TideError>;

    /// Execute a multi-statement batch (DDL, migration scripts)
    ///
    /// # Errors
    ///
    /// Returns `TideError` if any statement in the batch fails.
    fn execute_batch(&self, sql: &str) -> Result<(), TideError>;

    /// Execute an INSERT and return the last inserted rowid
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the statement fails.
    fn insert(&self, sql: &str, params: &[&dyn ToSql]) -> Result<i64, TideError>;

    /// Execute a query and return all rows, materialized
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query or row extraction fails.
    fn query_rows(&self, sql: &str, params: &[&dyn ToSql]) -> Result<RowSet, TideError>;

    /// Execute a query and return the first row, if any
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    fn query_first(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Option<SqliteRow>, TideError> {
        Ok(self.query_rows(sql, params)?.into_iter().next())
    }

    /// Execute a query and decode every row into `T`
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails or any row does not decode.
    fn query_as<T: FromRow>(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<T>, TideError>
    where
        Self: Sized,
    {
        let rows = self.query_rows(sql, params)?;
        rows.iter().map(T::from_row).collect()
    }

    /// Execute a query and decode the first row into `T`, if any
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails or the row does not decode.
    fn query_first_as<T: FromRow>(
        &self,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<Option<T>, TideError>
    where
        Self: Sized,
    {
        self.query_first(sql, params)?
            .map(|row| T::from_row(&row))
            .transpose()
    }

    /// Execute a scalar query and return the first column of the first row as `i64`
    ///
    /// Used for `count(...)` queries and table-existence checks.
    ///
    /// # Errors
    ///
    /// Returns `TideError::Query` if no row comes back, or `TideError::Decode`
    /// if the first column is not an integer.
    fn query_scalar_count(&self, sql: &str, params: &[&dyn ToSql]) -> Result<i64, TideError> {
        let rows = self.query_rows(sql, params)?;
        let row = rows
            .first()
            .ok_or_else(|| TideError::Query(format!("scalar query returned no rows: {sql}")))?;
        let value = row
            .value(0)
            .ok_or_else(|| TideError::Query(format!("scalar query returned no columns: {sql}")))?;
        value.as_i64().ok_or_else(|| {
            TideError::Decode(format!(
                "scalar query column 0: expected INTEGER, found {}",
                value.type_name()
            ))
        })
    }

    /// Execute a `SELECT count(...)` query
    ///
    /// # Errors
    ///
    /// See [`TideExecutor::query_scalar_count`].
    fn count(&self, sql: &str, params: &[&dyn ToSql]) -> Result<i64, TideError> {
        self.query_scalar_count(sql, params)
    }

    /// Check whether a table exists
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the catalog query fails.
    fn has_table(&self, table: &str) -> Result<bool, TideError> {
        let count = self.query_scalar_count(SQLITE_MASTER_COUNT_SQL, &[&table])?;
        Ok(count > 0)
    }
}

impl TideExecutor for Connection {
    fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> Result<usize, TideError> {
        Connection::execute(self, sql, params).map_err(TideError::Sqlite)
    }

    fn execute_batch(&self, sql: &str) -> Result<(), TideError> {
        Connection::execute_batch(self, sql).map_err(TideError::Sqlite)
    }

    fn insert(&self, sql: &str, params: &[&dyn ToSql]) -> Result<i64, TideError> {
        Connection::execute(self, sql, params).map_err(TideError::Sqlite)?;
        Ok(self.last_insert_rowid())
    }

    fn query_rows(&self, sql: &str, params: &[&dyn ToSql]) -> Result<RowSet, TideError> {
        let mut stmt = self.prepare(sql).map_err(TideError::Sqlite)?;
        let columns: Arc<Vec<String>> = Arc::new(
            stmt.column_names()
                .iter()
                .map(|c| (*c).to_string())
                .collect(),
        );
        let column_count = columns.len();

        let mut rows = stmt.query(params).map_err(TideError::Sqlite)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(TideError::Sqlite)? {
            let mut values = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                let value: Value = row.get(idx).map_err(TideError::Sqlite)?;
                values.push(SqliteValue::from(value));
            }
            out.push(SqliteRow::new(Arc::clone(&columns), values));
        }

        Ok(RowSet::new(out))
    }
}
