//! Transaction Module
//!
//! Scoped transaction support over a checked-out connection.
//!
//! A [`Transaction`] implements [`TideExecutor`], so queries and statements
//! inside the transaction go through the same seam as everything else.
//! Dropping a transaction that was neither committed nor rolled back rolls
//! it back.

use crate::executor::{TideError, TideExecutor};
use crate::row::RowSet;
use rusqlite::{Connection, ToSql};

/// SQLite transaction locking behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionBehavior {
    /// Acquire locks lazily, on first read/write (SQLite default)
    #[default]
    Deferred,
    /// Acquire the write lock immediately
    Immediate,
    /// Acquire an exclusive lock immediately
    Exclusive,
}

impl TransactionBehavior {
    fn begin_sql(self) -> &'static str {
        match self {
            TransactionBehavior::Deferred => "BEGIN DEFERRED",
            TransactionBehavior::Immediate => "BEGIN IMMEDIATE",
            TransactionBehavior::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

/// A database transaction scoped to one connection
///
/// All operations within a transaction are either committed together or
/// rolled back together. Constructed via
/// [`crate::client::SqliteClient::transaction`].
pub struct Transaction<'conn> {
    conn: &'conn Connection,
    closed: bool,
}

impl<'conn> Transaction<'conn> {
    /// Begin a transaction with the given locking behavior
    pub(crate) fn begin(
        conn: &'conn Connection,
        behavior: TransactionBehavior,
    ) -> Result<Self, TideError> {
        conn.execute_batch(behavior.begin_sql())
            .map_err(TideError::Sqlite)?;
        Ok(Self {
            conn,
            closed: false,
        })
    }

    /// Commit the transaction
    ///
    /// # Errors
    ///
    /// Returns `TideError::Sqlite` if the COMMIT fails; the transaction is
    /// considered closed either way.
    pub fn commit(mut self) -> Result<(), TideError> {
        self.closed = true;
        self.conn.execute_batch("COMMIT").map_err(TideError::Sqlite)
    }

    /// Roll the transaction back
    ///
    /// # Errors
    ///
    /// Returns `TideError::Sqlite` if the ROLLBACK fails; the transaction is
    /// considered closed either way.
    pub fn rollback(mut self) -> Result<(), TideError> {
        self.closed = true;
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(TideError::Sqlite)
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                log::error!("implicit transaction rollback failed: {e}");
            }
        }
    }
}

impl TideExecutor for Transaction<'_> {
    fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> Result<usize, TideError> {
        TideExecutor::execute(self.conn, sql, params)
    }

    fn execute_batch(&self, sql: &str) -> Result<(), TideError> {
        TideExecutor::execute_batch(self.conn, sql)
    }

    fn insert(&self, sql: &str, params: &[&dyn ToSql]) -> Result<i64, TideError> {
        TideExecutor::insert(self.conn, sql, params)
    }

    fn query_rows(&self, sql: &str, params: &[&dyn ToSql]) -> Result<RowSet, TideError> {
        TideExecutor::query_rows(self.conn, sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)")
            .expect("create table");
        conn
    }

    fn count(conn: &Connection) -> i64 {
        conn.count("SELECT count(1) FROM t", &[]).unwrap()
    }

    #[test]
    fn test_commit_persists_writes() {
        let conn = conn();
        let txn = Transaction::begin(&conn, TransactionBehavior::Deferred).unwrap();
        txn.insert("INSERT INTO t (name) VALUES (?1)", &[&"a"])
            .unwrap();
        txn.commit().unwrap();
        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn test_rollback_discards_writes() {
        let conn = conn();
        let txn = Transaction::begin(&conn, TransactionBehavior::Immediate).unwrap();
        txn.insert("INSERT INTO t (name) VALUES (?1)", &[&"a"])
            .unwrap();
        txn.rollback().unwrap();
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn test_drop_rolls_back() {
        let conn = conn();
        {
            let txn = Transaction::begin(&conn, TransactionBehavior::Deferred).unwrap();
            txn.insert("INSERT INTO t (name) VALUES (?1)", &[&"a"])
                .unwrap();
            // dropped without commit
        }
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn test_begin_sql() {
        assert_eq!(TransactionBehavior::Deferred.begin_sql(), "BEGIN DEFERRED");
        assert_eq!(
            TransactionBehavior::Exclusive.begin_sql(),
            "BEGIN EXCLUSIVE"
        );
    }
}
