//! `SqliteClient` - the top-level data-access handle
//!
//! An explicit owned value (no ambient singleton) bundling the connection
//! pool and configuration. `initialize` opens the pool, pings it, and runs
//! migrations when a script directory is configured; afterwards the handle
//! can be shared by reference across threads.

use crate::config::ClientConfig;
use crate::executor::{TideError, TideExecutor};
use crate::migration::{ledger, Migrator, SchemaVersion};
use crate::pool::Pool;
use crate::row::{FromRow, RowSet, SqliteRow};
use crate::transaction::{Transaction, TransactionBehavior};
use rusqlite::ToSql;

/// Client handle over an embedded SQLite database
///
/// Each operation checks a connection out of the pool for its duration.
///
/// # Examples
///
/// ```no_run
/// use tidepool::{ClientConfig, SqliteClient, TideError};
///
/// # fn main() -> Result<(), TideError> {
/// let config = ClientConfig::default().migrations_dir("ddl");
/// let client = SqliteClient::initialize("app.db", config)?;
///
/// let id = client.insert(
///     "INSERT INTO pets (name, price) VALUES (?1, ?2)",
///     &[&"otter", &1.5f64],
/// )?;
///
/// let pets = client.find("SELECT id, name FROM pets", &[])?;
/// for row in &pets {
///     println!("{} {}", row.get_i64("id")?, row.get_text("name")?);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SqliteClient {
    data_source: String,
    pool: Pool,
    config: ClientConfig,
}

impl SqliteClient {
    /// Open the client: validate the data source, open the pool (initial
    /// open with bounded retry plus ping), then run migrations when a script
    /// directory is configured.
    ///
    /// Initialization happens before the handle can be shared, so migrations
    /// run exactly once per process, synchronously.
    ///
    /// # Errors
    ///
    /// Returns `TideError::Connection` when the pool cannot be opened, or
    /// `TideError::Migration` when a configured migration run fails.
    pub fn initialize(data_source: &str, config: ClientConfig) -> Result<Self, TideError> {
        let pool = Pool::open(data_source, &config)?;
        let client = Self {
            data_source: data_source.to_string(),
            pool,
            config,
        };
        client.run_migrations()?;
        Ok(client)
    }

    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run pending migrations from the configured script directory
    ///
    /// A no-op when no directory is configured; migrations are opt-in.
    /// Also invoked by [`SqliteClient::initialize`].
    ///
    /// # Errors
    ///
    /// Returns `TideError::Migration` wrapping the failure; see
    /// [`crate::migration::Migrator::run`] for the failure modes.
    pub fn run_migrations(&self) -> Result<(), TideError> {
        let Some(dir) = self.config.migrations_dir.as_ref() else {
            return Ok(());
        };
        let conn = self.pool.get()?;
        let applied = Migrator::new(dir).run(&conn)?;
        log::info!(
            "migration run complete for {}; {applied} script(s) applied",
            self.data_source
        );
        Ok(())
    }

    /// The ledger's records in insertion order
    ///
    /// Read-only: this does not create the ledger table, and errors if
    /// migrations have never run against this database.
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the ledger cannot be queried.
    pub fn schema_versions(&self) -> Result<Vec<SchemaVersion>, TideError> {
        let conn = self.pool.get()?;
        ledger::list_records(&conn)
    }

    /// Execute a statement and return the number of rows affected
    ///
    /// # Errors
    ///
    /// Returns `TideError` if no connection is available or the statement fails.
    pub fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> Result<usize, TideError> {
        self.pool.get()?.execute(sql, params)
    }

    /// Execute a DDL batch, logging the statement
    ///
    /// # Errors
    ///
    /// Returns `TideError` if no connection is available or any statement fails.
    pub fn execute_ddl(&self, ddl: &str) -> Result<(), TideError> {
        log::debug!("exec ddl:\n{ddl}");
        self.pool.get()?.execute_batch(ddl)
    }

    /// Query all rows
    ///
    /// # Errors
    ///
    /// Returns `TideError` if no connection is available or the query fails.
    pub fn find(&self, sql: &str, params: &[&dyn ToSql]) -> Result<RowSet, TideError> {
        self.pool.get()?.query_rows(sql, params)
    }

    /// Query the first row, if any
    ///
    /// # Errors
    ///
    /// Returns `TideError` if no connection is available or the query fails.
    pub fn find_first(
        &self,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<Option<SqliteRow>, TideError> {
        self.pool.get()?.query_first(sql, params)
    }

    /// Query all rows decoded into `T`
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails or any row does not decode.
    pub fn find_as<T: FromRow>(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<T>, TideError> {
        self.pool.get()?.query_as(sql, params)
    }

    /// Query the first row decoded into `T`, if any
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails or the row does not decode.
    pub fn find_first_as<T: FromRow>(
        &self,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<Option<T>, TideError> {
        self.pool.get()?.query_first_as(sql, params)
    }

    /// Execute an INSERT and return the last inserted rowid
    ///
    /// # Errors
    ///
    /// Returns `TideError` if no connection is available or the statement fails.
    pub fn insert(&self, sql: &str, params: &[&dyn ToSql]) -> Result<i64, TideError> {
        self.pool.get()?.insert(sql, params)
    }

    /// Execute an UPDATE and return the number of rows affected
    ///
    /// # Errors
    ///
    /// Returns `TideError` if no connection is available or the statement fails.
    pub fn update(&self, sql: &str, params: &[&dyn ToSql]) -> Result<usize, TideError> {
        self.pool.get()?.execute(sql, params)
    }

    /// Execute a DELETE and return the number of rows affected
    ///
    /// # Errors
    ///
    /// Returns `TideError` if no connection is available or the statement fails.
    pub fn delete(&self, sql: &str, params: &[&dyn ToSql]) -> Result<usize, TideError> {
        self.pool.get()?.execute(sql, params)
    }

    /// Execute a `SELECT count(...)` query
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails or does not produce an integer.
    pub fn count(&self, sql: &str, params: &[&dyn ToSql]) -> Result<i64, TideError> {
        self.pool.get()?.count(sql, params)
    }

    /// Check whether a table exists
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the catalog query fails.
    pub fn has_table(&self, table: &str) -> Result<bool, TideError> {
        self.pool.get()?.has_table(table)
    }

    /// Run a closure inside a deferred transaction
    ///
    /// Commits when the closure returns `Ok`, rolls back when it returns
    /// `Err` (the closure's error is returned).
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or `TideError` from BEGIN/COMMIT.
    pub fn transaction<T, F>(&self, f: F) -> Result<T, TideError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, TideError>,
    {
        self.transaction_with_behavior(TransactionBehavior::Deferred, f)
    }

    /// Run a closure inside a transaction with an explicit locking behavior
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or `TideError` from BEGIN/COMMIT.
    pub fn transaction_with_behavior<T, F>(
        &self,
        behavior: TransactionBehavior,
        f: F,
    ) -> Result<T, TideError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, TideError>,
    {
        let conn = self.pool.get()?;
        let txn = Transaction::begin(&conn, behavior)?;
        match f(&txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback() {
                    log::error!("transaction rollback failed: {rollback_err}");
                }
                Err(err)
            }
        }
    }
}
