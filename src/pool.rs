//! Connection Pool Module
//!
//! Owns every live connection to the database file. Idle connections are
//! parked in a bounded `crossbeam-channel` queue; an atomic counter caps the
//! total number of open connections.
//!
//! Checkout behavior:
//! - An idle connection past its max lifetime is discarded and replaced.
//! - Every idle checkout is liveness-checked (`SELECT 1`); a dead connection
//!   is silently replaced by a fresh open.
//! - When the pool is at capacity, checkout blocks up to the configured pool
//!   timeout for a connection to be returned.

use crate::config::ClientConfig;
use crate::connection;
use crate::executor::{TideError, TideExecutor};
use crate::row::RowSet;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use rusqlite::{Connection, ToSql};
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct IdleConn {
    conn: Connection,
    created: Instant,
}

#[derive(Debug)]
struct PoolInner {
    data_source: String,
    idle_tx: Sender<IdleConn>,
    idle_rx: Receiver<IdleConn>,
    open_count: AtomicUsize,
    max_open: usize,
    max_lifetime: Duration,
    pool_timeout: Duration,
}

impl PoolInner {
    /// Reserve a slot against `max_open`; returns false when at capacity.
    fn try_reserve(&self) -> bool {
        let mut n = self.open_count.load(Ordering::Acquire);
        loop {
            if n >= self.max_open {
                return false;
            }
            match self
                .open_count
                .compare_exchange(n, n + 1, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return true,
                Err(current) => n = current,
            }
        }
    }

    fn release_slot(&self) {
        self.open_count.fetch_sub(1, Ordering::AcqRel);
    }

    fn discard(&self, idle: IdleConn) {
        drop(idle);
        self.release_slot();
    }

    /// Lifetime- and liveness-check an idle connection. Returns `None` (and
    /// frees the slot) when the connection must be replaced.
    fn validate(&self, idle: IdleConn) -> Option<IdleConn> {
        if idle.created.elapsed() >= self.max_lifetime {
            log::debug!("discarding idle connection past max lifetime");
            self.discard(idle);
            return None;
        }
        if let Err(e) = connection::ping(&idle.conn) {
            log::warn!("idle connection failed liveness check, replacing: {e}");
            self.discard(idle);
            return None;
        }
        Some(idle)
    }
}

/// A pool of SQLite connections to one database file
///
/// Cloning is cheap; clones share the same pool.
#[derive(Debug, Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl Pool {
    /// Opens the pool: validates the data source, opens the first connection
    /// with bounded retry, pings it, and parks it in the idle queue.
    ///
    /// # Errors
    ///
    /// Returns `TideError::Connection` if validation, the retried open, or
    /// the initial ping fails.
    pub fn open(data_source: &str, config: &ClientConfig) -> Result<Self, TideError> {
        connection::validate_data_source(data_source)?;

        let conn = connection::open_with_retry(
            data_source,
            config.attempts,
            Duration::from_millis(config.retry_delay_ms),
        )?;
        connection::ping(&conn)?;

        let max_idle = config.max_idle_conns.max(1);
        let (idle_tx, idle_rx) = bounded(max_idle);
        let inner = Arc::new(PoolInner {
            data_source: data_source.to_string(),
            idle_tx,
            idle_rx,
            open_count: AtomicUsize::new(1),
            max_open: config.max_open_conns.max(1),
            max_lifetime: Duration::from_secs(config.conn_max_lifetime_seconds),
            pool_timeout: Duration::from_secs(config.pool_timeout_seconds),
        });

        inner
            .idle_tx
            .try_send(IdleConn {
                conn,
                created: Instant::now(),
            })
            .map_err(|_| TideError::Other("pool idle queue rejected the initial connection".to_string()))?;

        Ok(Self { inner })
    }

    /// Checks out a connection, opening a fresh one when no idle connection
    /// is available and the pool is under capacity.
    ///
    /// # Errors
    ///
    /// Returns `TideError::PoolTimeout` when the pool stays exhausted for the
    /// configured pool timeout, or `TideError::Connection` when a fresh open
    /// fails.
    pub fn get(&self) -> Result<PooledConnection, TideError> {
        let deadline = Instant::now() + self.inner.pool_timeout;
        loop {
            match self.inner.idle_rx.try_recv() {
                Ok(idle) => {
                    if let Some(idle) = self.inner.validate(idle) {
                        return Ok(PooledConnection::new(idle, Arc::clone(&self.inner)));
                    }
                    continue;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
            }

            if self.inner.try_reserve() {
                match connection::open(&self.inner.data_source) {
                    Ok(conn) => {
                        return Ok(PooledConnection::new(
                            IdleConn {
                                conn,
                                created: Instant::now(),
                            },
                            Arc::clone(&self.inner),
                        ));
                    }
                    Err(e) => {
                        self.inner.release_slot();
                        return Err(TideError::Connection(e));
                    }
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(self.timeout_error());
            }
            match self.inner.idle_rx.recv_timeout(remaining) {
                Ok(idle) => {
                    if let Some(idle) = self.inner.validate(idle) {
                        return Ok(PooledConnection::new(idle, Arc::clone(&self.inner)));
                    }
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return Err(self.timeout_error());
                }
            }
        }
    }

    fn timeout_error(&self) -> TideError {
        TideError::PoolTimeout(format!(
            "no connection available within {:?} ({} open, max {})",
            self.inner.pool_timeout,
            self.open_connections(),
            self.inner.max_open
        ))
    }

    /// Number of currently open connections (idle and checked out)
    pub fn open_connections(&self) -> usize {
        self.inner.open_count.load(Ordering::Acquire)
    }

    pub fn data_source(&self) -> &str {
        &self.inner.data_source
    }
}

/// A connection checked out from the pool
///
/// Dereferences to `rusqlite::Connection` and implements [`TideExecutor`].
/// Dropping it returns the connection to the idle queue, or closes it when
/// the queue is full or the connection outlived its max lifetime.
#[derive(Debug)]
pub struct PooledConnection {
    idle: Option<IdleConn>,
    pool: Arc<PoolInner>,
}

impl PooledConnection {
    fn new(idle: IdleConn, pool: Arc<PoolInner>) -> Self {
        Self {
            idle: Some(idle),
            pool,
        }
    }

    fn conn(&self) -> &Connection {
        // invariant: `idle` is only taken in Drop
        match &self.idle {
            Some(idle) => &idle.conn,
            None => unreachable!("connection already returned to pool"),
        }
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(idle) = self.idle.take() else {
            return;
        };
        if idle.created.elapsed() >= self.pool.max_lifetime {
            self.pool.discard(idle);
            return;
        }
        if self.pool.idle_tx.try_send(idle).is_err() {
            // idle queue full; close instead of parking
            self.pool.release_slot();
        }
    }
}

impl TideExecutor for PooledConnection {
    fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> Result<usize, TideError> {
        TideExecutor::execute(self.conn(), sql, params)
    }

    fn execute_batch(&self, sql: &str) -> Result<(), TideError> {
        TideExecutor::execute_batch(self.conn(), sql)
    }

    fn insert(&self, sql: &str, params: &[&dyn ToSql]) -> Result<i64, TideError> {
        TideExecutor::insert(self.conn(), sql, params)
    }

    fn query_rows(&self, sql: &str, params: &[&dyn ToSql]) -> Result<RowSet, TideError> {
        TideExecutor::query_rows(self.conn(), sql, params)
    }
}
