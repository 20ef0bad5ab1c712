//! # Tidepool
//!
//! Embedded SQLite data-access layer with checksum-verified, Flyway-style
//! schema migrations.
//!
//! See [README on GitHub](https://github.com/microscaler/tidepool) for full architecture.

pub mod client;
pub mod config;
pub mod connection;
pub mod executor;
pub mod json_helpers;
pub mod migration;
pub mod pool;
pub mod row;
pub mod transaction;

pub use client::SqliteClient;
pub use config::ClientConfig;
pub use connection::ConnectionError;
pub use executor::{TideError, TideExecutor};
pub use migration::{MigrationError, Migrator, SchemaVersion, VersionStatus};
pub use pool::{Pool, PooledConnection};
pub use row::{FromRow, RowSet, SqliteRow, SqliteValue, DATETIME_FORMAT};
pub use transaction::{Transaction, TransactionBehavior};
