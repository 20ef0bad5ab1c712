//! Migration system for Tidepool
//!
//! Flyway-style, checksum-verified, append-only schema evolution:
//! - Scripts are plain files; the file name is the script's identity and its
//!   content is executed as-is.
//! - Every applied (or attempted) script gets a row in the `schema_version`
//!   ledger with an FNV-64 content checksum and the execution outcome.
//! - A previously applied script whose content changed, or any recorded
//!   failure, halts the whole run until the operator resolves it out of band.
//!
//! # Example
//!
//! ```rust,no_run
//! use tidepool::migration::Migrator;
//! use rusqlite::Connection;
//!
//! # fn main() -> Result<(), tidepool::MigrationError> {
//! let conn = Connection::open("app.db").expect("open database");
//! let migrator = Migrator::new("ddl");
//! let applied = migrator.run(&conn)?;
//! println!("{applied} script(s) applied");
//! # Ok(())
//! # }
//! ```

pub mod checksum;
pub mod error;
pub mod ledger;
pub mod record;
pub mod runner;
pub mod script;

pub use checksum::checksum;
pub use error::MigrationError;
pub use record::{SchemaVersion, VersionStatus};
pub use runner::{format_duration, Migrator};
pub use script::MigrationScript;
