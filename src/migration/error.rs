//! Migration-specific error types

use crate::executor::TideError;
use crate::migration::record::SchemaVersion;
use std::path::PathBuf;

/// Migration-specific errors
#[derive(Debug)]
pub enum MigrationError {
    /// Ledger or script execution hit a storage-level error
    Storage(TideError),
    /// The ledger already records a failed script; nothing further runs
    /// until the operator resolves it
    UnresolvedFailure { record: SchemaVersion },
    /// A previously applied script's content changed
    ChecksumMismatch {
        script: String,
        stored: String,
        current: String,
    },
    /// A script's statement failed during execution (recorded in the ledger
    /// as ERROR before this error is surfaced)
    ScriptFailed { script: String, source: TideError },
    /// A script file could not be read
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationError::Storage(e) => write!(f, "Storage error: {e}"),
            MigrationError::UnresolvedFailure { record } => {
                write!(
                    f,
                    "Migration ledger has an unresolved failure for script '{}' (recorded {}).\n\
                     No further scripts will be applied until the failed state is resolved.\n\
                     Inspect the schema_version table and repair the database out of band.",
                    record.script, record.created_time
                )
            }
            MigrationError::ChecksumMismatch {
                script,
                stored,
                current,
            } => {
                write!(
                    f,
                    "Migration script '{script}' has been modified after being applied.\n\
                     Stored checksum: {stored}\n\
                     Current checksum: {current}\n\
                     This indicates the script file was edited after deployment."
                )
            }
            MigrationError::ScriptFailed { script, source } => {
                write!(
                    f,
                    "Migration script '{script}' failed during execution: {source}"
                )
            }
            MigrationError::Io { path, source } => {
                write!(
                    f,
                    "Failed to read migration script {}: {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MigrationError::Storage(e) | MigrationError::ScriptFailed { source: e, .. } => Some(e),
            MigrationError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<TideError> for MigrationError {
    fn from(error: TideError) -> Self {
        MigrationError::Storage(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_mismatch_display() {
        let err = MigrationError::ChecksumMismatch {
            script: "001_init.sql".to_string(),
            stored: "123".to_string(),
            current: "456".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("001_init.sql"));
        assert!(msg.contains("Stored checksum: 123"));
        assert!(msg.contains("Current checksum: 456"));
    }

    #[test]
    fn test_script_failed_display() {
        let err = MigrationError::ScriptFailed {
            script: "002_seed.sql".to_string(),
            source: TideError::Query("syntax error".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("002_seed.sql"));
        assert!(msg.contains("syntax error"));
    }
}
