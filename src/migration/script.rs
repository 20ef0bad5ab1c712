//! Migration script discovery

use crate::migration::MigrationError;
use std::fs;
use std::path::{Path, PathBuf};

/// A discovered migration script
///
/// The file name is the script's unique identity; content is read lazily,
/// immediately before the script is checksummed and executed.
#[derive(Debug, Clone)]
pub struct MigrationScript {
    /// Script file name
    pub name: String,

    /// Path to the script file
    pub path: PathBuf,
}

impl MigrationScript {
    /// Read the script's content as text
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Io` if the file cannot be read or is not
    /// valid UTF-8. Scripts are text by contract; a read failure happens
    /// before execution and before any ledger row is appended.
    pub fn read_content(&self) -> Result<String, MigrationError> {
        fs::read_to_string(&self.path).map_err(|source| MigrationError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Discover migration scripts in a directory, sorted by file name
///
/// Every regular file counts, regardless of extension; callers name scripts
/// so lexical order matches intended execution order (e.g. `001_…`, `002_…`).
///
/// A directory that cannot be listed (missing, unreadable) is treated as
/// "no scripts to run" with a warning; migrations are opt-in and some
/// deployments mount scripts only in certain environments.
#[must_use]
pub fn discover_scripts(dir: &Path) -> Vec<MigrationScript> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!(
                "cannot read migration script directory {}: {e}; nothing to run",
                dir.display()
            );
            return Vec::new();
        }
    };

    let mut scripts = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("skipping unreadable directory entry: {e}");
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            log::warn!("skipping script with non-UTF-8 name: {}", path.display());
            continue;
        };
        scripts.push(MigrationScript {
            name: name.to_string(),
            path,
        });
    }

    scripts.sort_by(|a, b| a.name.cmp(&b.name));
    scripts
}
