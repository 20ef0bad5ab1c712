//! Migrator - Core migration execution engine

use crate::executor::TideExecutor;
use crate::migration::checksum::checksum;
use crate::migration::record::VersionStatus;
use crate::migration::script::{self, MigrationScript};
use crate::migration::{ledger, MigrationError};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Core migration execution engine
///
/// The `Migrator` orchestrates script discovery, ledger consultation,
/// execution, and outcome recording. Runs synchronously, blocking the caller
/// until every pending script is applied or a failure is returned.
pub struct Migrator {
    migrations_dir: PathBuf,
}

impl Migrator {
    /// Create a new Migrator with the specified script directory
    pub fn new(migrations_dir: impl AsRef<Path>) -> Self {
        Self {
            migrations_dir: migrations_dir.as_ref().to_path_buf(),
        }
    }

    /// Discover all migration scripts in the configured directory
    ///
    /// Scripts are sorted by file name; a missing directory yields an empty
    /// list rather than an error.
    #[must_use]
    pub fn discover_scripts(&self) -> Vec<MigrationScript> {
        script::discover_scripts(&self.migrations_dir)
    }

    /// Apply pending migration scripts
    ///
    /// Algorithm:
    /// 1. Ensure the ledger table exists.
    /// 2. Fetch existing records; abort with `UnresolvedFailure` if any has
    ///    status ERROR (this precedes discovery; a durable failure needs
    ///    operator attention even when the script directory is gone).
    /// 3. For each discovered script in name order: skip it when recorded
    ///    with a matching checksum; abort the whole run on a checksum
    ///    mismatch; otherwise execute it and append a ledger row with the
    ///    outcome. A failed script surfaces `ScriptFailed` after its ERROR
    ///    row is durably recorded, and later scripts are not attempted.
    ///
    /// # Returns
    ///
    /// The number of scripts applied by this run (skipped scripts do not
    /// count).
    ///
    /// # Errors
    ///
    /// Returns `MigrationError` as described above; ledger read/write
    /// failures surface as `MigrationError::Storage`.
    pub fn run(&self, executor: &dyn TideExecutor) -> Result<usize, MigrationError> {
        ledger::ensure_exists(executor)?;

        let existing = ledger::list_records(executor)?;
        if let Some(record) = ledger::first_error(&existing) {
            return Err(MigrationError::UnresolvedFailure {
                record: record.clone(),
            });
        }

        let scripts = self.discover_scripts();
        let mut applied = 0;
        for script in &scripts {
            let content = script.read_content()?;
            let current = checksum(content.as_bytes());

            match ledger::find_by_script(&script.name, &existing) {
                Some(record) if record.checksum == current.to_string() => {
                    log::debug!("migration script {} already applied, skipping", script.name);
                }
                Some(record) => {
                    return Err(MigrationError::ChecksumMismatch {
                        script: script.name.clone(),
                        stored: record.checksum.clone(),
                        current: current.to_string(),
                    });
                }
                None => {
                    self.apply(executor, script, &content, current)?;
                    applied += 1;
                }
            }
        }

        Ok(applied)
    }

    /// Execute one script and append its ledger row
    ///
    /// The row is appended regardless of the execution outcome, so a failure
    /// is durably recorded before being surfaced. An append failure
    /// propagates as a storage error; a ledger that silently lost rows would
    /// defeat checksum verification on the next run.
    fn apply(
        &self,
        executor: &dyn TideExecutor,
        script: &MigrationScript,
        content: &str,
        checksum: u64,
    ) -> Result<(), MigrationError> {
        log::info!("applying migration script {}", script.name);
        let start = Instant::now();
        let outcome = executor.execute_batch(content);
        let execution_time = format_duration(start.elapsed());

        let status = if outcome.is_ok() {
            VersionStatus::Success
        } else {
            VersionStatus::Error
        };
        if let Err(e) = &outcome {
            log::error!(
                "migration script {} failed after {execution_time}: {e}",
                script.name
            );
        }

        ledger::append_record(executor, &script.name, checksum, &execution_time, status)?;

        match outcome {
            Ok(()) => {
                log::info!(
                    "migration script {} applied in {execution_time}",
                    script.name
                );
                Ok(())
            }
            Err(source) => Err(MigrationError::ScriptFailed {
                script: script.name.clone(),
                source,
            }),
        }
    }
}

/// Compact human-readable duration rendering for the ledger's
/// `execution_time` column (`"412µs"`, `"12.345ms"`, `"1.204s"`, `"2m3.1s"`,
/// `"1h2m3s"`)
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 3600 {
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;
        match (minutes, seconds) {
            (0, 0) => format!("{hours}h"),
            (m, 0) => format!("{hours}h{m}m"),
            (m, s) => format!("{hours}h{m}m{s}s"),
        }
    } else if secs >= 60 {
        let minutes = secs / 60;
        let seconds = secs % 60;
        let tenths = d.subsec_millis() / 100;
        match (seconds, tenths) {
            (0, 0) => format!("{minutes}m"),
            (s, 0) => format!("{minutes}m{s}s"),
            (s, t) => format!("{minutes}m{s}.{t}s"),
        }
    } else if secs >= 1 {
        format!("{}s", trim_fraction(format!("{:.3}", d.as_secs_f64())))
    } else if d.subsec_micros() >= 1_000 {
        let millis = f64::from(d.subsec_nanos()) / 1_000_000.0;
        format!("{}ms", trim_fraction(format!("{millis:.3}")))
    } else if d.subsec_nanos() >= 1_000 {
        format!("{}µs", d.subsec_micros())
    } else {
        format!("{}ns", d.subsec_nanos())
    }
}

fn trim_fraction(s: String) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}
