//! Checksum calculation for migration scripts

use fnv::FnvHasher;
use std::hash::Hasher;

/// Calculate the FNV-1a 64-bit checksum of a migration script's content
///
/// This is used to validate that migration scripts haven't been modified
/// after being applied to the database. The fingerprint is a pure function
/// of the content bytes (not the file name or a timestamp) and is stable
/// across process restarts and platforms.
///
/// The ledger persists the value as a decimal string.
#[must_use]
pub fn checksum(content: &[u8]) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(content);
    hasher.finish()
}
