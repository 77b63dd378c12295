//! Log Recovery
//!
//! Handles crash recovery by replaying the data log.

use std::path::Path;

use tracing::warn;

use crate::error::{Result, ScrollError};

use super::{LogScanner, LogStore, ScannedRecord};

/// Handles log recovery after a crash
pub struct LogRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of records successfully recovered
    pub records_recovered: u64,

    /// Offset just past the last valid record
    pub last_valid_offset: u64,

    /// Bytes after the last valid record (torn or corrupted tail)
    pub bytes_truncated: u64,

    /// Whether the log was truncated (partial writes removed)
    pub was_truncated: bool,
}

impl LogRecovery {
    /// Replay every valid record of `store` through `visit`
    ///
    /// This will:
    /// 1. Scan records forward from the first one
    /// 2. Hand each valid record to `visit`, in file order
    /// 3. Stop at the first malformed frame
    /// 4. Truncate the file at the last valid offset
    ///
    /// Corruption never fails the recovery; I/O errors do.
    pub fn recover<F>(store: &mut LogStore, visit: F) -> Result<RecoveryResult>
    where
        F: FnMut(ScannedRecord),
    {
        let scanner = store.scan()?;
        let result = Self::replay(scanner, visit)?;

        if result.was_truncated {
            warn!(
                path = %store.path().display(),
                offset = result.last_valid_offset,
                bytes = result.bytes_truncated,
                "Truncating corrupted log tail"
            );
            store.truncate_to(result.last_valid_offset)?;
        }

        Ok(result)
    }

    /// Verify integrity of a data file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let scanner = LogScanner::open(path)?;
        Self::replay(scanner, |_| {})
    }

    fn replay<F>(mut scanner: LogScanner, mut visit: F) -> Result<RecoveryResult>
    where
        F: FnMut(ScannedRecord),
    {
        let mut result = RecoveryResult::default();

        for item in scanner.by_ref() {
            match item {
                Ok(scanned) => {
                    result.records_recovered += 1;
                    visit(scanned);
                }
                Err(ScrollError::CorruptLog(msg)) => {
                    warn!("Log corruption: {}", msg);
                    result.was_truncated = true;
                }
                Err(e) => return Err(e),
            }
        }

        result.last_valid_offset = scanner.position();
        result.bytes_truncated = scanner.file_len() - scanner.position();

        Ok(result)
    }
}
