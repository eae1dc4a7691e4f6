//! WAL Recovery
//!
//! Lenient replay of a WAL that failed strict reading.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::Result;

use super::reader::{Frame, WalReader};
use super::WalEntry;

/// Handles WAL recovery after a crash or corruption report
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of complete records skipped because they failed verification
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether the WAL was truncated (partial writes removed)
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Skip complete records that fail their checksum
    /// 3. Truncate a partial write at the end
    /// 4. Return all valid entries in order
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let (entries, mut result, valid_end, file_len) = Self::scan(path)?;

        if valid_end < file_len {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_end)?;
            file.sync_all()?;
            result.was_truncated = true;

            tracing::warn!(
                path = %path.display(),
                removed = file_len - valid_end,
                "truncated torn WAL tail"
            );
        }

        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (_, mut result, valid_end, file_len) = Self::scan(path)?;
        result.was_truncated = valid_end < file_len;
        Ok(result)
    }

    /// Walk every frame, returning the valid entries, the stats, the offset
    /// just past the last complete frame and the file length
    fn scan(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult, u64, u64)> {
        let mut reader = WalReader::open(path)?;
        let file_len = std::fs::metadata(path)?.len();

        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();
        let mut valid_end = 0u64;

        loop {
            match reader.read_frame()? {
                Frame::Entry(entry, len) => {
                    valid_end += len;
                    result.entries_recovered += 1;
                    result.last_lsn = entry.lsn;
                    entries.push(entry);
                }
                Frame::Damaged { len, reason } => {
                    tracing::warn!(
                        path = %path.display(),
                        offset = valid_end,
                        %reason,
                        "skipping damaged WAL record"
                    );
                    valid_end += len;
                    result.entries_corrupted += 1;
                }
                Frame::Torn | Frame::End => break,
            }
        }

        Ok((entries, result, valid_end, file_len))
    }
}
