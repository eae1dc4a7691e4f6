//! SSTable Iterator
//!
//! Sequential iteration over a run of data-block entries.

use std::io::{Read, Seek, SeekFrom};

use crate::error::{GroupKvError, Result};

use super::{SSTableEntry, TOMBSTONE_MARKER};

/// Iterator over SSTable entries in sorted key order
///
/// `R` is either a borrowed handle (`SSTableReader::iter`) or a handle the
/// iterator owns (`SSTableReader::scan`), so a scan can outlive the lock
/// that guards the table list.
pub struct SSTableIterator<R> {
    file: R,
    /// Stop reading at this offset (start of the index block)
    end_offset: u64,
    current_offset: u64,
    /// Exclusive upper key bound
    limit: Option<Vec<u8>>,
    done: bool,
}

impl<R: Read + Seek> SSTableIterator<R> {
    /// Iterate from `start_offset` (an entry boundary) to the index block
    pub(super) fn new(mut file: R, start_offset: u64, end_offset: u64) -> Result<Self> {
        file.seek(SeekFrom::Start(start_offset))?;
        Ok(Self {
            file,
            end_offset,
            current_offset: start_offset,
            limit: None,
            done: false,
        })
    }
}

impl<R: Read> SSTableIterator<R> {
    /// Stop before the first key `>= limit`
    pub(super) fn bounded(mut self, limit: Option<Vec<u8>>) -> Self {
        self.limit = limit;
        self
    }

    fn read_entry(&mut self) -> Result<SSTableEntry> {
        let mut header = [0u8; 8];
        self.file.read_exact(&mut header)?;

        let key_len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as u64;
        let val_len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        let value_bytes = if val_len == TOMBSTONE_MARKER { 0 } else { val_len as u64 };
        let entry_size = 8 + key_len + value_bytes;
        if self.current_offset + entry_size > self.end_offset {
            return Err(GroupKvError::Corruption(format!(
                "SSTable entry at offset {} overruns the data block",
                self.current_offset
            )));
        }

        let mut key = vec![0u8; key_len as usize];
        self.file.read_exact(&mut key)?;

        let value = if val_len == TOMBSTONE_MARKER {
            None
        } else {
            let mut v = vec![0u8; val_len as usize];
            self.file.read_exact(&mut v)?;
            Some(v)
        };

        self.current_offset += entry_size;
        Ok((key, value))
    }
}

impl<R: Read> Iterator for SSTableIterator<R> {
    type Item = Result<SSTableEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.current_offset >= self.end_offset {
            return None;
        }

        match self.read_entry() {
            Ok((key, _)) if self.limit.as_ref().is_some_and(|limit| key >= *limit) => {
                self.done = true;
                None
            }
            Ok(entry) => Some(Ok(entry)),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
