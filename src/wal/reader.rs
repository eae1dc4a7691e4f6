//! WAL Reader
//!
//! Reads records from the WAL file. The reader is strict: a torn tail or a
//! checksum mismatch is reported as `Corruption`. Lenient handling lives in
//! [`super::WalRecovery`].

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{GroupKvError, Result};

use super::{WalEntry, HEADER_SIZE};

/// Outcome of reading one frame
#[derive(Debug)]
pub(super) enum Frame {
    /// A valid record and the frame's total length
    Entry(WalEntry, u64),
    /// Clean end of file
    End,
    /// The file ends inside a frame
    Torn,
    /// A complete frame whose payload failed verification
    Damaged { len: u64, reason: String },
}

/// Reads entries from the WAL file
pub struct WalReader {
    file: BufReader<File>,
    file_len: u64,
    position: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();

        Ok(Self {
            file: BufReader::new(file),
            file_len,
            position: 0,
        })
    }

    /// Read every entry, failing on the first defect
    pub fn read_all(path: &Path) -> Result<Vec<WalEntry>> {
        Self::open(path)?.entries().collect()
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(None)` at a clean end of file.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        let start = self.position;
        match self.read_frame()? {
            Frame::Entry(entry, _) => Ok(Some(entry)),
            Frame::End => Ok(None),
            Frame::Torn => Err(GroupKvError::Corruption(format!(
                "WAL torn at offset {} (file length {})",
                start, self.file_len
            ))),
            Frame::Damaged { reason, .. } => Err(GroupKvError::Corruption(format!(
                "WAL record at offset {}: {}",
                start, reason
            ))),
        }
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }

    /// Offset of the next unread byte
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read one frame and advance past it
    pub(super) fn read_frame(&mut self) -> Result<Frame> {
        if self.position >= self.file_len {
            return Ok(Frame::End);
        }

        let mut header = [0u8; HEADER_SIZE];
        if !self.read_fully(&mut header)? {
            return Ok(Frame::Torn);
        }

        let lsn = u64::from_le_bytes(header[0..8].try_into().expect("8-byte slice"));
        let crc = u32::from_le_bytes(header[8..12].try_into().expect("4-byte slice"));
        let len = u32::from_le_bytes(header[12..16].try_into().expect("4-byte slice")) as u64;

        // A length past the end of the file is a torn write of the header's
        // record, never an allocation request
        if self.position + len > self.file_len {
            return Ok(Frame::Torn);
        }

        let mut data = vec![0u8; len as usize];
        if !self.read_fully(&mut data)? {
            return Ok(Frame::Torn);
        }

        let frame_len = HEADER_SIZE as u64 + len;
        match WalEntry::decode_payload(lsn, crc, &data) {
            Ok(entry) => Ok(Frame::Entry(entry, frame_len)),
            Err(e) => Ok(Frame::Damaged {
                len: frame_len,
                reason: e.to_string(),
            }),
        }
    }

    /// Fill `buf` completely; false if the file ended first
    fn read_fully(&mut self, buf: &mut [u8]) -> Result<bool> {
        match self.file.read_exact(buf) {
            Ok(()) => {
                self.position += buf.len() as u64;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                self.position = self.file_len;
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Iterator over WAL entries; stops after the first error
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
