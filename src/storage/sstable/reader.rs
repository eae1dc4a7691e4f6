//! SSTable Reader
//!
//! Opens SSTable files, verifies them, and serves point lookups and lazy
//! range scans through an in-memory index.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::ops::Bound;
use std::path::{Path, PathBuf};

use crate::error::{GroupKvError, Result};
use crate::kv::KeyRange;

use super::iterator::SSTableIterator;
use super::{FOOTER_SIZE, HEADER_SIZE, MAGIC, TOMBSTONE_MARKER, VERSION};

/// Reader for SSTable files with in-memory index for O(log n) lookups
pub struct SSTableReader {
    path: PathBuf,
    file: BufReader<File>,
    /// In-memory index: key → file offset
    index: BTreeMap<Vec<u8>, u64>,
    entry_count: u64,
    /// Index block starting offset (end of the data block)
    index_offset: u64,
}

impl SSTableReader {
    /// Open and verify an SSTable
    ///
    /// Checks magic, version, footer bounds and both checksums. Any damage is
    /// reported as `Corruption`.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(corrupt(path, format!("file too small ({} bytes)", file_size)));
        }

        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            return Err(corrupt(path, format!("bad magic {:?}", &header[0..4])));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(corrupt(path, format!("unsupported version {}", version)));
        }

        let entry_count = u64::from_le_bytes(header[6..14].try_into().expect("8-byte slice"));

        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;

        let index_offset = u64::from_le_bytes(footer[0..8].try_into().expect("8-byte slice"));
        let data_crc = u32::from_le_bytes(footer[8..12].try_into().expect("4-byte slice"));
        let index_crc = u32::from_le_bytes(footer[12..16].try_into().expect("4-byte slice"));

        if index_offset < HEADER_SIZE || index_offset > file_size - FOOTER_SIZE {
            return Err(corrupt(path, format!("index offset {} out of bounds", index_offset)));
        }

        // Verify the data block
        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        let mut hasher = crc32fast::Hasher::new();
        let mut remaining = index_offset - HEADER_SIZE;
        let mut chunk = vec![0u8; 64 * 1024];
        while remaining > 0 {
            let n = remaining.min(chunk.len() as u64) as usize;
            file.read_exact(&mut chunk[..n])?;
            hasher.update(&chunk[..n]);
            remaining -= n as u64;
        }
        if hasher.finalize() != data_crc {
            return Err(corrupt(path, "data block checksum mismatch".to_string()));
        }

        // Load and verify the index block
        let index_block_size = file_size - FOOTER_SIZE - index_offset;
        let mut index_data = vec![0u8; index_block_size as usize];
        file.read_exact(&mut index_data)?;
        if crc32fast::hash(&index_data) != index_crc {
            return Err(corrupt(path, "index block checksum mismatch".to_string()));
        }

        let index = parse_index(&index_data).ok_or_else(|| corrupt(path, "malformed index block".to_string()))?;
        if index.len() as u64 != entry_count {
            return Err(corrupt(
                path,
                format!("header claims {} entries, index holds {}", entry_count, index.len()),
            ));
        }

        file.seek(SeekFrom::Start(0))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: BufReader::new(file),
            index,
            entry_count,
            index_offset,
        })
    }

    /// Get a value by key: O(log n) lookup via in-memory index
    ///
    /// Returns:
    /// - `Ok(Some(value))`: key found with value
    /// - `Ok(None)`: key found but is a tombstone (deleted)
    /// - `Err(KeyNotFound)`: key not in this SSTable
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let offset = match self.index.get(key) {
            Some(&off) => off,
            None => return Err(GroupKvError::KeyNotFound),
        };

        self.file.seek(SeekFrom::Start(offset))?;

        let mut header = [0u8; 8];
        self.file.read_exact(&mut header)?;

        let key_len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let val_len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        self.file.seek_relative(key_len as i64)?;

        if val_len == TOMBSTONE_MARKER {
            return Ok(None);
        }

        let mut value = vec![0u8; val_len as usize];
        self.file.read_exact(&mut value)?;

        Ok(Some(value))
    }

    /// Entries (tombstones included) whose keys fall in `range`, read lazily
    ///
    /// The iterator reads through its own file handle, so it holds no borrow
    /// of the reader.
    pub fn scan(&self, range: &KeyRange) -> Result<SSTableIterator<BufReader<File>>> {
        let start_offset = self
            .index
            .range::<[u8], _>((Bound::Included(range.start.as_slice()), Bound::Unbounded))
            .next()
            .filter(|(key, _)| !range.is_past_end(key))
            .map_or(self.index_offset, |(_, &offset)| offset);

        let file = BufReader::new(File::open(&self.path)?);
        Ok(SSTableIterator::new(file, start_offset, self.index_offset)?.bounded(range.limit.clone()))
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the minimum key in this SSTable
    pub fn min_key(&self) -> Option<&[u8]> {
        self.index.keys().next().map(|k| k.as_slice())
    }

    /// Get the maximum key in this SSTable
    pub fn max_key(&self) -> Option<&[u8]> {
        self.index.keys().next_back().map(|k| k.as_slice())
    }

    /// Quick check if a key might be in this SSTable (range check)
    /// Returns false only if the key is definitely outside [min_key, max_key]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        match (self.min_key(), self.max_key()) {
            (Some(min), Some(max)) => key >= min && key <= max,
            _ => false,
        }
    }

    /// Iterate over every entry
    pub fn iter(&mut self) -> Result<SSTableIterator<&mut BufReader<File>>> {
        SSTableIterator::new(&mut self.file, HEADER_SIZE, self.index_offset)
    }
}

fn corrupt(path: &Path, reason: String) -> GroupKvError {
    GroupKvError::Corruption(format!("SSTable {}: {}", path.display(), reason))
}

/// Parse `[key_len(4)][offset(8)][key]` records; `None` if malformed
fn parse_index(data: &[u8]) -> Option<BTreeMap<Vec<u8>, u64>> {
    let mut index = BTreeMap::new();
    let mut pos = 0;

    while pos < data.len() {
        let key_len = u32::from_le_bytes(data.get(pos..pos + 4)?.try_into().ok()?) as usize;
        pos += 4;
        let offset = u64::from_le_bytes(data.get(pos..pos + 8)?.try_into().ok()?);
        pos += 8;
        let key = data.get(pos..pos + key_len)?.to_vec();
        pos += key_len;

        index.insert(key, offset);
    }

    Some(index)
}
