//! SSTable Builder
//!
//! Writes sorted key-value entries to a new SSTable file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{GroupKvError, Result};

use super::{SSTable, HEADER_SIZE, MAGIC, TOMBSTONE_MARKER, VERSION};

/// Builder for creating new SSTables from sorted entries
pub struct SSTableBuilder {
    /// Final path (the table is renamed here by `finish`)
    path: PathBuf,
    /// Path written while the table is incomplete
    tmp_path: PathBuf,
    writer: BufWriter<File>,
    entry_count: u64,
    /// Current write position (for index)
    current_offset: u64,
    /// Index: key → file offset of entry
    index: Vec<(Vec<u8>, u64)>,
    last_key: Option<Vec<u8>>,
    data_hasher: crc32fast::Hasher,
}

impl SSTableBuilder {
    /// Create a new SSTable builder
    ///
    /// Writes the header immediately; call `add()`/`add_tombstone()` in
    /// strictly increasing key order, then `finish()`.
    pub fn new(path: &Path) -> Result<Self> {
        let tmp_path = path.with_extension("tmp");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;

        let mut writer = BufWriter::new(file);
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&0u64.to_le_bytes())?; // Entry count, patched in finish

        Ok(Self {
            path: path.to_path_buf(),
            tmp_path,
            writer,
            entry_count: 0,
            current_offset: HEADER_SIZE,
            index: Vec::new(),
            last_key: None,
            data_hasher: crc32fast::Hasher::new(),
        })
    }

    /// Add a key-value pair
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write_entry(key, Some(value))
    }

    /// Add a tombstone
    pub fn add_tombstone(&mut self, key: &[u8]) -> Result<()> {
        self.write_entry(key, None)
    }

    fn write_entry(&mut self, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        if let Some(last) = &self.last_key {
            if key <= last.as_slice() {
                return Err(GroupKvError::Storage(
                    "SSTable keys must be added in strictly increasing order".to_string(),
                ));
            }
        }

        let val_len = match value {
            Some(v) if v.len() >= TOMBSTONE_MARKER as usize => {
                return Err(GroupKvError::Storage(format!(
                    "value of {} bytes exceeds SSTable limit",
                    v.len()
                )));
            }
            Some(v) => v.len() as u32,
            None => TOMBSTONE_MARKER,
        };

        let mut header = [0u8; 8];
        header[0..4].copy_from_slice(&(key.len() as u32).to_le_bytes());
        header[4..8].copy_from_slice(&val_len.to_le_bytes());

        self.write_data(&header)?;
        self.write_data(key)?;
        if let Some(v) = value {
            self.write_data(v)?;
        }

        self.index.push((key.to_vec(), self.current_offset));
        self.current_offset += 8 + key.len() as u64 + value.map_or(0, |v| v.len() as u64);
        self.entry_count += 1;
        self.last_key = Some(key.to_vec());

        Ok(())
    }

    fn write_data(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.data_hasher.update(bytes);
        Ok(())
    }

    /// Finish building: write index block and footer, sync, and move the
    /// table to its final name
    pub fn finish(mut self) -> Result<SSTable> {
        let index_offset = self.current_offset;
        let mut index_hasher = crc32fast::Hasher::new();

        for (key, offset) in &self.index {
            let mut record = Vec::with_capacity(12 + key.len());
            record.extend_from_slice(&(key.len() as u32).to_le_bytes());
            record.extend_from_slice(&offset.to_le_bytes());
            record.extend_from_slice(key);

            self.writer.write_all(&record)?;
            index_hasher.update(&record);
        }

        let data_crc = self.data_hasher.finalize();
        self.writer.write_all(&index_offset.to_le_bytes())?;
        self.writer.write_all(&data_crc.to_le_bytes())?;
        self.writer.write_all(&index_hasher.finalize().to_le_bytes())?;
        self.writer.flush()?;

        let mut file = self
            .writer
            .into_inner()
            .map_err(|e| GroupKvError::Storage(format!("Failed to flush SSTable: {}", e)))?;
        file.seek(SeekFrom::Start(6))?; // After magic + version
        file.write_all(&self.entry_count.to_le_bytes())?;
        file.sync_all()?;
        let file_size = file.metadata()?.len();
        drop(file);

        fs::rename(&self.tmp_path, &self.path)?;

        let min_key = self.index.first().map(|(k, _)| k.clone()).unwrap_or_default();
        let max_key = self.last_key.unwrap_or_default();

        Ok(SSTable {
            path: self.path,
            entry_count: self.entry_count,
            min_key,
            max_key,
            file_size,
        })
    }
}
