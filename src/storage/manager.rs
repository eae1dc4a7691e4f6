//! Storage Manager
//!
//! Manages a shard's SSTables and coordinates reads/writes.
//!
//! ## Responsibilities
//! - Discover existing SSTables on startup (strictly, or quarantining damage)
//! - Search SSTables newest → oldest for reads
//! - Open lazy per-table cursors for range scans
//! - Create new SSTables from MemTable flushes

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::{GroupKvError, Result};
use crate::kv::KeyRange;
use crate::memtable::{MemTable, MemTableEntry};

use super::{SSTable, SSTableBuilder, SSTableIterator, SSTableReader};

/// Manages the storage layer of one shard
///
/// ## Concurrency:
/// - `sstables`: Protected by RwLock; point lookups take the write half
///   because `SSTableReader` seeks its file handle, scans open their own
///   handles under the read half
/// - `next_sstable_id`: Atomic counter (lock-free)
pub struct StorageManager {
    /// Directory where SSTables are stored
    data_dir: PathBuf,

    /// Open SSTable readers, ordered newest → oldest
    sstables: RwLock<Vec<SSTableReader>>,

    next_sstable_id: AtomicU64,
}

impl StorageManager {
    const EXTENSION: &'static str = "sst";
    const QUARANTINE_EXTENSION: &'static str = "corrupt";

    /// Open storage in the given directory, failing on any damaged table
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, false)
    }

    /// Open storage, renaming damaged tables to `*.corrupt` instead of failing
    pub fn open_recovering(path: &Path) -> Result<Self> {
        Self::open_with(path, true)
    }

    fn open_with(path: &Path, quarantine: bool) -> Result<Self> {
        fs::create_dir_all(path)?;

        let mut sstable_ids: Vec<u64> = Vec::new();
        let mut max_id = 0u64;
        for entry in fs::read_dir(path)? {
            let file_path = entry?.path();
            if !file_path.is_file() {
                continue;
            }

            // Leftover of a flush interrupted before its rename
            if file_path.extension().is_some_and(|ext| ext == "tmp") {
                tracing::debug!(path = %file_path.display(), "removing incomplete SSTable");
                fs::remove_file(&file_path)?;
                continue;
            }

            if let Some((id, live)) = Self::parse_sstable_id(&file_path) {
                max_id = max_id.max(id);
                if live {
                    sstable_ids.push(id);
                }
            }
        }

        // Newest first (highest ID first)
        sstable_ids.sort_unstable_by(|a, b| b.cmp(a));

        let mut sstables = Vec::with_capacity(sstable_ids.len());
        for id in &sstable_ids {
            let sstable_path = Self::sstable_path_with_dir(path, *id);
            match SSTableReader::open(&sstable_path) {
                Ok(reader) => sstables.push(reader),
                Err(e) if quarantine && e.is_corruption() => {
                    let aside = sstable_path.with_extension(Self::QUARANTINE_EXTENSION);
                    tracing::warn!(
                        path = %sstable_path.display(),
                        error = %e,
                        "quarantining damaged SSTable"
                    );
                    fs::rename(&sstable_path, &aside)?;
                }
                Err(e) => return Err(e),
            }
        }

        // IDs are never reused, not even those of quarantined tables
        let next_id = max_id + 1;

        Ok(Self {
            data_dir: path.to_path_buf(),
            sstables: RwLock::new(sstables),
            next_sstable_id: AtomicU64::new(next_id),
        })
    }

    /// Get a value by key (searches all SSTables newest → oldest)
    ///
    /// Returns:
    /// - `Ok(Some(value))`: key found with value
    /// - `Ok(None)`: key not found, or found tombstone (deleted)
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut sstables = self.sstables.write();

        for reader in sstables.iter_mut() {
            if !reader.might_contain(key) {
                continue;
            }

            match reader.get(key) {
                Ok(found) => return Ok(found),
                Err(GroupKvError::KeyNotFound) => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }

    /// One lazy cursor per SSTable over `range`, ordered newest → oldest.
    /// Tombstones are kept so the caller can shadow older data.
    pub fn scan(&self, range: &KeyRange) -> Result<Vec<SSTableIterator<BufReader<File>>>> {
        self.sstables
            .read()
            .iter()
            .map(|reader| reader.scan(range))
            .collect()
    }

    /// Flush a MemTable to a new SSTable
    pub fn flush(&self, memtable: &MemTable) -> Result<SSTable> {
        if memtable.is_empty() {
            return Err(GroupKvError::Storage(
                "Cannot flush empty MemTable".to_string(),
            ));
        }

        let id = self.next_sstable_id.fetch_add(1, Ordering::SeqCst);
        let path = self.sstable_path(id);

        let mut builder = SSTableBuilder::new(&path)?;
        for (key, entry) in memtable.iter() {
            match entry {
                MemTableEntry::Value(v) => builder.add(&key, &v)?,
                MemTableEntry::Tombstone => builder.add_tombstone(&key)?,
            }
        }
        let metadata = builder.finish()?;

        let reader = SSTableReader::open(&path)?;
        self.sstables.write().insert(0, reader);

        tracing::debug!(
            path = %metadata.path.display(),
            entries = metadata.entry_count,
            bytes = metadata.file_size,
            "flushed memtable"
        );

        Ok(metadata)
    }

    /// Get the number of SSTables
    pub fn sstable_count(&self) -> usize {
        self.sstables.read().len()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn next_sstable_id(&self) -> u64 {
        self.next_sstable_id.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn sstable_path(&self, id: u64) -> PathBuf {
        Self::sstable_path_with_dir(&self.data_dir, id)
    }

    fn sstable_path_with_dir(dir: &Path, id: u64) -> PathBuf {
        dir.join(format!("sstable_{:06}.{}", id, Self::EXTENSION))
    }

    /// "sstable_000042.sst" → Some((42, true));
    /// "sstable_000042.corrupt" → Some((42, false))
    fn parse_sstable_id(path: &Path) -> Option<(u64, bool)> {
        let ext = path.extension()?;
        let live = if ext == Self::EXTENSION {
            true
        } else if ext == Self::QUARANTINE_EXTENSION {
            false
        } else {
            return None;
        };
        let name = path.file_stem()?.to_string_lossy();
        let id = name.strip_prefix("sstable_")?.parse().ok()?;
        Some((id, live))
    }
}
