//! Engine Module
//!
//! The embedded storage engine behind every shard.
//!
//! ## Responsibilities
//! - Coordinate WAL, MemTable, and Storage
//! - Handle concurrent read/write access
//! - Trigger flushes when MemTable is full
//! - Strict open, plus a lenient recovery open for damaged directories

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::config::ShardOptions;
use crate::error::{GroupKvError, Result};
use crate::kv::KeyRange;
use crate::memtable::{MemTable, MemTableEntry};
use crate::storage::{EntrySource, MergingIterator, SSTableEntry, StorageManager};
use crate::wal::{Operation, WalEntry, WalReader, WalRecovery, WalWriter};

/// How an engine treats damage found while opening
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenMode {
    /// Any damage is reported as `Corruption`
    Strict,
    /// Keep what is readable, truncate torn WAL tails, set damaged tables aside
    Recover,
}

/// The embedded storage engine of one shard
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (put/delete/batch/flush): Serialized by `write_lock`
///   - Must acquire: write_lock → WAL → memtable → storage
///
/// - **Reads** (get/has/range/scan): no write_lock
///   - MemTable uses internal RwLock (many concurrent readers)
///   - StorageManager takes its own lock for SSTable reads
///   - The MemTable is always consulted before the SSTables
pub struct Engine {
    data_dir: PathBuf,

    options: ShardOptions,

    /// Directory for SSTables
    storage_dir: PathBuf,

    /// Write-ahead log (exclusive access needed)
    wal: Mutex<WalWriter>,

    /// In-memory table for recent writes (internal RwLock)
    memtable: MemTable,

    /// Persistent storage manager (internal RwLock on sstables vec)
    storage: StorageManager,

    /// Serializes write operations
    write_lock: Mutex<()>,

    /// Scan cursors handed out and not yet released
    open_cursors: AtomicUsize,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";
    const SSTABLE_DIR: &'static str = "sstables";

    /// Open or create an engine, failing with `Corruption` on any damage
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Load existing SSTables (verifying checksums)
    /// 3. Replay the WAL and flush what it held
    /// 4. Start a fresh WAL
    pub fn open(path: &Path, options: ShardOptions) -> Result<Self> {
        Self::open_with(path, options, OpenMode::Strict)
    }

    /// Open a directory that failed [`Engine::open`] with `Corruption`
    ///
    /// Replays every intact WAL record, drops a torn tail, and renames
    /// damaged SSTables to `*.corrupt`.
    pub fn recover(path: &Path, options: ShardOptions) -> Result<Self> {
        Self::open_with(path, options, OpenMode::Recover)
    }

    fn open_with(path: &Path, options: ShardOptions, mode: OpenMode) -> Result<Self> {
        fs::create_dir_all(path)?;

        let storage_dir = path.join(Self::SSTABLE_DIR);
        let wal_path = path.join(Self::WAL_FILENAME);

        let storage = match mode {
            OpenMode::Strict => StorageManager::open(&storage_dir)?,
            OpenMode::Recover => StorageManager::open_recovering(&storage_dir)?,
        };

        let memtable = MemTable::new();

        if wal_path.exists() {
            let entries = match mode {
                OpenMode::Strict => WalReader::read_all(&wal_path)?,
                OpenMode::Recover => {
                    let (entries, result) = WalRecovery::recover(&wal_path)?;
                    tracing::info!(
                        path = %path.display(),
                        recovered = result.entries_recovered,
                        corrupted = result.entries_corrupted,
                        last_lsn = result.last_lsn,
                        truncated = result.was_truncated,
                        "WAL recovery finished"
                    );
                    entries
                }
            };

            replay(&memtable, entries);

            // Make replayed data durable before the WAL is recreated
            if !memtable.is_empty() {
                tracing::debug!(
                    path = %path.display(),
                    entries = memtable.entry_count(),
                    "flushing replayed WAL entries"
                );
                storage.flush(&memtable)?;
                memtable.clear();
            }
        }

        let wal = WalWriter::open(&wal_path, options.wal_sync_strategy)?;

        Ok(Self {
            data_dir: path.to_path_buf(),
            options,
            storage_dir,
            wal: Mutex::new(wal),
            memtable,
            storage,
            write_lock: Mutex::new(()),
            open_cursors: AtomicUsize::new(0),
        })
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. MemTable (most recent writes)
    /// 2. SSTables (newest to oldest)
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        if let Some(entry) = self.memtable.get(key) {
            return match entry {
                MemTableEntry::Value(value) => Ok(value),
                MemTableEntry::Tombstone => Err(GroupKvError::KeyNotFound),
            };
        }

        self.storage.get(key)?.ok_or(GroupKvError::KeyNotFound)
    }

    pub fn has(&self, key: &[u8]) -> Result<bool> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(GroupKvError::KeyNotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write_batch(&[Operation::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        }])
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.write_batch(&[Operation::Delete { key: key.to_vec() }])
    }

    /// Apply `operations` as one WAL record
    ///
    /// Steps:
    /// 1. Acquire write lock
    /// 2. Append one record to the WAL (durability)
    /// 3. Apply every operation to the MemTable
    /// 4. Flush if the MemTable reached its limit
    pub fn write_batch(&self, operations: &[Operation]) -> Result<()> {
        if operations.is_empty() {
            return Ok(());
        }

        let _write_guard = self.write_lock.lock();

        self.wal.lock().append(operations)?;

        let mut size = self.memtable.size();
        for op in operations {
            size = match op {
                Operation::Put { key, value } => self.memtable.put(key.clone(), value.clone()),
                Operation::Delete { key } => self.memtable.delete(key.clone()),
            };
        }

        if size >= self.options.memtable_size_limit {
            self.flush_internal()?;
        }

        Ok(())
    }

    /// Lazy newest-wins merge of the MemTable and every SSTable over `range`
    ///
    /// Tombstones are yielded as `None` values. The MemTable is read before
    /// the table list: a flush installs its SSTable before clearing the
    /// MemTable, so a key moving between the two is seen in at least one.
    pub fn range(&self, range: &KeyRange) -> Result<MergingIterator> {
        let recent: Vec<SSTableEntry> = self
            .memtable
            .range(range)
            .into_iter()
            .map(|(key, entry)| match entry {
                MemTableEntry::Value(v) => (key, Some(v)),
                MemTableEntry::Tombstone => (key, None),
            })
            .collect();

        let memtable: EntrySource = Box::new(recent.into_iter().map(Ok));
        let mut sources = vec![memtable];
        for table in self.storage.scan(range)? {
            sources.push(Box::new(table));
        }

        Ok(MergingIterator::new(sources))
    }

    /// Live entries in `range`, sorted by key
    pub fn scan(&self, range: &KeyRange) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut live = Vec::new();
        for item in self.range(range)? {
            if let (key, Some(value)) = item? {
                live.push((key, value));
            }
        }
        Ok(live)
    }

    /// Flush memtable to disk
    ///
    /// Forces a flush regardless of memtable size
    pub fn flush(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.flush_internal()
    }

    /// Internal flush implementation (called with write lock held)
    fn flush_internal(&self) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }

        self.storage.flush(&self.memtable)?;
        self.memtable.clear();

        // Entries are now durable in an SSTable
        self.wal.lock().truncate()?;

        Ok(())
    }

    /// Close the engine gracefully
    ///
    /// Flushes any pending data and syncs the WAL.
    pub fn close(self) -> Result<()> {
        let cursors = self.open_cursors();
        if cursors > 0 {
            tracing::warn!(
                path = %self.data_dir.display(),
                cursors,
                "closing engine with unreleased cursors"
            );
        }

        self.flush()?;
        self.wal.lock().sync()?;

        Ok(())
    }

    // =========================================================================
    // Cursor Accounting
    // =========================================================================

    pub(crate) fn cursor_opened(&self) {
        self.open_cursors.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn cursor_released(&self) {
        self.open_cursors.fetch_sub(1, Ordering::SeqCst);
    }

    /// Scan cursors currently open against this engine
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the storage directory path (where SSTables are stored)
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn memtable_size(&self) -> usize {
        self.memtable.size()
    }

    pub fn memtable_entry_count(&self) -> usize {
        self.memtable.entry_count()
    }

    pub fn sstable_count(&self) -> usize {
        self.storage.sstable_count()
    }

    pub fn options(&self) -> &ShardOptions {
        &self.options
    }
}

/// Apply WAL entries to a memtable in log order
fn replay(memtable: &MemTable, entries: Vec<WalEntry>) {
    for entry in entries {
        for op in entry.operations {
            match op {
                Operation::Put { key, value } => {
                    memtable.put(key, value);
                }
                Operation::Delete { key } => {
                    memtable.delete(key);
                }
            }
        }
    }
}
