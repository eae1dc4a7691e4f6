//! Shard Module
//!
//! One embedded engine instance plus the batch and cursor types built on it.
//!
//! ## Open Policy
//! A shard first opens its directory strictly. If the engine reports
//! `Corruption`, exactly one recovery pass runs before the error is final.

mod batch;
mod iterator;

use std::path::{Path, PathBuf};

use crate::config::ShardOptions;
use crate::engine::Engine;
use crate::error::Result;
use crate::kv::{KeyRange, KeyValueReader, KeyValueWriter};

pub use batch::ShardBatch;
pub use iterator::ShardIterator;

/// A single shard of a group store
pub struct Shard {
    index: usize,
    path: PathBuf,
    engine: Engine,
}

impl Shard {
    /// Open the shard at `path`, recovering once from corruption
    pub fn open(index: usize, path: &Path, options: ShardOptions) -> Result<Self> {
        let engine = match Engine::open(path, options) {
            Ok(engine) => engine,
            Err(e) if e.is_corruption() => {
                tracing::warn!(
                    shard = index,
                    path = %path.display(),
                    error = %e,
                    "shard corrupted, attempting recovery"
                );
                Engine::recover(path, options)?
            }
            Err(e) => return Err(e),
        };

        tracing::debug!(
            shard = index,
            path = %path.display(),
            sstables = engine.sstable_count(),
            "opened shard"
        );

        Ok(Self {
            index,
            path: path.to_path_buf(),
            engine,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Insert `value` under `key`
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.engine.put(key, value)
    }

    pub fn new_batch(&self) -> ShardBatch<'_> {
        ShardBatch::new(self.index, &self.engine, 0)
    }

    /// Batch with room reserved for `hint` operations
    pub fn new_batch_with_size(&self, hint: usize) -> ShardBatch<'_> {
        ShardBatch::new(self.index, &self.engine, hint)
    }

    /// Cursor over keys with `prefix`, from `prefix ++ start` onwards
    pub fn new_iterator(&self, prefix: &[u8], start: &[u8]) -> ShardIterator<'_> {
        ShardIterator::new(&self.engine, KeyRange::with_prefix(prefix, start))
    }

    pub fn flush(&self) -> Result<()> {
        self.engine.flush()
    }

    /// Flush pending writes and release the engine
    pub fn close(self) -> Result<()> {
        tracing::debug!(shard = self.index, "closing shard");
        self.engine.close()
    }
}

impl KeyValueReader for Shard {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.engine.get(key)
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        self.engine.has(key)
    }
}

impl KeyValueWriter for Shard {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.engine.put(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.engine.delete(key)
    }
}
