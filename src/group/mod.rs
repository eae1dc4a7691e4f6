//! Group Module
//!
//! The sharded store: one logical key space spread over N shards.
//!
//! ## Control Flow
//! ```text
//!   get / set / delete / has ──► ShardRouter ──► one Shard
//!
//!   new_batch ──► GroupBatch (N sub-batches)
//!                     └─ write ──► N scoped threads ──► join ──► first error
//!
//!   new_iterator ──► ChainedIterator (N shard cursors, opened eagerly)
//!                     └─ next ──► shard 0 … shard N-1, in index order
//! ```
//!
//! There is no cross-shard atomicity and no global key order across shards.

mod batch;
mod iterator;

use std::fs;

use crate::config::Config;
use crate::error::{GroupKvError, Result, ShardFailure};
use crate::kv::{KeyValueReader, KeyValueWriter};
use crate::router::ShardRouter;
use crate::shard::Shard;

pub use batch::GroupBatch;
pub use iterator::ChainedIterator;

/// Point-in-time counters of one shard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardStats {
    pub index: usize,
    pub memtable_entries: usize,
    pub memtable_bytes: usize,
    pub sstables: usize,
    pub open_cursors: usize,
}

/// A key-value store sharded over N embedded engines
pub struct GroupStore {
    config: Config,
    router: ShardRouter,
    shards: Vec<Shard>,
}

impl GroupStore {
    /// Open every shard under `{root}/{path}/db-{i}`
    ///
    /// If a shard cannot be opened the shards opened so far are closed again
    /// and the error names the failing shard.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(config.store_dir())?;

        let options = config.shard_options();
        let mut shards = Vec::with_capacity(config.shard_count);

        for index in 0..config.shard_count {
            match Shard::open(index, &config.shard_dir(index), options) {
                Ok(shard) => shards.push(shard),
                Err(e) => {
                    if let Err(close_err) = close_all(shards) {
                        tracing::error!(error = %close_err, "closing shards after failed open");
                    }
                    return Err(GroupKvError::ShardOpen {
                        shard: index,
                        source: Box::new(e),
                    });
                }
            }
        }

        tracing::info!(
            dir = %config.store_dir().display(),
            shards = config.shard_count,
            "group store opened"
        );

        Ok(Self {
            router: ShardRouter::new(config.shard_count),
            config,
            shards,
        })
    }

    /// Open with default settings at `{root}/{path}`
    pub fn open_path(root: impl Into<std::path::PathBuf>, path: impl Into<std::path::PathBuf>) -> Result<Self> {
        Self::open(Config::builder().root(root).path(path).build())
    }

    // =========================================================================
    // Single-key Operations
    // =========================================================================

    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.shard_for(key).get(key)
    }

    pub fn has(&self, key: &[u8]) -> Result<bool> {
        self.shard_for(key).has(key)
    }

    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.shard_for(key).set(key, value)
    }

    /// Same as [`GroupStore::set`]
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.set(key, value)
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.shard_for(key).delete(key)
    }

    // =========================================================================
    // Fan-out Operations
    // =========================================================================

    pub fn new_batch(&self) -> GroupBatch<'_> {
        GroupBatch::new(self.router, &self.shards, None)
    }

    /// Batch whose sub-batches each reserve room for `hint` operations
    pub fn new_batch_with_size(&self, hint: usize) -> GroupBatch<'_> {
        GroupBatch::new(self.router, &self.shards, Some(hint))
    }

    /// Scan keys with `prefix` from `prefix ++ start` onwards, shard by shard
    pub fn new_iterator(&self, prefix: &[u8], start: &[u8]) -> ChainedIterator<'_> {
        ChainedIterator::new(&self.shards, prefix, start)
    }

    /// Flush every shard's memtable; every shard is attempted
    pub fn flush(&self) -> Result<()> {
        let failures: Vec<ShardFailure> = self
            .shards
            .iter()
            .filter_map(|shard| {
                shard.flush().err().map(|error| ShardFailure {
                    shard: shard.index(),
                    error,
                })
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(GroupKvError::Close(failures))
        }
    }

    /// Close every shard, reporting every failure
    ///
    /// A failing shard never stops the remaining shards from closing.
    pub fn close(self) -> Result<()> {
        let dir = self.config.store_dir();
        let result = close_all(self.shards);

        match &result {
            Ok(()) => tracing::info!(dir = %dir.display(), "group store closed"),
            Err(e) => tracing::error!(dir = %dir.display(), error = %e, "group store closed with failures"),
        }

        result
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    pub fn route(&self, key: &[u8]) -> usize {
        self.router.route(key)
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn shard(&self, index: usize) -> Option<&Shard> {
        self.shards.get(index)
    }

    pub fn shards(&self) -> &[Shard] {
        &self.shards
    }

    /// Shard cursors currently open across all shards
    pub fn open_iterators(&self) -> usize {
        self.shards.iter().map(|s| s.engine().open_cursors()).sum()
    }

    pub fn stats(&self) -> Vec<ShardStats> {
        self.shards
            .iter()
            .map(|shard| {
                let engine = shard.engine();
                ShardStats {
                    index: shard.index(),
                    memtable_entries: engine.memtable_entry_count(),
                    memtable_bytes: engine.memtable_size(),
                    sstables: engine.sstable_count(),
                    open_cursors: engine.open_cursors(),
                }
            })
            .collect()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn shard_for(&self, key: &[u8]) -> &Shard {
        &self.shards[self.router.route(key)]
    }
}

impl KeyValueReader for GroupStore {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        GroupStore::get(self, key)
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        GroupStore::has(self, key)
    }
}

impl KeyValueWriter for GroupStore {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        GroupStore::set(self, key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        GroupStore::delete(self, key)
    }
}

/// Close every shard, collecting each failure with its shard index
fn close_all(shards: Vec<Shard>) -> Result<()> {
    let mut failures = Vec::new();

    for shard in shards {
        let index = shard.index();
        if let Err(error) = shard.close() {
            tracing::warn!(shard = index, error = %error, "failed to close shard");
            failures.push(ShardFailure { shard: index, error });
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(GroupKvError::Close(failures))
    }
}
