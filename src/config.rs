//! Configuration for GroupKV
//!
//! Centralized configuration with sensible defaults. `Config` describes the
//! whole sharded store; `ShardOptions` is the slice of it each shard engine
//! needs.

use std::path::{Path, PathBuf};

use crate::error::{GroupKvError, Result};

/// Default number of shards
pub const DEFAULT_SHARD_COUNT: usize = 16;

/// Directory name prefix of each shard (`db-0`, `db-1`, ...)
pub const SHARD_DIR_PREFIX: &str = "db";

/// Main configuration for a GroupKV store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Layout Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {root}/{path}/
    ///     ├── db-0/
    ///     │   ├── wal.log
    ///     │   └── sstables/
    ///     ├── db-1/
    ///     └── ...
    pub root: PathBuf,

    /// Sub path of this store below `root`
    pub path: PathBuf,

    /// Number of shards. Part of the persisted layout: changing it for an
    /// existing data set makes keys unreachable.
    pub shard_count: usize,

    // -------------------------------------------------------------------------
    // Shard Engine Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync each shard's WAL
    pub wal_sync_strategy: WalSyncStrategy,

    /// Max size of a shard's memtable before flush (in bytes)
    pub memtable_size_limit: usize,

    // -------------------------------------------------------------------------
    // Record Store Configuration
    // -------------------------------------------------------------------------
    /// Capacity of the record store's work queue (in batches)
    pub queue_capacity: usize,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./groupkv_data"),
            path: PathBuf::from("store"),
            shard_count: DEFAULT_SHARD_COUNT,
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            memtable_size_limit: 4 * 1024 * 1024, // 4 MB per shard
            queue_capacity: 1_000_000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Directory holding every shard of this store
    pub fn store_dir(&self) -> PathBuf {
        self.root.join(&self.path)
    }

    /// Data directory of shard `index`
    pub fn shard_dir(&self, index: usize) -> PathBuf {
        shard_dir(&self.store_dir(), index)
    }

    /// Options handed to each shard engine
    pub fn shard_options(&self) -> ShardOptions {
        ShardOptions {
            wal_sync_strategy: self.wal_sync_strategy,
            memtable_size_limit: self.memtable_size_limit,
        }
    }

    /// Reject configurations the store cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.shard_count == 0 {
            return Err(GroupKvError::Config(
                "shard_count must be greater than zero".to_string(),
            ));
        }
        if self.memtable_size_limit == 0 {
            return Err(GroupKvError::Config(
                "memtable_size_limit must be greater than zero".to_string(),
            ));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(GroupKvError::Config(
                "WAL sync interval must be greater than zero".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(GroupKvError::Config(
                "queue_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// `{store_dir}/db-{index}`
pub fn shard_dir(store_dir: &Path, index: usize) -> PathBuf {
    store_dir.join(format!("{}-{}", SHARD_DIR_PREFIX, index))
}

/// Per-shard engine options
#[derive(Debug, Clone, Copy)]
pub struct ShardOptions {
    pub wal_sync_strategy: WalSyncStrategy,
    pub memtable_size_limit: usize,
}

impl Default for ShardOptions {
    fn default() -> Self {
        Config::default().shard_options()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the root directory
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.root = path.into();
        self
    }

    /// Set the store's sub path below the root
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Set the number of shards
    pub fn shard_count(mut self, count: usize) -> Self {
        self.config.shard_count = count;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the memtable size limit (in bytes)
    pub fn memtable_size_limit(mut self, size: usize) -> Self {
        self.config.memtable_size_limit = size;
        self
    }

    /// Set the record store queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
