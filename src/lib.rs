//! # GroupKV
//!
//! An embedded key-value store that spreads one logical key space over a
//! fixed group of independent storage engines (shards):
//! - Routing by the last byte of the key
//! - Batches fanned out per shard and committed concurrently
//! - Prefix scans chained shard after shard
//! - Per-shard Write-Ahead Logging (WAL) with crash recovery
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 GroupStore / RecordStore                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    ShardRouter                               │
//! │            key[len-1] % shard_count (empty key → 0)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!       ┌───────────────┼───────────────┐
//!       ▼               ▼               ▼
//!   ┌────────┐      ┌────────┐      ┌────────┐
//!   │  db-0  │      │  db-1  │  …   │ db-N-1 │
//!   │ Engine │      │ Engine │      │ Engine │
//!   └───┬────┘      └────────┘      └────────┘
//!       │
//!       ├── WAL (append)
//!       ├── MemTable (RwLock)
//!       └── SSTables
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use groupkv::{Config, GroupStore};
//!
//! # fn main() -> groupkv::Result<()> {
//! let store = GroupStore::open(Config::builder().root("/tmp/data").path("users").build())?;
//! store.set(b"alice", b"1")?;
//! assert_eq!(store.get(b"alice")?, b"1");
//! store.close()?;
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod kv;

pub mod wal;
pub mod memtable;
pub mod storage;
pub mod engine;

pub mod router;
pub mod shard;
pub mod group;
pub mod record_store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{GroupKvError, Result, ShardFailure};
pub use config::{Config, ShardOptions, WalSyncStrategy};
pub use kv::{Batch, Cursor, KeyRange, KeyValueReader, KeyValueWriter};
pub use engine::Engine;
pub use router::ShardRouter;
pub use shard::{Shard, ShardBatch, ShardIterator};
pub use group::{ChainedIterator, GroupBatch, GroupStore, ShardStats};
pub use record_store::RecordStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of GroupKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
