//! Group store test suite
//!
//! Exercises the sharded store end to end: routing, batches fanned out over
//! shards, chained scans, and the record producer.

mod record_store_tests;

use std::path::PathBuf;

use groupkv::{Config, GroupStore, WalSyncStrategy};
use tempfile::TempDir;

// =============================================================================
// Shared Helpers
// =============================================================================

pub fn test_config(temp: &TempDir) -> Config {
    Config::builder()
        .root(temp.path())
        .path("store")
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .queue_capacity(1024)
        .build()
}

pub fn setup_temp_store() -> (TempDir, GroupStore) {
    let temp = TempDir::new().unwrap();
    let store = GroupStore::open(test_config(&temp)).unwrap();
    (temp, store)
}

pub fn shard_dir(temp: &TempDir, index: usize) -> PathBuf {
    temp.path().join("store").join(format!("db-{}", index))
}
