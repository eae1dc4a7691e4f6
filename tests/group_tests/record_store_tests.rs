//! Tests for RecordStore
//!
//! These tests verify:
//! - Records queued from many producers are all persisted
//! - Keys are generated uniquely and spread over shards
//! - Records queued before start are drained on stop

use std::collections::HashSet;
use std::thread;

use groupkv::{Config, Cursor, GroupStore, RecordStore, WalSyncStrategy};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use crate::test_config;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Order {
    id: u64,
    customer: String,
    amount_cents: i64,
}

fn order(id: u64) -> Order {
    Order {
        id,
        customer: format!("customer-{}", id % 7),
        amount_cents: id as i64 * 100,
    }
}

/// Every persisted record, decoded, plus the shards they landed on
fn read_back(temp: &TempDir) -> (Vec<Order>, HashSet<usize>) {
    let store = GroupStore::open(test_config(temp)).unwrap();
    let mut orders: Vec<Order> = Vec::new();
    let mut shards = HashSet::new();

    let mut cursor = store.new_iterator(b"", b"");
    while cursor.next() {
        assert_eq!(cursor.key().unwrap().len(), 16);
        shards.insert(cursor.current_shard().unwrap());
        orders.push(bincode::deserialize(cursor.value().unwrap()).unwrap());
    }
    assert!(cursor.error().is_none());
    // The cursor borrows the store, so it must be gone before close
    drop(cursor);
    store.close().unwrap();

    orders.sort_by_key(|o| o.id);
    (orders, shards)
}

#[test]
fn test_records_are_persisted() {
    let temp = TempDir::new().unwrap();
    let mut records = RecordStore::open(test_config(&temp)).unwrap();
    records.start().unwrap();

    for id in 0..100 {
        records.store(order(id)).unwrap();
    }
    records.stop().unwrap();

    let (orders, shards) = read_back(&temp);
    assert_eq!(orders, (0..100).map(order).collect::<Vec<_>>());
    // Sequential keys rotate through every shard
    assert_eq!(shards.len(), 16);
}

#[test]
fn test_store_many_from_several_producers() {
    let temp = TempDir::new().unwrap();
    let mut records = RecordStore::open(test_config(&temp)).unwrap();
    records.start().unwrap();

    thread::scope(|s| {
        for t in 0..4u64 {
            let records = &records;
            s.spawn(move || {
                let batch: Vec<Order> = (0..50).map(|i| order(t * 50 + i)).collect();
                records.store_many(batch).unwrap();
            });
        }
    });
    records.stop().unwrap();

    let (orders, _) = read_back(&temp);
    assert_eq!(orders.len(), 200);
    let ids: HashSet<u64> = orders.iter().map(|o| o.id).collect();
    assert_eq!(ids.len(), 200);
}

#[test]
fn test_stop_without_start_drains_queue() {
    let temp = TempDir::new().unwrap();
    let records = RecordStore::open(test_config(&temp)).unwrap();

    records.store(order(1)).unwrap();
    records.store_many(vec![order(2), order(3)]).unwrap();
    assert_eq!(records.pending(), 2);
    assert_eq!(records.stored(), 0);

    records.stop().unwrap();

    let (orders, _) = read_back(&temp);
    assert_eq!(orders, vec![order(1), order(2), order(3)]);
}

#[test]
fn test_start_twice_is_harmless() {
    let temp = TempDir::new().unwrap();
    let mut records = RecordStore::open(test_config(&temp)).unwrap();

    records.start().unwrap();
    records.start().unwrap();
    records.store(order(9)).unwrap();
    records.stop().unwrap();

    let (orders, _) = read_back(&temp);
    assert_eq!(orders, vec![order(9)]);
}

#[test]
fn test_stop_after_second_start_drains_everything() {
    let temp = TempDir::new().unwrap();
    let config = Config {
        wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 1000 },
        ..test_config(&temp)
    };
    let mut records = RecordStore::open(config).unwrap();

    records.start().unwrap();
    records.start().unwrap();
    // Enough that the consumer is still busy when stop is called
    for id in 0..20_000 {
        records.store(order(id)).unwrap();
    }
    records.stop().unwrap();

    let (orders, _) = read_back(&temp);
    assert_eq!(orders.len(), 20_000);
    assert_eq!(orders.first(), Some(&order(0)));
    assert_eq!(orders.last(), Some(&order(19_999)));
}

#[test]
fn test_stored_counter_advances() {
    let temp = TempDir::new().unwrap();
    let mut records = RecordStore::open(test_config(&temp)).unwrap();
    records.start().unwrap();

    for id in 0..10 {
        records.store(order(id)).unwrap();
    }
    while records.stored() < 10 {
        thread::yield_now();
    }

    assert_eq!(records.failed(), 0);
    assert_eq!(records.pending(), 0);
    records.stop().unwrap();
}
