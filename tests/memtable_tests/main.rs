//! Tests for MemTable
//!
//! These tests verify:
//! - Basic put/get/delete operations
//! - Size accounting used for flush triggers
//! - Ordered iteration and range queries
//! - Concurrent readers and writers

use std::sync::Arc;
use std::thread;

use groupkv::kv::KeyRange;
use groupkv::memtable::{MemTable, MemTableEntry};

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_memtable_is_empty() {
    let memtable = MemTable::new();

    assert!(memtable.is_empty());
    assert_eq!(memtable.size(), 0);
    assert_eq!(memtable.entry_count(), 0);
}

#[test]
fn test_put_get() {
    let memtable = MemTable::new();
    memtable.put(b"key".to_vec(), b"value".to_vec());

    assert_eq!(
        memtable.get(b"key"),
        Some(MemTableEntry::Value(b"value".to_vec()))
    );
    assert_eq!(memtable.get(b"missing"), None);
}

#[test]
fn test_delete_leaves_tombstone() {
    let memtable = MemTable::new();
    memtable.put(b"key".to_vec(), b"value".to_vec());
    memtable.delete(b"key".to_vec());

    assert_eq!(memtable.get(b"key"), Some(MemTableEntry::Tombstone));
    assert_eq!(memtable.entry_count(), 1);
}

// =============================================================================
// Size Tracking Tests
// =============================================================================

#[test]
fn test_size_counts_keys_and_values() {
    let memtable = MemTable::new();

    assert_eq!(memtable.put(b"abc".to_vec(), b"12345".to_vec()), 8);
    assert_eq!(memtable.put(b"xy".to_vec(), b"1".to_vec()), 11);
    assert_eq!(memtable.size(), 11);
}

#[test]
fn test_overwrite_swaps_value_bytes() {
    let memtable = MemTable::new();
    memtable.put(b"key".to_vec(), b"long-value".to_vec());
    let size = memtable.put(b"key".to_vec(), b"v".to_vec());

    assert_eq!(size, 3 + 1);
}

#[test]
fn test_tombstone_size() {
    let memtable = MemTable::new();

    // A tombstone for an unseen key still costs its key bytes
    assert_eq!(memtable.delete(b"gone".to_vec()), 4);

    memtable.put(b"key".to_vec(), b"value".to_vec());
    assert_eq!(memtable.delete(b"key".to_vec()), 4 + 3);
}

#[test]
fn test_should_flush() {
    let memtable = MemTable::new();
    memtable.put(vec![0u8; 50], vec![0u8; 50]);

    assert!(memtable.should_flush(100));
    assert!(!memtable.should_flush(101));
}

#[test]
fn test_clear_resets_size() {
    let memtable = MemTable::new();
    memtable.put(b"a".to_vec(), b"1".to_vec());
    memtable.clear();

    assert!(memtable.is_empty());
    assert_eq!(memtable.size(), 0);
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_iter_is_sorted() {
    let memtable = MemTable::new();
    for key in [b"c", b"a", b"b"] {
        memtable.put(key.to_vec(), b"v".to_vec());
    }

    let keys: Vec<Vec<u8>> = memtable.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
}

#[test]
fn test_range_respects_prefix_bounds() {
    let memtable = MemTable::new();
    for key in ["key0", "key1", "key10", "key19", "key2"] {
        memtable.put(key.as_bytes().to_vec(), b"v".to_vec());
    }
    memtable.delete(b"key11".to_vec());

    let keys: Vec<Vec<u8>> = memtable
        .range(&KeyRange::with_prefix(b"key1", b""))
        .into_iter()
        .map(|(k, _)| k)
        .collect();

    assert_eq!(
        keys,
        vec![
            b"key1".to_vec(),
            b"key10".to_vec(),
            b"key11".to_vec(),
            b"key19".to_vec()
        ]
    );
}

#[test]
fn test_inverted_range_is_empty() {
    let memtable = MemTable::new();
    memtable.put(b"b".to_vec(), b"v".to_vec());

    let range = KeyRange {
        start: b"z".to_vec(),
        limit: Some(b"a".to_vec()),
    };
    assert!(memtable.range(&range).is_empty());
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers() {
    let memtable = Arc::new(MemTable::new());

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let memtable = Arc::clone(&memtable);
            thread::spawn(move || {
                for i in 0..250 {
                    memtable.put(format!("t{}-{:03}", t, i).into_bytes(), vec![1u8; 4]);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(memtable.entry_count(), 1000);
    // Every key is 6 bytes long plus 4 value bytes
    assert_eq!(memtable.size(), 1000 * 10);
}
