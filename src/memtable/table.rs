//! MemTable implementation
//!
//! BTreeMap-based memtable with RwLock for concurrency.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::kv::KeyRange;

use super::MemTableEntry;

/// In-memory table for recent writes
pub struct MemTable {
    data: RwLock<BTreeMap<Vec<u8>, MemTableEntry>>,
    /// Approximate size in bytes (keys + values)
    size: AtomicUsize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            size: AtomicUsize::new(0),
        }
    }

    /// Get the entry for a key (read lock)
    pub fn get(&self, key: &[u8]) -> Option<MemTableEntry> {
        self.data.read().get(key).cloned()
    }

    /// Put a key-value pair (write lock); returns the new approximate size
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> usize {
        self.insert(key, MemTableEntry::Value(value))
    }

    /// Delete a key (write lock, inserts tombstone); returns the new size
    pub fn delete(&self, key: Vec<u8>) -> usize {
        self.insert(key, MemTableEntry::Tombstone)
    }

    fn insert(&self, key: Vec<u8>, entry: MemTableEntry) -> usize {
        // Size is only updated under the write lock
        let mut data = self.data.write();

        let key_len = key.len();
        let value_len = entry_len(&entry);
        let current = self.size.load(Ordering::Relaxed);

        let new_size = match data.insert(key, entry) {
            // Key bytes are already counted; swap the value bytes
            Some(old) => current.saturating_sub(entry_len(&old)) + value_len,
            None => current + key_len + value_len,
        };
        self.size.store(new_size, Ordering::Relaxed);
        new_size
    }

    /// Get approximate size in bytes
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Get entry count
    pub fn entry_count(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Check if should flush (size >= limit)
    pub fn should_flush(&self, size_limit: usize) -> bool {
        self.size() >= size_limit
    }

    /// Snapshot of all entries in sorted key order (for flush)
    pub fn iter(&self) -> std::vec::IntoIter<(Vec<u8>, MemTableEntry)> {
        let data = self.data.read();
        data.iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// Entries (tombstones included) whose keys fall in `range`, sorted
    pub fn range(&self, range: &KeyRange) -> Vec<(Vec<u8>, MemTableEntry)> {
        let data = self.data.read();
        let lower = Bound::Included(range.start.clone());
        let upper = match &range.limit {
            Some(limit) => Bound::Excluded(limit.clone()),
            None => Bound::Unbounded,
        };

        if let (Bound::Included(lo), Bound::Excluded(hi)) = (&lower, &upper) {
            // BTreeMap::range panics on an inverted range
            if lo >= hi {
                return Vec::new();
            }
        }

        data.range((lower, upper))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Clear all entries (after successful flush)
    pub fn clear(&self) {
        let mut data = self.data.write();
        data.clear();
        self.size.store(0, Ordering::Relaxed);
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

fn entry_len(entry: &MemTableEntry) -> usize {
    match entry {
        MemTableEntry::Value(v) => v.len(),
        MemTableEntry::Tombstone => 0,
    }
}
