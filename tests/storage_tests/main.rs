//! Storage test suite

mod sstable_tests;

use std::fs;
use std::path::Path;

use groupkv::memtable::MemTable;
use groupkv::storage::SSTableBuilder;

// =============================================================================
// Shared Helpers
// =============================================================================

pub fn build_table(path: &Path, entries: &[(&[u8], Option<&[u8]>)]) {
    let mut builder = SSTableBuilder::new(path).unwrap();
    for (key, value) in entries {
        match value {
            Some(v) => builder.add(key, v).unwrap(),
            None => builder.add_tombstone(key).unwrap(),
        }
    }
    builder.finish().unwrap();
}

pub fn memtable_with(entries: &[(&[u8], &[u8])]) -> MemTable {
    let memtable = MemTable::new();
    for (key, value) in entries {
        memtable.put(key.to_vec(), value.to_vec());
    }
    memtable
}

/// Flip one byte of a file in place
pub fn flip_byte(path: &Path, offset: usize) {
    let mut bytes = fs::read(path).unwrap();
    bytes[offset] ^= 0xFF;
    fs::write(path, &bytes).unwrap();
}
