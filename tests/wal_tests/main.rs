//! WAL test suite

mod reader_tests;
mod recovery_tests;

use std::path::PathBuf;

use groupkv::wal::Operation;
use tempfile::TempDir;

// =============================================================================
// Shared Helpers
// =============================================================================

pub fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

pub fn put(key: &[u8], value: &[u8]) -> Operation {
    Operation::Put {
        key: key.to_vec(),
        value: value.to_vec(),
    }
}

pub fn del(key: &[u8]) -> Operation {
    Operation::Delete { key: key.to_vec() }
}
