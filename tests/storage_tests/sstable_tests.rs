//! Tests for SSTable builder and reader
//!
//! These tests verify:
//! - Writing and reading back entries and tombstones
//! - Key ordering enforcement
//! - Range scans
//! - Detection of damaged files

use std::fs;

use groupkv::kv::KeyRange;
use groupkv::storage::{SSTableBuilder, SSTableReader};
use groupkv::GroupKvError;
use tempfile::TempDir;

use crate::{build_table, flip_byte};

// =============================================================================
// Build/Read Tests
// =============================================================================

#[test]
fn test_build_and_get() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("t.sst");
    build_table(
        &path,
        &[(b"apple", Some(b"red")), (b"banana", None), (b"cherry", Some(b"dark"))],
    );

    let mut reader = SSTableReader::open(&path).unwrap();

    assert_eq!(reader.entry_count(), 3);
    assert_eq!(reader.get(b"apple").unwrap(), Some(b"red".to_vec()));
    assert_eq!(reader.get(b"banana").unwrap(), None);
    assert!(matches!(reader.get(b"durian"), Err(GroupKvError::KeyNotFound)));
    assert_eq!(reader.min_key(), Some(&b"apple"[..]));
    assert_eq!(reader.max_key(), Some(&b"cherry"[..]));
}

#[test]
fn test_finish_leaves_no_temp_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("t.sst");
    build_table(&path, &[(b"k", Some(b"v"))]);

    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn test_keys_must_increase() {
    let temp = TempDir::new().unwrap();
    let mut builder = SSTableBuilder::new(&temp.path().join("t.sst")).unwrap();

    builder.add(b"b", b"1").unwrap();
    assert!(builder.add(b"a", b"2").is_err());
    assert!(builder.add(b"b", b"3").is_err());
}

#[test]
fn test_iter_yields_everything_in_order() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("t.sst");
    build_table(&path, &[(b"a", Some(b"1")), (b"b", None), (b"c", Some(b"3"))]);

    let mut reader = SSTableReader::open(&path).unwrap();
    let entries: Vec<_> = reader.iter().unwrap().collect::<Result<_, _>>().unwrap();

    assert_eq!(
        entries,
        vec![
            (b"a".to_vec(), Some(b"1".to_vec())),
            (b"b".to_vec(), None),
            (b"c".to_vec(), Some(b"3".to_vec())),
        ]
    );
}

// =============================================================================
// Scan Tests
// =============================================================================

#[test]
fn test_scan_prefix_range() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("t.sst");
    build_table(
        &path,
        &[
            (b"key0", Some(b"0")),
            (b"key1", Some(b"1")),
            (b"key10", None),
            (b"key11", Some(b"11")),
            (b"key2", Some(b"2")),
        ],
    );

    let reader = SSTableReader::open(&path).unwrap();
    let keys: Vec<Vec<u8>> = reader
        .scan(&KeyRange::with_prefix(b"key1", b""))
        .unwrap()
        .map(|item| item.unwrap().0)
        .collect();

    assert_eq!(keys, vec![b"key1".to_vec(), b"key10".to_vec(), b"key11".to_vec()]);
}

#[test]
fn test_scan_past_last_key_is_empty() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("t.sst");
    build_table(&path, &[(b"a", Some(b"1"))]);

    let reader = SSTableReader::open(&path).unwrap();
    assert_eq!(reader.scan(&KeyRange::with_prefix(b"z", b"")).unwrap().count(), 0);
}

#[test]
fn test_scan_reads_lazily_from_its_own_handle() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("t.sst");
    build_table(&path, &[(b"a", Some(b"1")), (b"b", Some(b"2"))]);

    let mut reader = SSTableReader::open(&path).unwrap();
    let mut scan = reader.scan(&KeyRange::all()).unwrap();

    // Point lookups on the reader do not disturb the open scan
    assert_eq!(reader.get(b"b").unwrap(), Some(b"2".to_vec()));
    assert_eq!(scan.next().unwrap().unwrap().0, b"a".to_vec());
    assert_eq!(reader.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(scan.next().unwrap().unwrap().0, b"b".to_vec());
    assert!(scan.next().is_none());
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_damaged_data_block_is_corruption() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("t.sst");
    build_table(&path, &[(b"key", Some(b"value"))]);

    // First byte after the 14-byte header
    flip_byte(&path, 14);

    let err = SSTableReader::open(&path).err().unwrap();
    assert!(err.is_corruption());
}

#[test]
fn test_bad_magic_is_corruption() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("t.sst");
    build_table(&path, &[(b"key", Some(b"value"))]);

    flip_byte(&path, 0);

    assert!(SSTableReader::open(&path).err().unwrap().is_corruption());
}

#[test]
fn test_unknown_version_is_corruption() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("t.sst");
    build_table(&path, &[(b"key", Some(b"value"))]);

    // Low byte of the version, right after the magic
    flip_byte(&path, 4);

    let err = SSTableReader::open(&path).err().unwrap();
    assert!(err.is_corruption());
    assert!(err.to_string().contains("unsupported version"));
}

#[test]
fn test_truncated_file_is_corruption() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("t.sst");
    fs::write(&path, b"GKVS").unwrap();

    assert!(SSTableReader::open(&path).err().unwrap().is_corruption());
}
