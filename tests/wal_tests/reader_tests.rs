//! Tests for WAL Reader
//!
//! These tests verify:
//! - Reading entries from WAL file
//! - Iterator functionality
//! - Strict handling of torn and damaged records

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use groupkv::wal::{WalEntry, WalReader};

use crate::{del, put, setup_temp_wal};

fn write_entries_to_wal(path: &Path, entries: &[WalEntry]) {
    let mut file = File::create(path).unwrap();
    for entry in entries {
        file.write_all(&entry.serialize().unwrap()).unwrap();
    }
    file.sync_all().unwrap();
}

fn append_bytes(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
}

// =============================================================================
// Basic Reading Tests
// =============================================================================

#[test]
fn test_read_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();

    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.position(), 0);
}

#[test]
fn test_read_multiple_entries() {
    let (_temp, wal_path) = setup_temp_wal();

    let entries = vec![
        WalEntry::new(1, vec![put(b"k1", b"v1")]),
        WalEntry::new(2, vec![put(b"k2", b"v2"), put(b"k3", b"v3")]),
        WalEntry::new(3, vec![del(b"k1")]),
    ];
    write_entries_to_wal(&wal_path, &entries);

    let mut reader = WalReader::open(&wal_path).unwrap();
    for (i, original) in entries.iter().enumerate() {
        let entry = reader.next_entry().unwrap().unwrap();
        assert_eq!(entry.lsn, original.lsn, "Entry {} LSN mismatch", i);
        assert_eq!(entry.operations, original.operations, "Entry {} ops mismatch", i);
    }
    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.position(), fs::metadata(&wal_path).unwrap().len());
}

#[test]
fn test_iterator_collects_all_entries() {
    let (_temp, wal_path) = setup_temp_wal();
    let entries: Vec<WalEntry> = (1..=10)
        .map(|i| WalEntry::new(i, vec![put(format!("k{}", i).as_bytes(), b"v")]))
        .collect();
    write_entries_to_wal(&wal_path, &entries);

    let read: Vec<WalEntry> = WalReader::open(&wal_path)
        .unwrap()
        .entries()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(read.len(), 10);
    assert_eq!(read.last().unwrap().lsn, 10);
}

// =============================================================================
// Strictness Tests
// =============================================================================

#[test]
fn test_torn_header_is_corruption() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_to_wal(&wal_path, &[WalEntry::new(1, vec![put(b"k", b"v")])]);
    append_bytes(&wal_path, &[0x02, 0x00, 0x00, 0x00, 0x00]);

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_entry().unwrap().is_some());

    let err = reader.next_entry().unwrap_err();
    assert!(err.is_corruption());
}

#[test]
fn test_length_past_end_of_file_is_corruption() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut header = Vec::new();
    header.extend_from_slice(&1u64.to_le_bytes());
    header.extend_from_slice(&0u32.to_le_bytes());
    header.extend_from_slice(&10_000u32.to_le_bytes());
    header.extend_from_slice(b"short");
    fs::write(&wal_path, &header).unwrap();

    let err = WalReader::read_all(&wal_path).unwrap_err();
    assert!(err.is_corruption());
}

#[test]
fn test_damaged_record_is_corruption() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut frame = WalEntry::new(1, vec![put(b"key", b"value")])
        .serialize()
        .unwrap()
        .to_vec();
    let last = frame.len() - 1;
    frame[last] ^= 0xFF;
    fs::write(&wal_path, &frame).unwrap();

    let err = WalReader::read_all(&wal_path).unwrap_err();
    assert!(err.is_corruption());
}

#[test]
fn test_iterator_stops_after_error() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_to_wal(&wal_path, &[WalEntry::new(1, vec![put(b"k", b"v")])]);
    append_bytes(&wal_path, b"garbage");

    let results: Vec<_> = WalReader::open(&wal_path).unwrap().entries().collect();

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(results[1].as_ref().unwrap_err().is_corruption());
}
