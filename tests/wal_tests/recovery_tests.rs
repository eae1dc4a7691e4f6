//! Tests for WAL Recovery
//!
//! These tests verify:
//! - Clean logs recover unchanged
//! - Torn tails are truncated
//! - Damaged complete records are skipped
//! - verify() never modifies the file

use std::fs::{self, OpenOptions};
use std::io::Write;

use groupkv::config::WalSyncStrategy;
use groupkv::wal::{RecoveryResult, WalReader, WalRecovery, WalWriter};

use crate::{put, setup_temp_wal};

fn write_records(path: &std::path::Path, count: u64) -> Vec<u64> {
    let mut writer = WalWriter::open(path, WalSyncStrategy::EveryWrite).unwrap();
    let mut ends = Vec::new();
    for i in 0..count {
        writer
            .append(&[put(format!("key{}", i).as_bytes(), b"value")])
            .unwrap();
        ends.push(fs::metadata(path).unwrap().len());
    }
    ends
}

#[test]
fn test_recover_clean_log() {
    let (_temp, wal_path) = setup_temp_wal();
    write_records(&wal_path, 5);
    let len_before = fs::metadata(&wal_path).unwrap().len();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 5);
    assert_eq!(
        result,
        RecoveryResult {
            entries_recovered: 5,
            entries_corrupted: 0,
            last_lsn: 5,
            was_truncated: false,
        }
    );
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), len_before);
}

#[test]
fn test_recover_truncates_torn_tail() {
    let (_temp, wal_path) = setup_temp_wal();
    let ends = write_records(&wal_path, 3);

    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[0xAB; 9]).unwrap();
    drop(file);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 3);
    assert!(result.was_truncated);
    assert_eq!(result.last_lsn, 3);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), ends[2]);

    // Strict reading succeeds again after truncation
    assert_eq!(WalReader::read_all(&wal_path).unwrap().len(), 3);
}

#[test]
fn test_recover_skips_damaged_record() {
    let (_temp, wal_path) = setup_temp_wal();
    let ends = write_records(&wal_path, 3);

    // Flip the last payload byte of the middle record
    let mut bytes = fs::read(&wal_path).unwrap();
    let middle_end = ends[1] as usize;
    bytes[middle_end - 1] ^= 0xFF;
    fs::write(&wal_path, &bytes).unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].lsn, 1);
    assert_eq!(entries[1].lsn, 3);
    assert_eq!(result.entries_corrupted, 1);
    assert!(!result.was_truncated);
}

#[test]
fn test_verify_does_not_modify_file() {
    let (_temp, wal_path) = setup_temp_wal();
    write_records(&wal_path, 2);

    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[0x01, 0x02, 0x03]).unwrap();
    drop(file);
    let len_before = fs::metadata(&wal_path).unwrap().len();

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 2);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), len_before);
}
