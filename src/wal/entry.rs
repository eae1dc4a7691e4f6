//! WAL Entry definitions
//!
//! Defines the structure of individual WAL records and their framing.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{GroupKvError, Result};

/// Frame header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// A single record in the WAL
///
/// A record carries every operation of one logical write, so a batch is
/// replayed either completely or not at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operations to apply, in order
    pub operations: Vec<Operation>,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },
}

impl Operation {
    pub fn key(&self) -> &[u8] {
        match self {
            Operation::Put { key, .. } | Operation::Delete { key } => key,
        }
    }

    /// Bytes this operation contributes to a batch's value size
    pub fn size(&self) -> usize {
        match self {
            Operation::Put { key, value } => key.len() + value.len(),
            Operation::Delete { key } => key.len(),
        }
    }
}

impl WalEntry {
    pub fn new(lsn: u64, operations: Vec<Operation>) -> Self {
        Self {
            lsn,
            operations,
            timestamp: now_millis(),
        }
    }

    /// Encode as a complete frame: header followed by the payload
    pub fn serialize(&self) -> Result<Bytes> {
        encode_frame(&WalEntryRef {
            lsn: self.lsn,
            operations: &self.operations,
            timestamp: self.timestamp,
        })
    }

    /// Encode a frame for `operations` without taking ownership of them
    pub fn frame(lsn: u64, operations: &[Operation]) -> Result<Bytes> {
        encode_frame(&WalEntryRef {
            lsn,
            operations,
            timestamp: now_millis(),
        })
    }

    /// Decode a complete frame, verifying its checksum
    pub fn deserialize(mut bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(GroupKvError::Corruption(format!(
                "WAL frame shorter than header: {} bytes",
                bytes.len()
            )));
        }

        let lsn = bytes.get_u64_le();
        let crc = bytes.get_u32_le();
        let len = bytes.get_u32_le() as usize;

        if bytes.len() < len {
            return Err(GroupKvError::Corruption(format!(
                "WAL frame for lsn {} truncated: expected {} bytes, got {}",
                lsn,
                len,
                bytes.len()
            )));
        }

        Self::decode_payload(lsn, crc, &bytes[..len])
    }

    /// Verify and decode a payload whose header fields were already parsed
    pub(super) fn decode_payload(lsn: u64, crc: u32, data: &[u8]) -> Result<Self> {
        let actual = crc32fast::hash(data);
        if actual != crc {
            return Err(GroupKvError::Corruption(format!(
                "WAL checksum mismatch at lsn {}: expected {:#x}, got {:#x}",
                lsn, crc, actual
            )));
        }

        let entry: WalEntry = bincode::deserialize(data)
            .map_err(|e| GroupKvError::Corruption(format!("WAL payload undecodable: {}", e)))?;

        if entry.lsn != lsn {
            return Err(GroupKvError::Corruption(format!(
                "WAL header lsn {} does not match payload lsn {}",
                lsn, entry.lsn
            )));
        }

        Ok(entry)
    }
}

/// Borrowed twin of [`WalEntry`]; bincode encodes both identically
#[derive(Serialize)]
struct WalEntryRef<'a> {
    lsn: u64,
    operations: &'a [Operation],
    timestamp: u64,
}

fn encode_frame(entry: &WalEntryRef<'_>) -> Result<Bytes> {
    let data = bincode::serialize(entry)?;
    let len = u32::try_from(data.len()).map_err(|_| {
        GroupKvError::Serialization(format!("WAL record too large: {} bytes", data.len()))
    })?;

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + data.len());
    buf.put_u64_le(entry.lsn);
    buf.put_u32_le(crc32fast::hash(&data));
    buf.put_u32_le(len);
    buf.put_slice(&data);

    Ok(buf.freeze())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
