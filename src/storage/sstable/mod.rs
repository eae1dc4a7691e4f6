//! SSTable Module
//!
//! Sorted String Table - immutable on-disk sorted key-value storage.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                       │
//! │   Magic: "GKVS" (4) | Version: u16 (2) | Count: u64 (8) │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data Block (variable)                                   │
//! │   [KeyLen: u32][ValLen: u32][Key][Value]                │
//! │   ... repeated for each entry ...                       │
//! │   (ValLen = u32::MAX means tombstone, no value bytes)   │
//! ├─────────────────────────────────────────────────────────┤
//! │ Index Block (variable)                                  │
//! │   [KeyLen: u32][Offset: u64][Key]                       │
//! │   ... repeated for each entry ...                       │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (16 bytes)                                       │
//! │   IndexOffset: u64 (8) | DataCRC: u32 (4) | IndexCRC (4)│
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Tables are written to `<name>.tmp` and renamed into place by
//! [`SSTableBuilder::finish`], so a crash mid-flush never leaves a partial
//! table under a live name.

mod builder;
mod iterator;
mod reader;

use std::path::PathBuf;

pub use builder::SSTableBuilder;
pub use iterator::SSTableIterator;
pub use reader::SSTableReader;

// =============================================================================
// Shared Constants (used by builder, reader, iterator)
// =============================================================================

/// Magic bytes identifying a GroupKV SSTable file
pub(crate) const MAGIC: &[u8; 4] = b"GKVS";

/// Current SSTable format version
pub(crate) const VERSION: u16 = 2;

/// Header size: Magic (4) + Version (2) + EntryCount (8) = 14 bytes
pub(crate) const HEADER_SIZE: u64 = 14;

/// Footer size: IndexOffset (8) + DataCRC (4) + IndexCRC (4) = 16 bytes
pub(crate) const FOOTER_SIZE: u64 = 16;

/// Sentinel value indicating a tombstone (deleted key)
pub(crate) const TOMBSTONE_MARKER: u32 = u32::MAX;

/// A decoded data-block entry; `None` value means tombstone
pub type SSTableEntry = (Vec<u8>, Option<Vec<u8>>);

// =============================================================================
// SSTable Metadata
// =============================================================================

/// Metadata of a freshly written SSTable
#[derive(Debug, Clone)]
pub struct SSTable {
    /// Path to the SSTable file
    pub path: PathBuf,
    /// Number of entries in this SSTable
    pub entry_count: u64,
    /// Smallest key
    pub min_key: Vec<u8>,
    /// Largest key
    pub max_key: Vec<u8>,
    /// File size in bytes
    pub file_size: u64,
}

impl SSTable {
    /// Get the number of entries
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Quick check if a key might be in this SSTable (range check)
    pub fn might_contain(&self, key: &[u8]) -> bool {
        key >= self.min_key.as_slice() && key <= self.max_key.as_slice()
    }
}
