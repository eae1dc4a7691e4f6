//! MemTable Module
//!
//! In-memory data structure for a shard's recent writes.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Single-writer/multi-reader access pattern
//! - Track size for flush triggers
//! - Ordered iteration for SSTable creation and range scans
//!
//! ## Data Structure Choice
//! BTreeMap wrapped in RwLock:
//! - Ordered keys (required for SSTable generation and scans)
//! - Simple and correct first, optimize later

mod table;

pub use table::MemTable;

/// Entry stored in the MemTable
#[derive(Debug, Clone, PartialEq)]
pub enum MemTableEntry {
    /// A live value
    Value(Vec<u8>),

    /// A tombstone (deleted key)
    Tombstone,
}
