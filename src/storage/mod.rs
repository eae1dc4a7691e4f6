//! Storage Module
//!
//! Persistent per-shard storage using SSTables.
//!
//! ## Responsibilities
//! - Persist flushed memtables to disk in sorted format
//! - Point lookups and lazy, newest-wins range scans across tables
//! - Detect damaged tables and set them aside during recovery
//!
//! See [`sstable`] for the file format.

mod sstable;
mod manager;
mod merge;

pub use sstable::{SSTable, SSTableBuilder, SSTableEntry, SSTableIterator, SSTableReader};
pub use manager::StorageManager;
pub use merge::{EntrySource, MergingIterator};
