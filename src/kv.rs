//! Key-Value Contracts
//!
//! The traits shared by a single shard and the sharded store, plus the key
//! range used by scans.
//!
//! Every method takes `&self`: stores and batches serialize mutation
//! internally, so one handle can be shared across threads.

use crate::error::{GroupKvError, Result};

/// Point reads
pub trait KeyValueReader {
    /// Fetch the value stored under `key`; `KeyNotFound` on a miss
    fn get(&self, key: &[u8]) -> Result<Vec<u8>>;

    fn has(&self, key: &[u8]) -> Result<bool>;
}

/// Point writes
pub trait KeyValueWriter {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    fn delete(&self, key: &[u8]) -> Result<()>;
}

/// A write-only buffer committed to its store by [`Batch::write`]
pub trait Batch: KeyValueWriter {
    /// Bytes queued since creation or the last reset:
    /// `len(key) + len(value)` per put, `len(key)` per delete
    fn value_size(&self) -> usize;

    /// Commit every queued operation
    fn write(&self) -> Result<()>;

    /// Drop every queued operation
    fn reset(&self);

    /// Re-apply the queued operations to `writer`
    fn replay(&self, writer: &dyn KeyValueWriter) -> Result<()>;
}

/// A forward cursor over key/value pairs
///
/// `key`/`value` are `None` before the first successful `next` and after
/// exhaustion. Resources are held until `release` (or drop).
pub trait Cursor {
    fn next(&mut self) -> bool;

    fn key(&self) -> Option<&[u8]>;

    fn value(&self) -> Option<&[u8]>;

    fn error(&self) -> Option<&GroupKvError>;

    fn release(&mut self);
}

/// Half-open key range `[start, limit)`; no limit means unbounded
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyRange {
    pub start: Vec<u8>,
    pub limit: Option<Vec<u8>>,
}

impl KeyRange {
    /// Every key
    pub fn all() -> Self {
        Self::default()
    }

    /// Keys carrying `prefix` that sort at or after `prefix ++ start`
    ///
    /// The seek position is relative to the prefix.
    pub fn with_prefix(prefix: &[u8], start: &[u8]) -> Self {
        let mut begin = Vec::with_capacity(prefix.len() + start.len());
        begin.extend_from_slice(prefix);
        begin.extend_from_slice(start);

        Self {
            start: begin,
            limit: prefix_successor(prefix),
        }
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start.as_slice() && !self.is_past_end(key)
    }

    /// True once `key` sorts at or beyond the limit
    pub fn is_past_end(&self, key: &[u8]) -> bool {
        match &self.limit {
            Some(limit) => key >= limit.as_slice(),
            None => false,
        }
    }
}

/// Smallest key greater than every key starting with `prefix`
///
/// `None` when no such key exists (empty prefix or all `0xFF`).
fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut limit = prefix.to_vec();
    while let Some(last) = limit.pop() {
        if last < 0xFF {
            limit.push(last + 1);
            return Some(limit);
        }
    }
    None
}
