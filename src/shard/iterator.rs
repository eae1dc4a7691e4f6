//! Shard Iterator
//!
//! Cursor over one shard's key range.

use crate::engine::Engine;
use crate::error::GroupKvError;
use crate::kv::{Cursor, KeyRange};
use crate::storage::MergingIterator;

/// A cursor over one shard, in key order
///
/// Creating the cursor copies the MemTable's part of the range and opens a
/// file cursor per SSTable; the tables are then read one entry at a time as
/// `next` advances. Writes made after creation are not observed: the
/// MemTable copy is fixed and SSTables are immutable. A failure, on creation
/// or while reading, ends the cursor with `error()` set. The engine counts
/// the cursor as open until `release` (or drop).
pub struct ShardIterator<'a> {
    engine: &'a Engine,
    entries: Option<MergingIterator>,
    current: Option<(Vec<u8>, Vec<u8>)>,
    error: Option<GroupKvError>,
    released: bool,
}

impl<'a> ShardIterator<'a> {
    pub(crate) fn new(engine: &'a Engine, range: KeyRange) -> Self {
        engine.cursor_opened();

        let mut cursor = Self {
            engine,
            entries: None,
            current: None,
            error: None,
            released: false,
        };
        match engine.range(&range) {
            Ok(entries) => cursor.entries = Some(entries),
            Err(e) => cursor.fail(e),
        }
        cursor
    }

    fn fail(&mut self, error: GroupKvError) {
        tracing::warn!(
            path = %self.engine.data_dir().display(),
            error = %error,
            "shard scan failed"
        );
        self.entries = None;
        self.error = Some(error);
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Cursor for ShardIterator<'_> {
    fn next(&mut self) -> bool {
        self.current = None;
        if self.released {
            return false;
        }

        while let Some(item) = self.entries.as_mut().and_then(Iterator::next) {
            match item {
                Ok((key, Some(value))) => {
                    self.current = Some((key, value));
                    return true;
                }
                // Deleted
                Ok((_, None)) => continue,
                Err(e) => {
                    self.fail(e);
                    return false;
                }
            }
        }
        self.entries = None;
        false
    }

    fn key(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(k, _)| k.as_slice())
    }

    fn value(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(_, v)| v.as_slice())
    }

    fn error(&self) -> Option<&GroupKvError> {
        self.error.as_ref()
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.current = None;
        self.entries = None;
        self.engine.cursor_released();
    }
}

impl Drop for ShardIterator<'_> {
    fn drop(&mut self) {
        self.release();
    }
}
