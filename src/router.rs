//! Key-based routing to determine shard assignment.
//!
//! A key belongs to the shard selected by its last byte modulo the shard
//! count; the empty key belongs to shard 0. The rule is part of the on-disk
//! contract: every key written under a given shard count can only be found
//! again under the same count.

/// Routes keys to shard indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardRouter {
    shard_count: usize,
}

impl ShardRouter {
    /// Creates a new router with the specified shard count.
    ///
    /// # Panics
    ///
    /// Panics if `shard_count` is zero. `Config::validate` rejects that value
    /// before a store ever builds a router.
    pub fn new(shard_count: usize) -> Self {
        assert!(shard_count > 0, "shard_count must be greater than zero");
        Self { shard_count }
    }

    /// Routes a key to its shard index in `0..shard_count`.
    #[inline]
    pub fn route(&self, key: &[u8]) -> usize {
        match key.last() {
            Some(&last) => last as usize % self.shard_count,
            None => 0,
        }
    }

    /// Returns the total number of shards.
    pub fn shard_count(&self) -> usize {
        self.shard_count
    }
}
