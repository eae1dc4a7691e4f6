//! Group Batch
//!
//! Fans one logical write batch out into a sub-batch per shard and commits
//! them concurrently.

use crate::error::{GroupKvError, Result};
use crate::kv::{Batch, KeyValueWriter};
use crate::router::ShardRouter;
use crate::shard::{Shard, ShardBatch};

/// A write batch spanning every shard of a group store
///
/// `write` runs one commit thread per shard and waits for all of them.
/// Each shard commits atomically; the batch as a whole does not.
pub struct GroupBatch<'a> {
    router: ShardRouter,
    batches: Vec<ShardBatch<'a>>,
}

impl<'a> GroupBatch<'a> {
    pub(crate) fn new(router: ShardRouter, shards: &'a [Shard], hint: Option<usize>) -> Self {
        let batches = shards
            .iter()
            .map(|shard| match hint {
                Some(hint) => shard.new_batch_with_size(hint),
                None => shard.new_batch(),
            })
            .collect();

        Self { router, batches }
    }

    /// Sub-batch of shard `index`
    pub fn shard_batch(&self, index: usize) -> Option<&ShardBatch<'a>> {
        self.batches.get(index)
    }

    /// Number of queued operations across all shards
    pub fn len(&self) -> usize {
        self.batches.iter().map(ShardBatch::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.iter().all(ShardBatch::is_empty)
    }

    fn batch_for(&self, key: &[u8]) -> &ShardBatch<'a> {
        &self.batches[self.router.route(key)]
    }
}

impl KeyValueWriter for GroupBatch<'_> {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.batch_for(key).put(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.batch_for(key).delete(key)
    }
}

impl Batch for GroupBatch<'_> {
    fn value_size(&self) -> usize {
        self.batches.iter().map(|b| b.value_size()).sum()
    }

    /// Commit every sub-batch concurrently
    ///
    /// Each commit thread returns its own result; after the join the results
    /// are scanned in shard order and the lowest-indexed failure is returned.
    fn write(&self) -> Result<()> {
        let results: Vec<Result<()>> = crossbeam::thread::scope(|scope| {
            // One thread per shard, empty sub-batches included; those commit
            // as a no-op and keep results indexed by shard
            let handles: Vec<_> = self
                .batches
                .iter()
                .map(|batch| scope.spawn(move |_| batch.write()))
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(GroupKvError::Storage("batch commit thread panicked".to_string()))
                    })
                })
                .collect()
        })
        .map_err(|_| GroupKvError::Storage("batch commit scope panicked".to_string()))?;

        let mut first: Option<GroupKvError> = None;
        for (shard, result) in results.into_iter().enumerate() {
            let Err(error) = result else {
                continue;
            };

            if first.is_none() {
                first = Some(GroupKvError::Write {
                    shard,
                    source: Box::new(error),
                });
            } else {
                tracing::error!(shard, error = %error, "additional batch commit failure");
            }
        }

        match first {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn reset(&self) {
        for batch in &self.batches {
            batch.reset();
        }
    }

    fn replay(&self, _writer: &dyn KeyValueWriter) -> Result<()> {
        Err(GroupKvError::Unsupported("replay of a group batch"))
    }
}
