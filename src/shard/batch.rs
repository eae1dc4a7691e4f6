//! Shard Batch
//!
//! Write-only buffer committed to one shard as a single WAL record.

use parking_lot::Mutex;

use crate::engine::Engine;
use crate::error::Result;
use crate::kv::{Batch, KeyValueWriter};
use crate::wal::Operation;

#[derive(Default)]
struct BatchState {
    operations: Vec<Operation>,
    size: usize,
}

/// A batch bound to one shard
///
/// Mutations are serialized by an internal mutex, so several threads may
/// share one batch.
pub struct ShardBatch<'a> {
    shard: usize,
    engine: &'a Engine,
    state: Mutex<BatchState>,
}

impl<'a> ShardBatch<'a> {
    pub(crate) fn new(shard: usize, engine: &'a Engine, hint: usize) -> Self {
        Self {
            shard,
            engine,
            state: Mutex::new(BatchState {
                operations: Vec::with_capacity(hint),
                size: 0,
            }),
        }
    }

    /// Index of the shard this batch commits to
    pub fn shard(&self) -> usize {
        self.shard
    }

    /// Number of queued operations
    pub fn len(&self) -> usize {
        self.state.lock().operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().operations.is_empty()
    }

    fn push(&self, op: Operation) {
        let mut state = self.state.lock();
        state.size += op.size();
        state.operations.push(op);
    }
}

impl KeyValueWriter for ShardBatch<'_> {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.push(Operation::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        });
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.push(Operation::Delete { key: key.to_vec() });
        Ok(())
    }
}

impl Batch for ShardBatch<'_> {
    fn value_size(&self) -> usize {
        self.state.lock().size
    }

    fn write(&self) -> Result<()> {
        let state = self.state.lock();
        self.engine.write_batch(&state.operations)
    }

    fn reset(&self) {
        let mut state = self.state.lock();
        state.operations.clear();
        state.size = 0;
    }

    fn replay(&self, writer: &dyn KeyValueWriter) -> Result<()> {
        // Snapshot first: the writer may be this very shard
        let operations = self.state.lock().operations.clone();

        for op in operations {
            match op {
                Operation::Put { key, value } => writer.put(&key, &value)?,
                Operation::Delete { key } => writer.delete(&key)?,
            }
        }
        Ok(())
    }
}
