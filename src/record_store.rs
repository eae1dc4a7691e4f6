//! Record Store
//!
//! Asynchronous persistence of records into a group store.
//!
//! ## Flow
//! ```text
//!   store / store_many ──► bounded queue ──► consumer thread
//!                                              ├─ bincode-encode record
//!                                              ├─ generate unique key
//!                                              └─ GroupStore::set
//! ```
//!
//! Keys are 16 bytes: the store's open time in nanoseconds followed by a
//! sequence number, both big endian. The sequence's low byte is the last key
//! byte, so consecutive records rotate through the shards.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam::channel::{self, Receiver, Sender};
use serde::Serialize;

use crate::config::Config;
use crate::error::{GroupKvError, Result};
use crate::group::GroupStore;

/// Length of generated record keys
pub const RECORD_KEY_LEN: usize = 16;

#[derive(Default)]
struct Counters {
    stored: AtomicU64,
    failed: AtomicU64,
}

/// Generates process-unique record keys
struct KeyGenerator {
    epoch: u64,
    sequence: u64,
}

impl KeyGenerator {
    fn new() -> Self {
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self { epoch, sequence: 0 }
    }

    fn next_key(&mut self) -> [u8; RECORD_KEY_LEN] {
        let mut key = [0u8; RECORD_KEY_LEN];
        key[..8].copy_from_slice(&self.epoch.to_be_bytes());
        key[8..].copy_from_slice(&self.sequence.to_be_bytes());
        self.sequence += 1;
        key
    }
}

enum Worker<T> {
    Idle {
        store: GroupStore,
        receiver: Receiver<Vec<T>>,
    },
    Running(JoinHandle<GroupStore>),
}

/// Queue-fed writer persisting serialized records under generated keys
pub struct RecordStore<T> {
    sender: Sender<Vec<T>>,
    worker: Option<Worker<T>>,
    counters: Arc<Counters>,
    _record: PhantomData<fn(T)>,
}

impl<T> RecordStore<T>
where
    T: Serialize + Send + 'static,
{
    /// Open the backing group store and the work queue
    ///
    /// Records may be queued right away; they are persisted once `start`
    /// runs (or when `stop` drains the queue).
    pub fn open(config: Config) -> Result<Self> {
        let capacity = config.queue_capacity;
        let store = GroupStore::open(config)?;
        let (sender, receiver) = channel::bounded(capacity);

        Ok(Self {
            sender,
            worker: Some(Worker::Idle { store, receiver }),
            counters: Arc::new(Counters::default()),
            _record: PhantomData,
        })
    }

    /// Spawn the consumer thread; a no-op when already running
    pub fn start(&mut self) -> Result<()> {
        let (store, receiver) = match self.worker.take() {
            Some(Worker::Idle { store, receiver }) => (store, receiver),
            // Keep the running consumer so stop() can still join it
            running => {
                self.worker = running;
                return Ok(());
            }
        };

        let counters = Arc::clone(&self.counters);
        let handle = thread::Builder::new()
            .name("groupkv-records".to_string())
            .spawn(move || consume(store, receiver, &counters))?;

        tracing::info!("record consumer started");
        self.worker = Some(Worker::Running(handle));
        Ok(())
    }

    /// Queue one record, blocking while the queue is full
    pub fn store(&self, record: T) -> Result<()> {
        self.store_many(vec![record])
    }

    /// Queue several records as one unit of work
    pub fn store_many(&self, records: Vec<T>) -> Result<()> {
        self.sender
            .send(records)
            .map_err(|_| GroupKvError::QueueClosed)
    }

    /// Records persisted so far
    pub fn stored(&self) -> u64 {
        self.counters.stored.load(Ordering::Relaxed)
    }

    /// Records that could not be encoded or written
    pub fn failed(&self) -> u64 {
        self.counters.failed.load(Ordering::Relaxed)
    }

    /// Batches waiting in the queue
    pub fn pending(&self) -> usize {
        self.sender.len()
    }

    /// Persist everything still queued, stop the consumer and close the
    /// group store
    pub fn stop(self) -> Result<()> {
        let RecordStore {
            sender,
            worker,
            counters,
            ..
        } = self;
        // Disconnects the queue; the consumer exits once it is drained
        drop(sender);

        let store = match worker {
            Some(Worker::Running(handle)) => handle.join().map_err(|_| {
                GroupKvError::Storage("record consumer thread panicked".to_string())
            })?,
            Some(Worker::Idle { store, receiver }) => consume(store, receiver, &counters),
            None => return Ok(()),
        };

        tracing::info!(
            stored = counters.stored.load(Ordering::Relaxed),
            failed = counters.failed.load(Ordering::Relaxed),
            "record consumer stopped"
        );

        store.close()
    }
}

/// Drain `receiver` until every sender is gone, then hand the store back
fn consume<T: Serialize>(
    store: GroupStore,
    receiver: Receiver<Vec<T>>,
    counters: &Counters,
) -> GroupStore {
    let mut keys = KeyGenerator::new();

    for records in receiver {
        for record in records {
            let key = keys.next_key();
            let outcome = bincode::serialize(&record)
                .map_err(GroupKvError::from)
                .and_then(|bytes| store.set(&key, &bytes));

            match outcome {
                Ok(()) => {
                    counters.stored.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(error = %e, "failed to persist record");
                }
            }
        }
    }

    store
}
