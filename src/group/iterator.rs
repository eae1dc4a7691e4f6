//! Chained Iterator
//!
//! Exposes one cursor per shard as a single cursor by draining the shards in
//! index order. Keys are ordered within a shard only.

use crate::error::GroupKvError;
use crate::kv::Cursor;
use crate::shard::{Shard, ShardIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unstarted,
    /// Positioned on an entry of this shard
    Active(usize),
    Exhausted,
}

/// Cursor over every shard, one shard after another
///
/// All shard cursors are opened up front and stay open until `release` (or
/// drop). A shard cursor that stops with an error ends the whole scan.
pub struct ChainedIterator<'a> {
    iterators: Vec<ShardIterator<'a>>,
    state: State,
}

impl<'a> ChainedIterator<'a> {
    pub(crate) fn new(shards: &'a [Shard], prefix: &[u8], start: &[u8]) -> Self {
        let iterators = shards
            .iter()
            .map(|shard| shard.new_iterator(prefix, start))
            .collect();

        Self {
            iterators,
            state: State::Unstarted,
        }
    }

    /// Shard currently being consumed, if positioned on an entry
    pub fn current_shard(&self) -> Option<usize> {
        match self.state {
            State::Active(index) => Some(index),
            _ => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == State::Exhausted
    }
}

impl Cursor for ChainedIterator<'_> {
    fn next(&mut self) -> bool {
        let mut index = match self.state {
            State::Unstarted => 0,
            State::Active(index) => index,
            State::Exhausted => return false,
        };

        while let Some(iterator) = self.iterators.get_mut(index) {
            if iterator.next() {
                self.state = State::Active(index);
                return true;
            }
            if iterator.error().is_some() {
                break;
            }
            index += 1;
        }

        self.state = State::Exhausted;
        false
    }

    fn key(&self) -> Option<&[u8]> {
        match self.state {
            State::Active(index) => self.iterators[index].key(),
            _ => None,
        }
    }

    fn value(&self) -> Option<&[u8]> {
        match self.state {
            State::Active(index) => self.iterators[index].value(),
            _ => None,
        }
    }

    fn error(&self) -> Option<&GroupKvError> {
        match self.state {
            State::Unstarted => self.iterators.first().and_then(|it| it.error()),
            State::Active(index) => self.iterators[index].error(),
            State::Exhausted => self.iterators.iter().find_map(|it| it.error()),
        }
    }

    /// Release every shard cursor, however far the scan got
    fn release(&mut self) {
        for iterator in &mut self.iterators {
            iterator.release();
        }
    }
}
