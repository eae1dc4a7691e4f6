//! Merging Iterator
//!
//! Merges sorted entry sources into one sorted stream. Sources are ordered
//! newest → oldest; when several hold the same key only the newest version is
//! yielded and the older ones are skipped.

use crate::error::{GroupKvError, Result};

use super::SSTableEntry;

/// A sorted source of entries, tombstones included
pub type EntrySource = Box<dyn Iterator<Item = Result<SSTableEntry>> + Send>;

/// Newest-wins merge over sorted sources
///
/// Each source is read one entry ahead. Tombstones are yielded like any
/// other entry so the caller decides how to treat them. The first error
/// ends the iteration.
pub struct MergingIterator {
    sources: Vec<EntrySource>,
    heads: Vec<Option<SSTableEntry>>,
    /// Raised while reading past an entry that was already chosen
    deferred: Option<GroupKvError>,
    primed: bool,
    done: bool,
}

impl MergingIterator {
    pub fn new(sources: Vec<EntrySource>) -> Self {
        let heads = sources.iter().map(|_| None).collect();
        Self {
            sources,
            heads,
            deferred: None,
            primed: false,
            done: false,
        }
    }

    fn advance(&mut self, source: usize) -> Result<()> {
        self.heads[source] = self.sources[source].next().transpose()?;
        Ok(())
    }

    fn step(&mut self) -> Result<Option<SSTableEntry>> {
        if !self.primed {
            self.primed = true;
            for source in 0..self.sources.len() {
                self.advance(source)?;
            }
        }

        // Smallest key; on a tie the lowest index is the newest source
        let winner = self
            .heads
            .iter()
            .enumerate()
            .filter_map(|(i, head)| head.as_ref().map(|(key, _)| (key, i)))
            .min()
            .map(|(_, i)| i);
        let Some(winner) = winner else {
            return Ok(None);
        };
        let Some(entry) = self.heads[winner].take() else {
            return Ok(None);
        };

        for source in 0..self.sources.len() {
            let shadowed = self.heads[source]
                .as_ref()
                .is_some_and(|(key, _)| *key == entry.0);
            if source == winner || shadowed {
                if let Err(e) = self.advance(source) {
                    self.deferred = Some(e);
                    break;
                }
            }
        }

        Ok(Some(entry))
    }
}

impl Iterator for MergingIterator {
    type Item = Result<SSTableEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(e) = self.deferred.take() {
            self.done = true;
            return Some(Err(e));
        }

        match self.step() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
