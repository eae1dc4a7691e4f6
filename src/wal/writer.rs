//! WAL Writer
//!
//! Handles appending records to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::Result;

use super::{Operation, WalEntry};

/// Writes records to the WAL file
pub struct WalWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    /// LSN of the last appended record (0 = none yet)
    current_lsn: u64,
    sync_strategy: WalSyncStrategy,
    /// Records written since the last fsync
    unsynced: usize,
}

impl WalWriter {
    /// Create a fresh WAL at `path`
    ///
    /// Any existing content is discarded: callers replay an existing log
    /// before opening a writer over it.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        file.sync_all()?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            current_lsn: 0,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Append one record holding `operations`; returns its LSN
    pub fn append(&mut self, operations: &[Operation]) -> Result<u64> {
        let lsn = self.current_lsn + 1;
        let frame = WalEntry::frame(lsn, operations)?;

        self.writer.write_all(&frame)?;
        // Hand the record to the OS so a process crash cannot lose it
        self.writer.flush()?;
        self.current_lsn = lsn;
        self.unsynced += 1;

        match self.sync_strategy {
            WalSyncStrategy::EveryWrite => self.sync()?,
            WalSyncStrategy::EveryNEntries { count } if self.unsynced >= count => self.sync()?,
            WalSyncStrategy::EveryNEntries { .. } => {}
        }

        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Drop every record (their effects are durable elsewhere)
    ///
    /// LSNs keep increasing across truncations.
    pub fn truncate(&mut self) -> Result<()> {
        self.writer.flush()?;
        let file = self.writer.get_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.sync_all()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Get the current LSN
    pub fn current_lsn(&self) -> u64 {
        self.current_lsn
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
