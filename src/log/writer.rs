//! Log Writer
//!
//! Handles appending frames to the data file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::SyncStrategy;
use crate::error::Result;

/// Appends encoded frames to the end of the data file
///
/// Every append is flushed to the OS before returning so the separate read
/// handle can see it; fsync follows the configured `SyncStrategy`.
pub struct LogWriter {
    /// Buffered append handle
    file: BufWriter<File>,
    /// Byte offset where the next frame lands
    end: u64,
    /// When to fsync
    sync_strategy: SyncStrategy,
    /// Appends since the last fsync
    unsynced: usize,
}

impl LogWriter {
    /// Open the data file for appending
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let end = file.metadata()?.len();

        Ok(Self {
            file: BufWriter::new(file),
            end,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Append a frame, returning the offset it was written at
    pub fn append(&mut self, frame: &[u8]) -> Result<u64> {
        let offset = self.end;

        self.file.write_all(frame)?;
        self.file.flush()?;
        self.end += frame.len() as u64;
        self.unsynced += 1;

        let should_sync = match self.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if should_sync {
            self.sync()?;
        }

        Ok(offset)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.get_ref().sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Cut the file at `offset`, dropping everything after it
    pub fn truncate(&mut self, offset: u64) -> Result<()> {
        self.file.flush()?;
        self.file.get_ref().set_len(offset)?;
        self.file.get_ref().sync_all()?;
        self.end = offset;
        self.unsynced = 0;
        Ok(())
    }

    /// Offset the next append will be written at (equals the file size)
    pub fn end_offset(&self) -> u64 {
        self.end
    }

    /// Number of appends not yet fsynced
    pub fn unsynced(&self) -> usize {
        self.unsynced
    }
}
