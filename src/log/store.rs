//! Log Store
//!
//! Owns the data file: one append handle, one read handle, and the
//! atomic replace used by `clear` and `compact`.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::SyncStrategy;
use crate::error::{Result, ScrollError};

use super::{file_header, LogReader, LogScanner, LogWriter, Record, HEADER_SIZE, TEMP_SUFFIX};

/// The append-only data file
pub struct LogStore {
    /// Path of the data file
    path: PathBuf,
    /// Sync strategy, kept to reopen the writer after a replace
    sync_strategy: SyncStrategy,
    /// Append handle (exclusive access needed)
    writer: LogWriter,
    /// Read handle for random access
    reader: LogReader,
    /// A replace was committed but the directory fsync after it failed
    dir_sync_pending: bool,
}

impl LogStore {
    /// Open or create the data file at `path`
    ///
    /// On startup:
    /// 1. Remove a replacement file left behind by a crash mid-swap
    /// 2. Write the file header if the file is new (or died before its header landed)
    /// 3. Open the append and read handles (validates the header)
    ///
    /// Existing records are never touched here; recovery is a separate step.
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let temp = temp_path(path);
        if temp.exists() {
            warn!(path = %temp.display(), "Removing stale replacement file");
            fs::remove_file(&temp)?;
        }

        let existing_len = match fs::metadata(path) {
            Ok(meta) => Some(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        match existing_len {
            Some(len) if len >= HEADER_SIZE => {}
            Some(len) => {
                if len > 0 {
                    warn!(path = %path.display(), len, "Data file shorter than its header, rewriting");
                }
                Self::write_fresh(path)?;
            }
            None => {
                debug!(path = %path.display(), "Creating data file");
                Self::write_fresh(path)?;
            }
        }

        let writer = LogWriter::open(path, sync_strategy)?;
        let reader = LogReader::open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            sync_strategy,
            writer,
            reader,
            dir_sync_pending: false,
        })
    }

    /// Append a record, returning `(offset, length)` of its frame
    pub fn append(&mut self, record: &Record) -> Result<(u64, u64)> {
        let frame = record.encode()?;
        let offset = self.writer.append(&frame)?;
        Ok((offset, frame.len() as u64))
    }

    /// Read back a previously appended record
    pub fn read_at(&self, offset: u64, length: u64) -> Result<Record> {
        if offset < HEADER_SIZE || offset + length > self.writer.end_offset() {
            return Err(ScrollError::CorruptLog(format!(
                "record span {}..{} lies outside the log",
                offset,
                offset + length
            )));
        }
        self.reader.read_at(offset, length)
    }

    /// Start a fresh forward scan from the first record
    pub fn scan(&self) -> Result<LogScanner> {
        LogScanner::open(&self.path)
    }

    /// Drop every byte from `offset` onwards (recovery of a torn tail)
    pub fn truncate_to(&mut self, offset: u64) -> Result<()> {
        self.writer.truncate(offset)
    }

    /// Atomically replace the file's records with `contents`
    ///
    /// `contents` must be a sequence of complete frames; the header is
    /// written here.
    ///
    /// Steps:
    /// 1. Write header + contents to a side file and fsync it
    /// 2. Open the append and read handles on the side file
    /// 3. Rename the side file over the data file (the commit point)
    /// 4. Install the new handles, then fsync the directory
    ///
    /// An error from steps 1-3 leaves the old file and handles in place. Once
    /// the rename succeeds the new file is live and this returns `Ok`; if
    /// the directory fsync fails it is retried by the next `sync`.
    pub fn truncate_and_replace(&mut self, contents: &[u8]) -> Result<()> {
        let temp = temp_path(&self.path);

        let staged = Self::stage(&temp, contents, self.sync_strategy);
        let (writer, reader) = match staged {
            Ok(handles) => handles,
            Err(e) => {
                let _ = fs::remove_file(&temp);
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        self.writer = writer;
        self.reader = reader;

        if let Err(e) = sync_parent_dir(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Directory sync after replace failed");
            self.dir_sync_pending = true;
        }

        Ok(())
    }

    /// Force sync to disk
    ///
    /// Also retries a directory fsync left pending by a replace.
    pub fn sync(&mut self) -> Result<()> {
        self.writer.sync()?;
        if self.dir_sync_pending {
            sync_parent_dir(&self.path)?;
            self.dir_sync_pending = false;
        }
        Ok(())
    }

    /// True if a replace is committed but its directory entry is not yet fsynced
    pub fn dir_sync_pending(&self) -> bool {
        self.dir_sync_pending
    }

    /// Current file size in bytes
    pub fn len(&self) -> u64 {
        self.writer.end_offset()
    }

    /// True if the file holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == HEADER_SIZE
    }

    /// Path of the data file
    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Write a complete replacement file at `temp` and open handles on it
    ///
    /// The handles follow the file through the rename.
    fn stage(temp: &Path, contents: &[u8], sync_strategy: SyncStrategy) -> Result<(LogWriter, LogReader)> {
        let mut out = BufWriter::new(File::create(temp)?);
        out.write_all(&file_header())?;
        out.write_all(contents)?;
        let file = out.into_inner().map_err(|e| ScrollError::Io(e.into_error()))?;
        file.sync_all()?;
        drop(file);

        let writer = LogWriter::open(temp, sync_strategy)?;
        let reader = LogReader::open(temp)?;
        Ok((writer, reader))
    }

    /// Create (or overwrite) `path` holding only the file header
    fn write_fresh(path: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        file.write_all(&file_header())?;
        file.sync_all()?;
        sync_parent_dir(path)
    }
}

/// Side-file path used while replacing `path`
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(OsString::new);
    name.push(TEMP_SUFFIX);
    path.with_file_name(name)
}

/// fsync the directory holding `path` so a rename or create is durable
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        File::open(parent)?.sync_all()?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}
