//! Log Reader
//!
//! Random-access reads for `get` and forward scans for recovery/compaction.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use parking_lot::Mutex;

use crate::error::{Result, ScrollError};

use super::{Record, FRAME_HEADER_SIZE, HEADER_SIZE, MAGIC, VERSION};

/// Check that `reader` starts with a valid file header
fn validate_header<R: Read>(reader: &mut R) -> Result<()> {
    let mut header = [0u8; HEADER_SIZE as usize];
    reader.read_exact(&mut header).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            ScrollError::CorruptLog("data file is shorter than its header".to_string())
        }
        _ => ScrollError::Io(e),
    })?;

    if &header[0..4] != MAGIC {
        return Err(ScrollError::CorruptLog(format!(
            "invalid magic: expected SCRL, got {:?}",
            &header[0..4]
        )));
    }

    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != VERSION {
        return Err(ScrollError::CorruptLog(format!(
            "unsupported data file version: {}",
            version
        )));
    }

    Ok(())
}

// =============================================================================
// Random Access
// =============================================================================

/// Serves `read_at` against its own file handle
///
/// The handle sits behind a mutex because seeking mutates it; the rest of the
/// engine only needs a shared reference to read.
pub struct LogReader {
    file: Mutex<BufReader<File>>,
}

impl LogReader {
    /// Open the data file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        validate_header(&mut file)?;

        Ok(Self {
            file: Mutex::new(BufReader::new(file)),
        })
    }

    /// Read back the record framed at `offset` spanning `length` bytes
    pub fn read_at(&self, offset: u64, length: u64) -> Result<Record> {
        let mut frame = vec![0u8; length as usize];

        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut frame).map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof => ScrollError::CorruptLog(format!(
                    "record at offset {} runs past end of file",
                    offset
                )),
                _ => ScrollError::Io(e),
            })?;
        }

        Record::decode(&frame)
    }
}

// =============================================================================
// Forward Scan
// =============================================================================

/// A record produced by a scan, with its location in the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedRecord {
    /// Byte offset of the frame
    pub offset: u64,
    /// Frame length (header + payload)
    pub length: u64,
    /// The decoded record
    pub record: Record,
}

/// Lazy forward iterator over every record in a data file
///
/// Yields records in file order. On malformed framing it yields exactly one
/// `CorruptLog` error and then stops; `position()` is then the end of the
/// last valid record.
pub struct LogScanner {
    reader: BufReader<File>,
    position: u64,
    file_len: u64,
    done: bool,
}

impl LogScanner {
    /// Open a scan over the data file at `path`, starting at the first record
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_len = file.metadata()?.len();
        validate_header(&mut file)?;

        Ok(Self {
            reader: BufReader::new(file),
            position: HEADER_SIZE,
            file_len,
            done: false,
        })
    }

    /// Offset just past the last record read successfully
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Size of the file when the scan started
    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    fn read_next(&mut self) -> Result<Option<ScannedRecord>> {
        let remaining = self.file_len - self.position;
        if remaining == 0 {
            return Ok(None);
        }

        if remaining < FRAME_HEADER_SIZE as u64 {
            return Err(ScrollError::CorruptLog(format!(
                "torn frame header at offset {}",
                self.position
            )));
        }

        let mut header = [0u8; FRAME_HEADER_SIZE];
        self.reader.read_exact(&mut header)?;
        let (_, payload_len) = Record::parse_header(&header);

        let length = FRAME_HEADER_SIZE as u64 + payload_len as u64;
        if length > remaining {
            return Err(ScrollError::CorruptLog(format!(
                "frame at offset {} claims {} bytes, only {} remain",
                self.position, length, remaining
            )));
        }

        let mut frame = vec![0u8; length as usize];
        frame[..FRAME_HEADER_SIZE].copy_from_slice(&header);
        self.reader.read_exact(&mut frame[FRAME_HEADER_SIZE..])?;

        let record = Record::decode(&frame).map_err(|e| match e {
            ScrollError::CorruptLog(msg) => {
                ScrollError::CorruptLog(format!("offset {}: {}", self.position, msg))
            }
            other => other,
        })?;

        let scanned = ScannedRecord {
            offset: self.position,
            length,
            record,
        };
        self.position += length;

        Ok(Some(scanned))
    }
}

impl Iterator for LogScanner {
    type Item = Result<ScannedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.read_next() {
            Ok(Some(scanned)) => Some(Ok(scanned)),
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
