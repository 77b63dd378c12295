//! Log Store Module
//!
//! The append-only data file that is the sole durable state of a store.
//!
//! ## Responsibilities
//! - Append records and hand back their offsets
//! - Random-access read-back of a record for `get`
//! - Forward scans for recovery and compaction
//! - CRC32 checksums for corruption detection
//! - Atomic whole-file replacement (temp file, fsync, rename)
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Header: Magic "SCRL" (4) | Version (2)  │
//! ├─────────────────────────────────────────┤
//! │ Record 1                                │
//! │ ┌─────────┬─────────┬─────────────────┐ │
//! │ │ CRC (4) │ Len (4) │ Payload         │ │
//! │ └─────────┴─────────┴─────────────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Record 2                                │
//! │ ┌─────────┬─────────┬─────────────────┐ │
//! │ │ CRC (4) │ Len (4) │ Payload         │ │
//! │ └─────────┴─────────┴─────────────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The payload is the bincode encoding of a [`Record`]. An empty store is
//! exactly the header.

mod reader;
mod record;
mod recovery;
mod store;
mod writer;

pub use reader::{LogReader, LogScanner, ScannedRecord};
pub use record::Record;
pub use recovery::{LogRecovery, RecoveryResult};
pub use store::LogStore;
pub use writer::LogWriter;

// =============================================================================
// Shared Constants (used by writer, reader, recovery)
// =============================================================================

/// Magic bytes identifying a scrollkv data file
pub const MAGIC: &[u8; 4] = b"SCRL";

/// Current data file format version
pub const VERSION: u16 = 1;

/// File header size: Magic (4) + Version (2) = 6 bytes
pub const HEADER_SIZE: u64 = 6;

/// Frame header size: CRC (4) + PayloadLen (4) = 8 bytes
pub const FRAME_HEADER_SIZE: usize = 8;

/// Name of the data file inside the store directory
pub const DATA_FILENAME: &str = "dump.scdb";

/// Suffix of the side file a replacement is written to before the swap
pub const TEMP_SUFFIX: &str = ".tmp";

/// The bytes of a pristine, empty data file
pub(crate) fn file_header() -> [u8; HEADER_SIZE as usize] {
    let mut header = [0u8; HEADER_SIZE as usize];
    header[..4].copy_from_slice(MAGIC);
    header[4..].copy_from_slice(&VERSION.to_le_bytes());
    header
}
