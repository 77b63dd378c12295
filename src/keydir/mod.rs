//! Key Directory Module
//!
//! In-memory map from each key to the location of its latest record.
//!
//! ## Responsibilities
//! - O(1) lookup of where a key's current record lives
//! - Rebuild from a forward scan of the log (last write wins)
//! - Lazy TTL checks (expiry is never acted on at rebuild time)
//! - First-insertion sequence numbers for stable ordering
//!
//! ## Data Structure Choice
//! A `HashMap` with no internal locking: the engine serializes every
//! mutation behind its own lock, so the directory is plain owned state.

mod table;

pub use table::KeyDir;

/// Location and expiry of a key's most recent record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDirEntry {
    /// Byte offset of the record frame in the data file
    pub offset: u64,

    /// Length of the record frame
    pub length: u64,

    /// Absolute expiry as unix millis
    pub expiry: Option<u64>,

    /// Order in which the key was first inserted; kept across updates
    pub seq: u64,
}

impl KeyDirEntry {
    /// `expiry` is set and `now >= expiry`
    pub fn is_expired(&self, now_millis: u64) -> bool {
        matches!(self.expiry, Some(expiry) if now_millis >= expiry)
    }
}
