//! Key Directory implementation
//!
//! HashMap-based directory, rebuilt from the log on open.

use std::collections::HashMap;

use crate::log::ScannedRecord;

use super::KeyDirEntry;

/// Map from key to its latest record location
#[derive(Debug, Default)]
pub struct KeyDir {
    entries: HashMap<Vec<u8>, KeyDirEntry>,
    /// Next sequence number handed to a key that is not present
    next_seq: u64,
}

impl KeyDir {
    /// Create a new empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a directory by replaying a log scan in file order
    pub fn rebuild_from<I>(scan: I) -> Self
    where
        I: IntoIterator<Item = ScannedRecord>,
    {
        let mut keydir = Self::new();
        for scanned in scan {
            keydir.apply(&scanned);
        }
        keydir
    }

    /// Replay one scanned record
    ///
    /// A tombstone removes the key; anything else upserts it, whether or
    /// not its expiry has already passed. Returns the entry now in place.
    pub fn apply(&mut self, scanned: &ScannedRecord) -> Option<KeyDirEntry> {
        let record = &scanned.record;
        if record.tombstone {
            self.remove(&record.key);
            None
        } else {
            Some(self.upsert(&record.key, scanned.offset, scanned.length, record.expiry))
        }
    }

    /// Look up the entry for a key
    pub fn lookup(&self, key: &[u8]) -> Option<&KeyDirEntry> {
        self.entries.get(key)
    }

    /// Point `key` at a new record
    ///
    /// A key already present keeps its sequence number; a new key gets the
    /// next one.
    pub fn upsert(&mut self, key: &[u8], offset: u64, length: u64, expiry: Option<u64>) -> KeyDirEntry {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.offset = offset;
            entry.length = length;
            entry.expiry = expiry;
            return *entry;
        }

        let entry = KeyDirEntry {
            offset,
            length,
            expiry,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.entries.insert(key.to_vec(), entry);
        entry
    }

    /// Move a key's record without touching its expiry or sequence number
    ///
    /// Returns false if the key is not present.
    pub fn remap(&mut self, key: &[u8], offset: u64, length: u64) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.offset = offset;
                entry.length = length;
                true
            }
            None => false,
        }
    }

    /// Remove a key
    pub fn remove(&mut self, key: &[u8]) -> Option<KeyDirEntry> {
        self.entries.remove(key)
    }

    /// All entries, ordered by first-insertion sequence number
    pub fn entries_by_seq(&self) -> Vec<(&[u8], KeyDirEntry)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.as_slice(), *entry))
            .collect();
        entries.sort_by_key(|(_, entry)| entry.seq);
        entries
    }

    /// Number of keys present (including expired-but-not-compacted ones)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no keys are present
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
