//! Engine Module
//!
//! The core storage engine that coordinates all components.
//!
//! ## Responsibilities
//! - Coordinate the log, key directory and search index
//! - Handle concurrent read/write access
//! - Enforce TTL lazily on read
//! - Rebuild in-memory state from the log on startup
//! - Reclaim dead bytes on `compact`

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, ScrollError};
use crate::keydir::{KeyDir, KeyDirEntry};
use crate::log::{LogRecovery, LogStore, Record, RecoveryResult, DATA_FILENAME, HEADER_SIZE};
use crate::search::SearchIndex;

/// Current time as unix millis
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Everything a mutation must change together
struct EngineState {
    /// Append-only data file (sole durable state)
    log: LogStore,

    /// Latest record location per key
    keydir: KeyDir,

    /// Prefix index, present only when search is enabled
    search: Option<SearchIndex>,
}

impl EngineState {
    /// Value of a key if it is present and not expired at `now`
    fn read_live(&self, key: &[u8], now: u64) -> Result<Option<Vec<u8>>> {
        match self.keydir.lookup(key) {
            Some(entry) if !entry.is_expired(now) => {
                let record = self.log.read_at(entry.offset, entry.length)?;
                Ok(Some(record.value))
            }
            _ => Ok(None),
        }
    }
}

/// The main storage engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (set/delete/clear/compact): hold the state write lock for the
///   whole operation, so a reader sees either the state before a mutation
///   or after it, never in between
///
/// - **Reads** (get/search): share the read lock and run concurrently; the
///   log's read handle has its own mutex because seeking mutates it
///
/// No background threads: expiry is checked on read and reclaimed by
/// `compact`.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Path of the data file
    data_file: PathBuf,

    /// Log + directory + index, serialized as one unit
    state: RwLock<EngineState>,

    /// Stats from the recovery scan at open
    recovery: RecoveryResult,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Validate config and create the data directory
    /// 2. Open/create the data file
    /// 3. Replay the log into the key directory (and search index)
    /// 4. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Create data directory if it doesn't exist
        fs::create_dir_all(&config.data_dir)?;
        let data_file = config.data_dir.join(DATA_FILENAME);

        // Step 2: Open the log
        let mut log = LogStore::open(&data_file, config.sync_strategy)?;

        // Step 3: Rebuild directory and index from a single forward scan
        let mut keydir = KeyDir::new();
        let mut search = config.search_enabled.then(SearchIndex::new);

        let recovery = LogRecovery::recover(&mut log, |scanned| {
            let applied = keydir.apply(&scanned);
            if let Some(index) = search.as_mut() {
                let key = &scanned.record.key;
                match applied {
                    Some(entry) => index.insert(key, entry.seq),
                    None => index.remove(key),
                };
            }
        })?;

        info!(
            path = %data_file.display(),
            records = recovery.records_recovered,
            keys = keydir.len(),
            truncated = recovery.was_truncated,
            search = config.search_enabled,
            "Store opened"
        );

        Ok(Self {
            config,
            data_file,
            state: RwLock::new(EngineState {
                log,
                keydir,
                search,
            }),
            recovery,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path, search_enabled: bool) -> Result<Self> {
        let config = Config::builder()
            .data_dir(path)
            .search_enabled(search_enabled)
            .build();
        Self::open(config)
    }

    /// Get a value by key
    ///
    /// Returns `None` for a key that was never set, was deleted, or whose
    /// TTL has passed. Expired keys stay in the directory until `compact`.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let state = self.state.read();
        state.read_live(key, now_millis())
    }

    /// Set a key-value pair, optionally expiring after `ttl` seconds
    ///
    /// Replaces any previous value and expiry of the key.
    pub fn set(&self, key: &[u8], value: &[u8], ttl: Option<u64>) -> Result<()> {
        self.set_with_ttl(key, value, ttl.map(Duration::from_secs))
    }

    /// Set a key-value pair with a TTL of arbitrary precision
    pub fn set_with_ttl(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let expiry = ttl.map(|ttl| {
            let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
            now_millis().saturating_add(millis)
        });
        let record = Record::put(key, value, expiry);

        let mut state = self.state.write();

        // Step 1: Append first (durability); nothing in memory changes on failure
        let (offset, length) = state.log.append(&record)?;

        // Step 2: Point the directory at the new record
        let entry = state.keydir.upsert(key, offset, length, expiry);

        // Step 3: Index the key (no-op if already indexed)
        if let Some(index) = state.search.as_mut() {
            index.insert(key, entry.seq);
        }

        Ok(())
    }

    /// Delete a key
    ///
    /// Deleting a key that is not present does nothing.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let mut state = self.state.write();

        if state.keydir.lookup(key).is_none() {
            return Ok(());
        }

        // Step 1: Write tombstone to the log
        state.log.append(&Record::tombstone(key))?;

        // Step 2: Drop from directory and index
        state.keydir.remove(key);
        if let Some(index) = state.search.as_mut() {
            index.remove(key);
        }

        Ok(())
    }

    /// Remove every key
    ///
    /// The data file is atomically replaced by an empty one, so a reopened
    /// store is empty too.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.state.write();

        state.log.truncate_and_replace(&[])?;
        state.keydir.clear();
        if let Some(index) = state.search.as_mut() {
            index.clear();
        }

        debug!(path = %self.data_file.display(), "Store cleared");
        Ok(())
    }

    /// Rewrite the log to hold only live records
    ///
    /// Steps:
    /// 1. Encode every live record, in first-insertion order, into a new image
    /// 2. Atomically swap the image in
    /// 3. Remap directory entries by key; drop expired keys everywhere
    ///
    /// The result depends only on the live set, so it matches a fresh store
    /// filled with the same keys, values and TTLs byte for byte in size.
    pub fn compact(&self) -> Result<()> {
        let mut state = self.state.write();
        let now = now_millis();
        let size_before = state.log.len();

        let mut image = Vec::new();
        let mut placements: Vec<(Vec<u8>, u64, u64)> = Vec::new();
        let mut expired: Vec<Vec<u8>> = Vec::new();

        for (key, entry) in state.keydir.entries_by_seq() {
            if entry.is_expired(now) {
                expired.push(key.to_vec());
                continue;
            }

            let record = state.log.read_at(entry.offset, entry.length)?;
            let frame = record.encode()?;
            let offset = HEADER_SIZE + image.len() as u64;
            placements.push((key.to_vec(), offset, frame.len() as u64));
            image.extend_from_slice(&frame);
        }

        state.log.truncate_and_replace(&image)?;

        for (key, offset, length) in &placements {
            state.keydir.remap(key, *offset, *length);
        }
        for key in &expired {
            state.keydir.remove(key);
            if let Some(index) = state.search.as_mut() {
                index.remove(key);
            }
        }

        info!(
            path = %self.data_file.display(),
            live = placements.len(),
            expired = expired.len(),
            size_before,
            size_after = state.log.len(),
            "Compaction finished"
        );

        Ok(())
    }

    /// Search for live keys starting with `term`
    ///
    /// Matches come in the order the keys were first inserted. `skip` matches
    /// are dropped first; `limit == 0` means no limit. Expired keys never
    /// count towards `skip` or `limit`.
    pub fn search(&self, term: &[u8], skip: usize, limit: usize) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let state = self.state.read();
        let index = state.search.as_ref().ok_or(ScrollError::SearchDisabled)?;
        let now = now_millis();
        let limit = if limit == 0 { usize::MAX } else { limit };

        let live = index.prefix_query(term).filter_map(|key| {
            state
                .keydir
                .lookup(key)
                .filter(|entry| !entry.is_expired(now))
                .map(|entry| (key, *entry))
        });

        let mut results = Vec::new();
        for (key, entry) in live.skip(skip).take(limit) {
            let record = state.log.read_at(entry.offset, entry.length)?;
            results.push((key.to_vec(), record.value));
        }

        Ok(results)
    }

    /// Close the engine gracefully
    ///
    /// Syncs the data file to disk
    pub fn close(self) -> Result<()> {
        let mut state = self.state.write();
        state.log.sync()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the data file path
    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    /// Current size of the data file in bytes
    pub fn file_size(&self) -> u64 {
        self.state.read().log.len()
    }

    /// Keys in the directory, including expired ones not yet compacted
    pub fn key_count(&self) -> usize {
        self.state.read().keydir.len()
    }

    /// Directory entry for a key, expired or not
    pub fn entry(&self, key: &[u8]) -> Option<KeyDirEntry> {
        self.state.read().keydir.lookup(key).copied()
    }

    /// Whether the search index is maintained
    pub fn search_enabled(&self) -> bool {
        self.config.search_enabled
    }

    /// Stats from the recovery scan performed at open
    pub fn last_recovery(&self) -> &RecoveryResult {
        &self.recovery
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
