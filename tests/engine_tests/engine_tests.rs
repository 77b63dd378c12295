//! Tests for Engine
//!
//! These tests verify:
//! - Basic get/set/delete operations
//! - TTL expiry and update semantics
//! - Clear and compaction (including canonical file size)
//! - Crash recovery and reopen
//! - Concurrent access patterns
//! - Engine lifecycle (open/close)

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use scrollkv::config::{Config, SyncStrategy};
use scrollkv::engine::Engine;
use scrollkv::log::HEADER_SIZE;
use scrollkv::ScrollError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const RECORDS: [(&str, &str); 7] = [
    ("hey", "English"),
    ("hi", "English"),
    ("salut", "French"),
    ("bonjour", "French"),
    ("hola", "Spanish"),
    ("oi", "Portuguese"),
    ("mulimuta", "Runyoro"),
];

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = open_in(&temp_dir);
    (temp_dir, engine)
}

fn open_in(temp_dir: &TempDir) -> Engine {
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .sync_strategy(SyncStrategy::EveryWrite) // Sync every write for test reliability
        .build();
    Engine::open(config).unwrap()
}

fn fill(engine: &Engine, records: &[(&str, &str)], ttl: Option<u64>) {
    for (k, v) in records {
        engine.set(k.as_bytes(), v.as_bytes(), ttl).unwrap();
    }
}

fn fill_with_ttl(engine: &Engine, records: &[(&str, &str)], ttl: Duration) {
    for (k, v) in records {
        engine.set_with_ttl(k.as_bytes(), v.as_bytes(), Some(ttl)).unwrap();
    }
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_engine_open_creates_data_file() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("mydb");

    let engine = Engine::open_path(&data_dir, false).unwrap();

    assert!(data_dir.exists());
    assert!(data_dir.join("dump.scdb").exists());
    assert_eq!(engine.file_size(), HEADER_SIZE);
}

#[test]
fn test_engine_set_get() {
    let (_temp, engine) = setup_temp_engine();

    for (k, v) in RECORDS {
        engine.set(k.as_bytes(), v.as_bytes(), None).unwrap();
        assert_eq!(engine.get(k.as_bytes()).unwrap(), Some(v.as_bytes().to_vec()));
    }
}

#[test]
fn test_engine_get_nonexistent_key() {
    let (_temp, engine) = setup_temp_engine();

    assert_eq!(engine.get(b"some-random-value").unwrap(), None);
}

#[test]
fn test_engine_set_existing_key() {
    let (_temp, engine) = setup_temp_engine();

    engine.set(b"foo", b"bar", None).unwrap();
    engine.set(b"foo", b"booo", None).unwrap();

    assert_eq!(engine.get(b"foo").unwrap(), Some(b"booo".to_vec()));
    assert_eq!(engine.key_count(), 1);
}

#[test]
fn test_engine_empty_value() {
    let (_temp, engine) = setup_temp_engine();

    engine.set(b"foo", b"", None).unwrap();

    for _ in 0..3 {
        assert_eq!(engine.get(b"foo").unwrap(), Some(Vec::new()));
    }
}

#[test]
fn test_engine_delete_existing_key() {
    let (_temp, engine) = setup_temp_engine();
    fill(&engine, &RECORDS, None);

    for (k, _) in RECORDS {
        engine.delete(k.as_bytes()).unwrap();
        assert_eq!(engine.get(k.as_bytes()).unwrap(), None);
    }
    assert_eq!(engine.key_count(), 0);
}

#[test]
fn test_engine_delete_nonexistent_key_is_noop() {
    let (_temp, engine) = setup_temp_engine();
    let size_before = engine.file_size();

    engine.delete(b"some-rando-key").unwrap();

    assert_eq!(engine.file_size(), size_before);
}

#[test]
fn test_engine_binary_data() {
    let (_temp, engine) = setup_temp_engine();

    let key = b"\x00\x01\x02\xFF\xFE";
    let value = b"\xFF\x00\xAB\xCD\x00";

    engine.set(key, value, None).unwrap();
    assert_eq!(engine.get(key).unwrap(), Some(value.to_vec()));
}

#[test]
fn test_engine_large_value() {
    let (_temp, engine) = setup_temp_engine();

    let large_value = vec![0xAB; 100_000];
    engine.set(b"large_key", &large_value, None).unwrap();

    assert_eq!(engine.get(b"large_key").unwrap(), Some(large_value));
}

#[test]
fn test_engine_search_disabled() {
    let (_temp, engine) = setup_temp_engine();
    fill(&engine, &RECORDS, None);

    let result = engine.search(b"h", 0, 0);

    assert!(matches!(result, Err(ScrollError::SearchDisabled)));
}

// =============================================================================
// TTL Tests
// =============================================================================

#[test]
fn test_engine_set_with_ttl_seconds() {
    let (_temp, engine) = setup_temp_engine();

    fill(&engine, &RECORDS[..3], None);
    fill(&engine, &RECORDS[3..], Some(1));

    thread::sleep(Duration::from_millis(1200));

    for (k, v) in &RECORDS[..3] {
        assert_eq!(engine.get(k.as_bytes()).unwrap(), Some(v.as_bytes().to_vec()));
    }
    for (k, _) in &RECORDS[3..] {
        assert_eq!(engine.get(k.as_bytes()).unwrap(), None);
    }
}

#[test]
fn test_engine_expired_key_stays_until_compaction() {
    let (_temp, engine) = setup_temp_engine();

    engine
        .set_with_ttl(b"temp", b"v", Some(Duration::from_millis(100)))
        .unwrap();
    thread::sleep(Duration::from_millis(200));

    assert_eq!(engine.get(b"temp").unwrap(), None);
    assert!(engine.entry(b"temp").is_some());

    engine.compact().unwrap();
    assert!(engine.entry(b"temp").is_none());
}

#[test]
fn test_engine_reset_without_ttl_removes_expiry() {
    let (_temp, engine) = setup_temp_engine();

    engine
        .set_with_ttl(b"k", b"first", Some(Duration::from_millis(150)))
        .unwrap();
    engine.set(b"k", b"second", None).unwrap();
    thread::sleep(Duration::from_millis(300));

    assert_eq!(engine.get(b"k").unwrap(), Some(b"second".to_vec()));
    assert_eq!(engine.entry(b"k").unwrap().expiry, None);
}

#[test]
fn test_engine_reset_with_ttl_adds_expiry() {
    let (_temp, engine) = setup_temp_engine();

    engine.set(b"k", b"first", None).unwrap();
    engine
        .set_with_ttl(b"k", b"second", Some(Duration::from_millis(100)))
        .unwrap();
    thread::sleep(Duration::from_millis(200));

    assert_eq!(engine.get(b"k").unwrap(), None);
}

#[test]
fn test_engine_huge_ttl_does_not_wrap() {
    let (_temp, engine) = setup_temp_engine();

    engine.set(b"k", b"v", Some(u64::MAX / 1000 + 1)).unwrap();
    engine.set(b"max", b"v", Some(u64::MAX)).unwrap();
    thread::sleep(Duration::from_millis(500));

    assert_eq!(engine.get(b"k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(engine.get(b"max").unwrap(), Some(b"v".to_vec()));
    assert_eq!(engine.entry(b"k").unwrap().expiry, Some(u64::MAX));
}

// =============================================================================
// Clear Tests
// =============================================================================

#[test]
fn test_engine_clear() {
    let (_temp, engine) = setup_temp_engine();
    fill(&engine, &RECORDS, None);

    engine.clear().unwrap();

    for (k, _) in RECORDS {
        assert_eq!(engine.get(k.as_bytes()).unwrap(), None);
    }
    assert_eq!(engine.file_size(), HEADER_SIZE);
    assert_eq!(engine.key_count(), 0);
}

#[test]
fn test_engine_clear_is_durable() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = open_in(&temp_dir);
        fill(&engine, &RECORDS, None);
        engine.clear().unwrap();
        engine.close().unwrap();
    }

    let engine = open_in(&temp_dir);

    assert_eq!(engine.key_count(), 0);
    assert_eq!(engine.file_size(), HEADER_SIZE);
}

#[test]
fn test_engine_usable_after_clear() {
    let (_temp, engine) = setup_temp_engine();
    fill(&engine, &RECORDS, None);
    engine.clear().unwrap();

    engine.set(b"again", b"yes", None).unwrap();

    assert_eq!(engine.get(b"again").unwrap(), Some(b"yes".to_vec()));
}

// =============================================================================
// Compaction Tests
// =============================================================================

#[test]
fn test_engine_compact_shrinks_file() {
    let (_temp, engine) = setup_temp_engine();

    fill(&engine, &RECORDS[3..], None);
    fill_with_ttl(&engine, &RECORDS[..3], Duration::from_millis(200));
    engine.delete(RECORDS[3].0.as_bytes()).unwrap();
    let pre_compaction_size = engine.file_size();

    thread::sleep(Duration::from_millis(400));
    engine.compact().unwrap();

    assert!(engine.file_size() < pre_compaction_size);
    assert_eq!(engine.file_size(), std::fs::metadata(engine.data_file()).unwrap().len());

    // the expired and the deleted are not available
    for (k, _) in &RECORDS[..4] {
        assert_eq!(engine.get(k.as_bytes()).unwrap(), None);
    }
    // the rest are available
    for (k, v) in &RECORDS[4..] {
        assert_eq!(engine.get(k.as_bytes()).unwrap(), Some(v.as_bytes().to_vec()));
    }
}

#[test]
fn test_engine_compact_is_canonical() {
    let (_temp_a, churned) = setup_temp_engine();
    let (_temp_b, fresh) = setup_temp_engine();

    // churned: target set plus updates, deletes and expired keys
    fill(&churned, &[("hey", "old"), ("hi", "old")], None);
    fill(&churned, &RECORDS, None);
    fill(&churned, &[("extra1", "x"), ("extra2", "y")], None);
    churned.delete(b"extra1").unwrap();
    churned.delete(b"extra2").unwrap();
    fill_with_ttl(&churned, &[("fleeting", "z")], Duration::from_millis(100));
    thread::sleep(Duration::from_millis(200));

    // fresh: exactly the target set
    fill(&fresh, &RECORDS, None);

    churned.compact().unwrap();

    assert_eq!(churned.file_size(), fresh.file_size());
}

#[test]
fn test_engine_compact_back_to_original_set() {
    let (_temp, engine) = setup_temp_engine();
    fill(&engine, &RECORDS, None);
    let original_size = engine.file_size();

    fill(&engine, &[("x", "1"), ("y", "2"), ("z", "3")], None);
    for key in ["x", "y", "z"] {
        engine.delete(key.as_bytes()).unwrap();
    }
    engine.compact().unwrap();

    assert_eq!(engine.file_size(), original_size);
}

#[test]
fn test_engine_compact_preserves_unexpired_ttl() {
    let (_temp, engine) = setup_temp_engine();

    engine
        .set_with_ttl(b"short", b"v", Some(Duration::from_millis(400)))
        .unwrap();
    engine.set(b"filler", b"v", None).unwrap();
    engine.delete(b"filler").unwrap();
    engine.compact().unwrap();

    assert_eq!(engine.get(b"short").unwrap(), Some(b"v".to_vec()));

    thread::sleep(Duration::from_millis(600));
    assert_eq!(engine.get(b"short").unwrap(), None);
}

#[test]
fn test_engine_compact_then_write_and_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = open_in(&temp_dir);
        fill(&engine, &RECORDS, None);
        engine.delete(b"hey").unwrap();
        engine.compact().unwrap();
        engine.set(b"after", b"compaction", None).unwrap();
        engine.close().unwrap();
    }

    let engine = open_in(&temp_dir);

    assert_eq!(engine.get(b"hey").unwrap(), None);
    assert_eq!(engine.get(b"after").unwrap(), Some(b"compaction".to_vec()));
    for (k, v) in &RECORDS[1..] {
        assert_eq!(engine.get(k.as_bytes()).unwrap(), Some(v.as_bytes().to_vec()));
    }
}

#[cfg(unix)]
#[test]
fn test_engine_writes_after_compaction_survive_directory_sync_failure() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().to_path_buf();
    {
        let engine = open_in(&temp_dir);
        fill(&engine, &RECORDS, None);
        engine.delete(b"hey").unwrap();

        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o300)).unwrap();
        let compacted = engine.compact();
        let written = engine.set(b"after", b"compaction", None);
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700)).unwrap();

        compacted.unwrap();
        written.unwrap();
        assert_eq!(engine.get(b"hi").unwrap(), Some(b"English".to_vec()));
        engine.close().unwrap();
    }

    let engine = open_in(&temp_dir);

    assert_eq!(engine.get(b"hey").unwrap(), None);
    assert_eq!(engine.get(b"after").unwrap(), Some(b"compaction".to_vec()));
    assert_eq!(engine.key_count(), RECORDS.len());
}

#[test]
fn test_engine_compact_empty_store() {
    let (_temp, engine) = setup_temp_engine();

    engine.compact().unwrap();

    assert_eq!(engine.file_size(), HEADER_SIZE);
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_engine_reopen_rebuilds_state() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = open_in(&temp_dir);
        fill(&engine, &RECORDS, None);
        engine.set(b"hey", b"Jane", None).unwrap();
        engine.delete(b"oi").unwrap();
        engine.set(b"empty", b"", None).unwrap();
        engine.close().unwrap();
    }

    let engine = open_in(&temp_dir);

    assert_eq!(engine.get(b"hey").unwrap(), Some(b"Jane".to_vec()));
    assert_eq!(engine.get(b"oi").unwrap(), None);
    assert_eq!(engine.get(b"empty").unwrap(), Some(Vec::new()));
    assert_eq!(engine.get(b"hola").unwrap(), Some(b"Spanish".to_vec()));
    assert_eq!(engine.key_count(), RECORDS.len());
    assert_eq!(engine.last_recovery().records_recovered, 10);
}

#[test]
fn test_engine_reopen_keeps_ttl() {
    let temp_dir = TempDir::new().unwrap();
    {
        let engine = open_in(&temp_dir);
        engine
            .set_with_ttl(b"temp", b"v", Some(Duration::from_millis(150)))
            .unwrap();
        engine.set(b"keep", b"v", None).unwrap();
    }

    thread::sleep(Duration::from_millis(300));
    let engine = open_in(&temp_dir);

    assert_eq!(engine.get(b"temp").unwrap(), None);
    assert_eq!(engine.get(b"keep").unwrap(), Some(b"v".to_vec()));
}

#[test]
fn test_engine_recovers_from_torn_tail() {
    let temp_dir = TempDir::new().unwrap();
    let data_file = {
        let engine = open_in(&temp_dir);
        fill(&engine, &RECORDS, None);
        engine.data_file().to_path_buf()
    };

    let clean_size = std::fs::metadata(&data_file).unwrap().len();
    let mut bytes = std::fs::read(&data_file).unwrap();
    bytes.extend_from_slice(&[0x7F; 11]);
    std::fs::write(&data_file, &bytes).unwrap();

    let engine = open_in(&temp_dir);

    assert!(engine.last_recovery().was_truncated);
    assert_eq!(engine.file_size(), clean_size);
    for (k, v) in RECORDS {
        assert_eq!(engine.get(k.as_bytes()).unwrap(), Some(v.as_bytes().to_vec()));
    }
}

// =============================================================================
// Lifecycle / Config Tests
// =============================================================================

#[test]
fn test_engine_invalid_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .sync_strategy(SyncStrategy::EveryNEntries { count: 0 })
        .build();

    let result = Engine::open(config);

    assert!(matches!(result, Err(ScrollError::Config(_))));
}

#[test]
fn test_engine_accessors() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().to_path_buf();

    let config = Config::builder()
        .data_dir(&data_dir)
        .search_enabled(true)
        .build();
    let engine = Engine::open(config).unwrap();

    assert_eq!(engine.data_dir(), data_dir);
    assert_eq!(engine.data_file(), data_dir.join("dump.scdb"));
    assert!(engine.search_enabled());
    assert_eq!(engine.key_count(), 0);
    assert_eq!(
        engine.config().sync_strategy,
        SyncStrategy::EveryNEntries { count: 100 }
    );
}

// =============================================================================
// Concurrent Access Tests
// =============================================================================

#[test]
fn test_engine_concurrent_reads() {
    let (_temp, engine) = setup_temp_engine();
    let engine = Arc::new(engine);

    for i in 0..100 {
        engine
            .set(format!("key{}", i).as_bytes(), format!("value{}", i).as_bytes(), None)
            .unwrap();
    }

    let mut handles = vec![];
    for _ in 0..4 {
        let engine_clone = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for i in 0..100 {
                let key = format!("key{}", i);
                let expected = format!("value{}", i);
                let result = engine_clone.get(key.as_bytes()).unwrap();
                assert_eq!(result, Some(expected.into_bytes()));
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_engine_concurrent_writes() {
    let (_temp, engine) = setup_temp_engine();
    let engine = Arc::new(engine);

    let mut handles = vec![];
    for t in 0..4 {
        let engine_clone = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for i in 0..25 {
                let key = format!("thread{}_key{}", t, i);
                let value = format!("thread{}_value{}", t, i);
                engine_clone.set(key.as_bytes(), value.as_bytes(), None).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    for t in 0..4 {
        for i in 0..25 {
            let key = format!("thread{}_key{}", t, i);
            let expected = format!("thread{}_value{}", t, i);
            assert_eq!(engine.get(key.as_bytes()).unwrap(), Some(expected.into_bytes()));
        }
    }
}

#[test]
fn test_engine_reads_during_compaction() {
    let (_temp, engine) = setup_temp_engine();
    let engine = Arc::new(engine);

    for i in 0..200 {
        engine
            .set(format!("key{}", i).as_bytes(), format!("value{}", i).as_bytes(), None)
            .unwrap();
    }
    for i in (0..200).step_by(2) {
        engine.delete(format!("key{}", i).as_bytes()).unwrap();
    }

    let reader = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for _ in 0..20 {
                for i in (1..200).step_by(2) {
                    let expected = format!("value{}", i).into_bytes();
                    let key = format!("key{}", i);
                    assert_eq!(engine.get(key.as_bytes()).unwrap(), Some(expected));
                }
            }
        })
    };

    for _ in 0..5 {
        engine.compact().unwrap();
    }

    reader.join().unwrap();
}
