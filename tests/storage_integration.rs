//! File tier and persistent stores through the public API.

mod common;

use std::collections::HashSet;
use std::time::Duration;

use common::fixtures::{SAMPLE_KEY, SAMPLE_TRANSCRIPT};
use retrieval::storage::FileRecord;
use retrieval::{FileTier, PersistentStore, SqliteStore, hash_key, key_file_stem};
use rkyv::rancor::Error;
use rkyv::to_bytes;
use tempfile::TempDir;

fn record(key: &str, payload: &str) -> FileRecord {
    FileRecord {
        key: key.to_string(),
        created_at: 1_702_512_000_000,
        payload: payload.as_bytes().to_vec(),
    }
}

#[test]
fn test_file_stem_is_filesystem_safe() {
    let keys = [
        SAMPLE_KEY,
        "../../etc/passwd",
        "with spaces and ünïcödé",
        "C:\\windows\\path",
        "",
    ];

    for key in keys {
        let stem = key_file_stem(key);
        assert_eq!(stem.len(), 64, "stem for {key:?}");
        assert!(stem.bytes().all(|b| b.is_ascii_hexdigit()), "stem for {key:?}");
    }
}

#[test]
fn test_key_hashes_are_unique() {
    let keys = ["video-1", "video-2", "VIDEO-1", "video-1 ", "video-1\n"];

    let hashes: HashSet<_> = keys.iter().map(|k| hash_key(k)).collect();

    assert_eq!(hashes.len(), keys.len());
}

#[test]
fn test_file_tier_store_and_load() {
    let dir = TempDir::new().expect("temp dir");
    let tier = FileTier::new(dir.path().to_path_buf(), Duration::from_secs(3_600));

    tier.store(&record(SAMPLE_KEY, SAMPLE_TRANSCRIPT)).expect("store");

    let loaded = tier.load(SAMPLE_KEY).expect("load").expect("present");
    assert_eq!(loaded, record(SAMPLE_KEY, SAMPLE_TRANSCRIPT));
    assert_eq!(
        tier.entry_path(SAMPLE_KEY).file_name().and_then(|n| n.to_str()),
        Some(format!("{}.rkyv", key_file_stem(SAMPLE_KEY)).as_str())
    );
}

#[test]
fn test_foreign_record_under_key_path_is_a_miss() {
    let dir = TempDir::new().expect("temp dir");
    let tier = FileTier::new(dir.path().to_path_buf(), Duration::from_secs(3_600));

    let bytes = to_bytes::<Error>(&record("someone-else", "payload")).expect("serialize");
    std::fs::write(tier.entry_path(SAMPLE_KEY), &bytes).expect("plant file");

    assert!(tier.load(SAMPLE_KEY).expect("load").is_none());
}

#[test]
fn test_corrupt_file_is_an_error() {
    let dir = TempDir::new().expect("temp dir");
    let tier = FileTier::new(dir.path().to_path_buf(), Duration::from_secs(3_600));

    std::fs::write(tier.entry_path(SAMPLE_KEY), b"not rkyv at all").expect("plant file");

    assert!(tier.load(SAMPLE_KEY).is_err());
}

#[test]
fn test_no_temp_files_left_behind() {
    let dir = TempDir::new().expect("temp dir");
    let tier = FileTier::new(dir.path().to_path_buf(), Duration::from_secs(3_600));

    for i in 0..5 {
        tier.store(&record(&format!("k{i}"), "v")).expect("store");
    }

    let leftovers = std::fs::read_dir(dir.path())
        .expect("read dir")
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_sqlite_store_binary_values() {
    let dir = TempDir::new().expect("temp dir");
    let store = SqliteStore::open(dir.path().join("entries.db")).expect("open");
    let blob: Vec<u8> = (0..=255).collect();

    store.set_by_key("blob", &blob).await.expect("set");

    assert_eq!(store.get_by_key("blob").await.expect("get"), Some(blob));
}
