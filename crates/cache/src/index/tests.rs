use super::*;
use crate::storage::{CacheStore, DiskBackend};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn record(key: &str, size: u64, last_access: u64) -> CacheRecord {
    CacheRecord {
        key: CacheKey::new(key).unwrap(),
        kind: ArtifactKind::Texture,
        size,
        freshness: FreshnessToken::new("mtime:1"),
        last_access,
    }
}

#[test]
fn test_aggregate_size_tracks_insert_replace_remove() {
    let mut index = CacheIndex::new();

    index.insert(record("aa01", 100, 1));
    index.insert(record("bb02", 50, 2));
    assert_eq!(index.total_size(), 150);

    // Replacement swaps the old size for the new one
    let replaced = index.insert(record("aa01", 30, 3));
    assert_eq!(replaced.map(|r| r.size), Some(100));
    assert_eq!(index.total_size(), 80);
    assert_eq!(index.len(), 2);

    index.remove(&CacheKey::new("bb02").unwrap());
    assert_eq!(index.total_size(), 30);
    assert!(index.remove(&CacheKey::new("bb02").unwrap()).is_none());
    assert_eq!(index.total_size(), 30);
}

#[test]
fn test_stale_since_keeps_first_mark() {
    let mut index = CacheIndex::new();
    assert!(!index.is_stale());

    let first = Instant::now();
    assert!(index.mark_stale(first));
    assert!(!index.mark_stale(first + Duration::from_secs(5)));
    assert!(!index.mark_stale(first + Duration::from_secs(10)));
    assert_eq!(index.stale_since(), Some(first));

    index.mark_flushed();
    assert_eq!(index.stale_since(), None);

    let second = first + Duration::from_secs(20);
    assert!(index.mark_stale(second));
    assert_eq!(index.stale_since(), Some(second));
}

#[test]
fn test_access_stamps_strictly_increase() {
    let mut index = CacheIndex::new();
    let far_future = u64::MAX / 2;
    index.insert(record("aa01", 1, far_future));

    let a = index.next_access_stamp();
    let b = index.next_access_stamp();
    assert_eq!(a, far_future + 1);
    assert_eq!(b, far_future + 2);

    let touched = index.touch(&CacheKey::new("aa01").unwrap()).unwrap();
    assert!(touched > b);
    assert!(index.touch(&CacheKey::new("zz99").unwrap()).is_none());
}

#[test]
fn test_access_stamp_at_max_does_not_overflow() {
    let mut index = CacheIndex::new();
    index.insert(record("aa01", 1, u64::MAX));

    assert_eq!(index.next_access_stamp(), u64::MAX);
    assert_eq!(index.touch(&CacheKey::new("aa01").unwrap()), Some(u64::MAX));
}

#[test]
fn test_future_stamps_clamped_on_load_and_merge() {
    let before = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64;

    let mut index =
        CacheIndex::from_records(vec![record("aa01", 1, u64::MAX), record("bb02", 1, 5)]);
    let adopted = index.merge_foreign(vec![record("cc03", 1, u64::MAX)], |_| true);
    assert_eq!(adopted, 1);

    for key in ["aa01", "cc03"] {
        let stamp = index.get(&CacheKey::new(key).unwrap()).unwrap().last_access;
        assert!(stamp >= before && stamp < u64::MAX);
    }
    assert_eq!(index.get(&CacheKey::new("bb02").unwrap()).unwrap().last_access, 5);

    // Clamped records age out like any other
    let fresh = index.next_access_stamp();
    assert!(fresh > index.get(&CacheKey::new("cc03").unwrap()).unwrap().last_access);
}

#[test]
fn test_snapshot_orders_oldest_first_ties_by_key() {
    let index = CacheIndex::from_records(vec![
        record("cc03", 1, 20),
        record("bb02", 1, 10),
        record("aa01", 1, 10),
    ]);

    let keys: Vec<_> = index
        .snapshot()
        .into_iter()
        .map(|r| r.key.to_string())
        .collect();
    assert_eq!(keys, vec!["aa01", "bb02", "cc03"]);
}

#[test]
fn test_from_records_keeps_latest_duplicate() {
    let index = CacheIndex::from_records(vec![
        record("aa01", 10, 5),
        record("aa01", 20, 9),
        record("aa01", 30, 7),
    ]);

    assert_eq!(index.len(), 1);
    assert_eq!(index.total_size(), 20);
    assert!(!index.is_stale());
}

#[test]
fn test_merge_foreign_respects_local_removals() {
    let mut index = CacheIndex::new();
    index.insert(record("aa01", 10, 1));
    index.insert(record("bb02", 10, 2));
    index.remove(&CacheKey::new("bb02").unwrap());

    let foreign = vec![
        record("aa01", 999, 50),
        record("bb02", 10, 51),
        record("cc03", 40, 52),
        record("dd04", 40, 53),
    ];

    // dd04's artifact is gone on disk
    let adopted = index.merge_foreign(foreign, |r| r.key.as_str() != "dd04");

    assert_eq!(adopted, 1);
    assert!(index.contains(&CacheKey::new("cc03").unwrap()));
    assert!(!index.contains(&CacheKey::new("bb02").unwrap()));
    assert_eq!(index.get(&CacheKey::new("aa01").unwrap()).unwrap().size, 10);
    assert_eq!(index.total_size(), 50);
}

#[test]
fn test_persist_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let store = CacheStore::new(temp_dir.path().to_path_buf(), Arc::new(DiskBackend));

    let mut index = CacheIndex::new();
    index.insert(record("aa01", 10, 1));
    index.insert(record("bb02", 20, 2));
    write_index(&store, &index).unwrap();

    let loaded = load_index(&store);
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.total_size(), 30);
    assert_eq!(loaded.snapshot(), index.snapshot());
    assert!(!loaded.is_stale());
}

#[test]
fn test_missing_or_corrupt_index_starts_cold() {
    let temp_dir = TempDir::new().unwrap();
    let store = CacheStore::new(temp_dir.path().to_path_buf(), Arc::new(DiskBackend));

    assert!(load_index(&store).is_empty());
    assert!(read_index_records(&store).unwrap().is_none());

    std::fs::write(store.index_path(), b"definitely not an index").unwrap();
    assert!(read_index_records(&store).is_err());
    assert!(load_index(&store).is_empty());
}
