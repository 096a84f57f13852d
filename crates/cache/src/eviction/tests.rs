//! Tests for eviction policies

use super::*;
use crate::freshness::FreshnessToken;
use crate::index::CacheRecord;
use crate::keys::ArtifactKind;
use crate::test_support::FaultyBackend;
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    _temp_dir: TempDir,
    backend: Arc<FaultyBackend>,
    store: CacheStore,
    index: CacheIndex,
}

/// Index plus real artifact files, one per `(key, size, last_access)`
fn fixture(entries: &[(&str, u64, u64)]) -> Fixture {
    let temp_dir = TempDir::new().unwrap();
    let backend = Arc::new(FaultyBackend::new());
    let store = CacheStore::new(temp_dir.path().to_path_buf(), backend.clone());
    let mut index = CacheIndex::new();

    for (key, size, last_access) in entries {
        let record = CacheRecord {
            key: CacheKey::new(*key).unwrap(),
            kind: ArtifactKind::Model,
            size: *size,
            freshness: FreshnessToken::new("t"),
            last_access: *last_access,
        };
        store
            .write_artifact(&record.location(), &vec![0u8; *size as usize])
            .unwrap();
        index.insert(record);
    }

    Fixture {
        _temp_dir: temp_dir,
        backend,
        store,
        index,
    }
}

fn keys(report: &[CacheKey]) -> Vec<&str> {
    report.iter().map(|k| k.as_str()).collect()
}

#[test]
fn test_lru_candidates_order() {
    let f = fixture(&[("cc03", 1, 30), ("aa01", 1, 10), ("bb02", 1, 10), ("dd04", 1, 5)]);

    let order = LruPolicy.candidates(&f.index, &|_| false);
    assert_eq!(keys(&order), vec!["dd04", "aa01", "bb02", "cc03"]);

    let order = LruPolicy.candidates(&f.index, &|k| k.as_str() == "dd04");
    assert_eq!(keys(&order), vec!["aa01", "bb02", "cc03"]);
}

#[test]
fn test_evicts_oldest_until_within_limit() {
    let mut f = fixture(&[("aa01", 400, 1), ("bb02", 400, 2), ("cc03", 400, 3)]);

    let report = evict_to_limit(&mut f.index, &f.store, &LruPolicy, 1000, &|_| false);

    assert_eq!(keys(&report.evicted), vec!["aa01"]);
    assert_eq!(report.freed_bytes, 400);
    assert_eq!(f.index.total_size(), 800);

    let gone = CacheRecord {
        key: CacheKey::new("aa01").unwrap(),
        kind: ArtifactKind::Model,
        size: 400,
        freshness: FreshnessToken::new("t"),
        last_access: 1,
    };
    assert_eq!(f.store.artifact_size(&gone.location()).unwrap(), None);
}

#[test]
fn test_within_limit_is_noop() {
    let mut f = fixture(&[("aa01", 10, 1)]);
    let report = evict_to_limit(&mut f.index, &f.store, &LruPolicy, 10, &|_| false);
    assert!(report.is_empty());
    assert_eq!(f.index.len(), 1);
}

#[test]
fn test_excluded_keys_survive() {
    let mut f = fixture(&[("aa01", 600, 1), ("bb02", 600, 2)]);
    let in_flight: HashSet<CacheKey> = [CacheKey::new("aa01").unwrap()].into();

    let report = evict_to_limit(&mut f.index, &f.store, &LruPolicy, 700, &|k| {
        in_flight.contains(k)
    });

    assert_eq!(keys(&report.evicted), vec!["bb02"]);
    assert!(f.index.contains(&CacheKey::new("aa01").unwrap()));
    assert_eq!(f.index.total_size(), 600);
}

#[test]
fn test_failed_delete_is_skipped_and_still_counted() {
    let mut f = fixture(&[("aa01", 300, 1), ("bb02", 300, 2), ("cc03", 300, 3)]);
    f.backend.deny_remove_of("aa01");

    let report = evict_to_limit(&mut f.index, &f.store, &LruPolicy, 600, &|_| false);

    assert_eq!(keys(&report.failed), vec!["aa01"]);
    assert_eq!(keys(&report.evicted), vec!["bb02"]);
    assert!(f.index.contains(&CacheKey::new("aa01").unwrap()));
    assert_eq!(f.index.total_size(), 600);

    // Once the file is free again a later pass reclaims it
    f.backend.allow_removes();
    let report = evict_to_limit(&mut f.index, &f.store, &LruPolicy, 300, &|_| false);
    assert_eq!(keys(&report.evicted), vec!["aa01"]);
    assert_eq!(f.index.total_size(), 300);
}

#[test]
fn test_missing_artifact_counts_as_deleted() {
    let mut f = fixture(&[("aa01", 500, 1), ("bb02", 500, 2)]);
    let location = f.index.get(&CacheKey::new("aa01").unwrap()).unwrap().location();
    std::fs::remove_file(f.store.absolute(&location)).unwrap();

    let report = evict_to_limit(&mut f.index, &f.store, &LruPolicy, 500, &|_| false);
    assert_eq!(keys(&report.evicted), vec!["aa01"]);
    assert_eq!(f.index.total_size(), 500);
}
