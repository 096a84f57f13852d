//! Several managers sharing one cache root, as separate processes would

mod common;

use artifact_cache::ArtifactKind;
use common::{manager_at, Sources, KB};
use tempfile::TempDir;

#[test]
fn test_flush_adopts_records_from_other_writers() {
    let root = TempDir::new().unwrap();
    let sources = Sources::new();
    let first = manager_at(root.path(), 1024);
    let second = manager_at(root.path(), 1024);

    let a = sources.add("a.obj", ArtifactKind::Model);
    let b = sources.add("b.obj", ArtifactKind::Model);

    first.store(&a, &vec![0u8; 2 * KB]);
    assert!(first.flush_index());

    second.store(&b, &vec![0u8; 3 * KB]);
    assert!(second.flush_index());
    assert_eq!(second.entry_count(), 2);
    assert!(second.lookup(&a).is_hit());

    first.mark_index_stale();
    assert!(first.flush_index());
    assert_eq!(first.entry_count(), 2);
    assert_eq!(first.total_size_bytes(), 5 * KB as u64);
}

#[test]
fn test_local_removals_are_not_readopted() {
    let root = TempDir::new().unwrap();
    let sources = Sources::new();
    let manager = manager_at(root.path(), 1024);

    let a = sources.add("a.png", ArtifactKind::Texture);
    manager.store(&a, b"texels");
    assert!(manager.flush_index());

    assert!(manager.invalidate(&a));
    assert!(manager.flush_index());
    assert_eq!(manager.entry_count(), 0);
    assert_eq!(manager_at(root.path(), 1024).entry_count(), 0);
}

#[test]
fn test_unflushed_foreign_writes_corrected_after_merge() {
    let root = TempDir::new().unwrap();
    let sources = Sources::new();
    let first = manager_at(root.path(), 10);
    let second = manager_at(root.path(), 10);

    first.store(&sources.add("a.ktx", ArtifactKind::CompressedTexture), &vec![0u8; 8 * KB]);
    second.store(&sources.add("b.ktx", ArtifactKind::CompressedTexture), &vec![0u8; 8 * KB]);

    // Each manager alone is within its limit; the shared root is not
    assert_eq!(first.total_size_bytes(), 8 * KB as u64);
    assert_eq!(second.total_size_bytes(), 8 * KB as u64);

    assert!(second.flush_index());
    assert!(first.flush_index());
    assert_eq!(first.total_size_bytes(), 16 * KB as u64);

    let report = first.check_eviction();
    assert_eq!(report.evicted.len(), 1);
    assert!(first.total_size_bytes() <= 10 * KB as u64);
}

#[test]
fn test_verify_drops_records_removed_elsewhere() {
    let root = TempDir::new().unwrap();
    let sources = Sources::new();
    let first = manager_at(root.path(), 1024);
    let second = manager_at(root.path(), 1024);

    let a = sources.add("a.obj", ArtifactKind::Model);
    first.store(&a, b"mesh");
    assert!(first.flush_index());
    second.mark_index_stale();
    assert!(second.flush_index());
    assert_eq!(second.entry_count(), 1);

    assert!(first.invalidate(&a));
    let report = second.verify();
    assert_eq!(report.missing.len(), 1);
    assert_eq!(second.entry_count(), 0);
}
