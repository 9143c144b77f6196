//! Integration tests for the progress ledger on disk

use bridge_traits::storage::SongRecord;
use core_sync::{ProcessStatus, ProgressStore, LEDGER_VERSION};
use tempfile::TempDir;

fn song(hash: &str) -> SongRecord {
    SongRecord {
        content_hash: hash.to_string(),
        title: "Song".to_string(),
        artist: "Artist".to_string(),
        album: "Album".to_string(),
        bitrate: 999,
        file_size_bytes: 10,
        file_name: "song.flac".to_string(),
        remote_id: 5,
    }
}

#[tokio::test]
async fn test_missing_ledger_starts_fresh() {
    let dir = TempDir::new().unwrap();
    let store = ProgressStore::open(dir.path().join("progress.json")).await;

    assert!(store.state().processed_songs.is_empty());
    assert_eq!(store.state().version, LEDGER_VERSION);
    assert!(!store.backup_path().exists());
}

#[tokio::test]
async fn test_corrupt_ledger_is_moved_aside() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("progress.json");
    tokio::fs::write(&path, b"{ not json").await.unwrap();

    let store = ProgressStore::open(&path).await;

    assert!(store.state().processed_songs.is_empty());
    assert!(!path.exists());
    let backup = tokio::fs::read(store.backup_path()).await.unwrap();
    assert_eq!(backup, b"{ not json");
}

#[tokio::test]
async fn test_saved_ledger_reloads_identically() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("progress.json");

    let mut store = ProgressStore::new(&path);
    store.set_account_labels(Some("old".into()), Some("new".into()));
    store.set_target_existing_hashes(["t1", "t2"]);
    store.update_statistics(4, 0, 2);
    store.mark_skipped_already_exists(&song("t1"));
    store.mark_success(&song("s1"));
    store.mark_failed(&song("f1"), "publish failed: code=500 (internal server error), message=none");
    store.save().await.unwrap();

    let reopened = ProgressStore::open(&path).await;

    assert_eq!(reopened.state(), store.state());
    assert!(reopened.is_in_target("t2"));
    assert!(reopened.is_processed("f1"));
    assert_eq!(reopened.record("s1").unwrap().status, ProcessStatus::Success);
    assert_eq!(reopened.state().source_account.as_deref(), Some("old"));
}

#[tokio::test]
async fn test_ledger_written_by_other_tools_is_accepted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("progress.json");
    let json = r#"{
        "version": "1.0",
        "last_updated": "2024-03-01T10:00:00",
        "source_account": null,
        "target_account": null,
        "statistics": {"total_source_songs": 1, "already_in_target": 0,
                       "successfully_copied": 0, "skipped_need_upload": 1,
                       "failed": 0, "remaining": 0},
        "processed_songs": {
            "abc": {"md5": "abc", "song_name": "S", "artist": "A",
                    "status": "skipped_need_upload", "timestamp": "2024-03-01T10:00:00"}
        },
        "target_existing_md5s": ["zzz"]
    }"#;
    tokio::fs::write(&path, json).await.unwrap();

    let store = ProgressStore::open(&path).await;

    assert!(store.is_processed("abc"));
    assert!(store.is_in_target("zzz"));
    assert!(store.state().counters_consistent());
    assert!(!store.backup_path().exists());
}
