//! # Progress Store
//!
//! Owns the [`ProgressState`] of a migration and its ledger file.
//!
//! ## Durability
//!
//! `save` writes the whole state to `<ledger>.tmp` in the same directory,
//! flushes it, then renames it over the ledger. The rename is the only commit
//! point: a crash before it leaves the previous ledger untouched.
//!
//! `load` never fails. A missing file yields an empty state; an unreadable or
//! unparsable one is moved aside to `<ledger>.backup` and also yields an
//! empty state, which means the progress it held is lost.

use crate::ledger::{ProcessStatus, ProcessedRecord, ProgressState};
use crate::{Result, SyncError};
use bridge_traits::storage::SongRecord;
use bridge_traits::time::{Clock, SystemClock};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

pub struct ProgressStore {
    path: PathBuf,
    state: ProgressState,
    clock: Arc<dyn Clock>,
}

impl ProgressStore {
    /// Empty store bound to `path`; nothing is read until [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, Arc::new(SystemClock))
    }

    pub fn with_clock(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            state: ProgressState::default(),
            clock,
        }
    }

    /// Store bound to `path` with whatever the ledger currently holds.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = Self::new(path);
        store.load().await;
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// Direct access to the state, bypassing the counter bookkeeping.
    pub fn state_mut(&mut self) -> &mut ProgressState {
        &mut self.state
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("progress.json"));
        name.push(suffix);
        self.path.with_file_name(name)
    }

    /// Path the ledger is moved to when it cannot be parsed
    pub fn backup_path(&self) -> PathBuf {
        self.sibling(".backup")
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling(".tmp")
    }

    fn now(&self) -> String {
        self.clock.now().to_rfc3339()
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Replace the in-memory state with the ledger on disk.
    pub async fn load(&mut self) -> &ProgressState {
        self.state = match fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice::<ProgressState>(&bytes) {
                Ok(state) => {
                    info!(
                        path = %self.path.display(),
                        processed = state.processed_songs.len(),
                        "Loaded progress ledger"
                    );
                    state
                }
                Err(e) => {
                    error!(path = %self.path.display(), error = %e, "Progress ledger is corrupt");
                    self.quarantine().await;
                    ProgressState::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No progress ledger, starting fresh");
                ProgressState::default()
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Progress ledger is unreadable");
                self.quarantine().await;
                ProgressState::default()
            }
        };

        &self.state
    }

    /// Move a bad ledger out of the way, keeping it for inspection.
    async fn quarantine(&self) {
        let backup = self.backup_path();
        match fs::rename(&self.path, &backup).await {
            Ok(()) => warn!(backup = %backup.display(), "Corrupt ledger moved aside"),
            Err(e) => warn!(error = %e, "Failed to move corrupt ledger aside"),
        }
    }

    /// Persist the state atomically.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Persistence`] if any file operation fails; the
    /// temporary file is removed and the previous ledger is left in place.
    pub async fn save(&mut self) -> Result<()> {
        self.state.last_updated = Some(self.now());

        let temp = self.write_temp().await?;
        if let Err(e) = fs::rename(&temp, &self.path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(SyncError::Persistence {
                path: self.path.clone(),
                source: e,
            });
        }

        debug!(
            path = %self.path.display(),
            processed = self.state.processed_songs.len(),
            "Progress saved"
        );
        Ok(())
    }

    /// Serialize the state to the temporary sibling and flush it to disk.
    async fn write_temp(&self) -> Result<PathBuf> {
        let json = serde_json::to_vec_pretty(&self.state)
            .map_err(|e| SyncError::Serialization(e.to_string()))?;
        let temp = self.temp_path();

        let result = async {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).await?;
            }
            let mut file = fs::File::create(&temp).await?;
            file.write_all(&json).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&temp).await;
            return Err(SyncError::Persistence {
                path: self.path.clone(),
                source: e,
            });
        }

        Ok(temp)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Whether any terminal record exists for the hash
    pub fn is_processed(&self, content_hash: &str) -> bool {
        self.state
            .processed_songs
            .get(content_hash)
            .is_some_and(|record| record.status.is_terminal())
    }

    /// Whether the hash was in the most recent target listing
    pub fn is_in_target(&self, content_hash: &str) -> bool {
        self.state.target_existing_md5s.contains(content_hash)
    }

    pub fn record(&self, content_hash: &str) -> Option<&ProcessedRecord> {
        self.state.processed_songs.get(content_hash)
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    fn put(&mut self, song: &SongRecord, status: ProcessStatus, error: Option<String>) {
        let record = ProcessedRecord {
            md5: song.content_hash.clone(),
            song_name: song.title.clone(),
            artist: song.artist.clone(),
            status,
            timestamp: self.now(),
            error,
        };
        let replaced = self
            .state
            .processed_songs
            .insert(song.content_hash.clone(), record);

        // A hash holds one outcome; the counter of the one it replaces goes back down.
        if let Some(counter) =
            replaced.and_then(|old| self.state.statistics.counter_mut(old.status))
        {
            *counter = counter.saturating_sub(1);
        }
    }

    pub fn mark_success(&mut self, song: &SongRecord) {
        self.put(song, ProcessStatus::Success, None);
        self.state.statistics.successfully_copied += 1;
    }

    pub fn mark_failed(&mut self, song: &SongRecord, error: impl Into<String>) {
        self.put(song, ProcessStatus::Failed, Some(error.into()));
        self.state.statistics.failed += 1;
    }

    pub fn mark_skipped_need_upload(&mut self, song: &SongRecord) {
        self.put(song, ProcessStatus::SkippedNeedUpload, None);
        self.state.statistics.skipped_need_upload += 1;
    }

    pub fn mark_skipped_already_exists(&mut self, song: &SongRecord) {
        self.put(song, ProcessStatus::SkippedAlreadyExists, None);
        self.state.statistics.already_in_target += 1;
    }

    /// Replace the target hash set with the latest listing.
    pub fn set_target_existing_hashes<I, S>(&mut self, hashes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.target_existing_md5s = hashes.into_iter().map(Into::into).collect();
        info!(
            count = self.state.target_existing_md5s.len(),
            "Target account content recorded"
        );
    }

    pub fn update_statistics(&mut self, total_source: usize, already_in_target: usize, remaining: usize) {
        let statistics = &mut self.state.statistics;
        statistics.total_source_songs = total_source;
        statistics.already_in_target = already_in_target;
        statistics.remaining = remaining;
    }

    pub fn set_remaining(&mut self, remaining: usize) {
        self.state.statistics.remaining = remaining;
    }

    pub fn set_account_labels(&mut self, source: Option<String>, target: Option<String>) {
        self.state.source_account = source;
        self.state.target_account = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::tempdir;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn song(hash: &str) -> SongRecord {
        SongRecord {
            content_hash: hash.to_string(),
            title: format!("Title {hash}"),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            bitrate: 320,
            file_size_bytes: 1,
            file_name: format!("{hash}.mp3"),
            remote_id: 1,
        }
    }

    #[tokio::test]
    async fn test_interrupted_save_keeps_committed_ledger() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress.json");

        let mut store = ProgressStore::new(&path);
        store.mark_success(&song("committed"));
        store.save().await.unwrap();

        // Crash between the temp write and the rename.
        store.mark_failed(&song("lost"), "boom");
        let temp = store.write_temp().await.unwrap();
        assert!(temp.exists());

        let reopened = ProgressStore::open(&path).await;
        assert!(reopened.is_processed("committed"));
        assert!(!reopened.is_processed("lost"));
        assert_eq!(reopened.state().statistics.successfully_copied, 1);
        assert_eq!(reopened.state().statistics.failed, 0);
        assert!(!reopened.backup_path().exists());
    }

    #[tokio::test]
    async fn test_save_uses_clock_and_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("progress.json");
        let instant = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let mut store = ProgressStore::with_clock(&path, Arc::new(FixedClock(instant)));
        store.mark_skipped_need_upload(&song("h1"));
        store.save().await.unwrap();

        assert!(path.exists());
        assert!(!store.temp_path().exists());
        assert_eq!(
            store.state().last_updated.as_deref(),
            Some("2024-05-01T12:00:00+00:00")
        );
        assert_eq!(
            store.record("h1").unwrap().timestamp,
            "2024-05-01T12:00:00+00:00"
        );
    }

    #[test]
    fn test_sibling_paths() {
        let store = ProgressStore::new("data/progress.json");
        assert_eq!(store.backup_path(), PathBuf::from("data/progress.json.backup"));
        assert_eq!(store.temp_path(), PathBuf::from("data/progress.json.tmp"));
    }

    #[test]
    fn test_helpers_keep_counters_consistent() {
        let mut store = ProgressStore::new("unused.json");
        store.mark_success(&song("a"));
        store.mark_failed(&song("b"), "code=500");
        store.mark_skipped_need_upload(&song("c"));
        store.mark_skipped_already_exists(&song("d"));

        assert!(store.state().counters_consistent());
        assert!(store.is_processed("b"));
        assert_eq!(store.record("b").unwrap().error.as_deref(), Some("code=500"));

        // Writing around the helpers is exactly what the recount catches.
        store.state_mut().processed_songs.insert(
            "e".to_string(),
            ProcessedRecord {
                md5: "e".to_string(),
                song_name: String::new(),
                artist: String::new(),
                status: ProcessStatus::Success,
                timestamp: String::new(),
                error: None,
            },
        );
        assert!(!store.state().counters_consistent());
    }

    #[test]
    fn test_replacing_a_record_moves_its_count() {
        let mut store = ProgressStore::new("unused.json");
        store.mark_skipped_need_upload(&song("a"));
        store.mark_skipped_already_exists(&song("a"));

        let stats = &store.state().statistics;
        assert_eq!(stats.skipped_need_upload, 0);
        assert_eq!(stats.already_in_target, 1);
        assert!(store.state().counters_consistent());
    }

    #[test]
    fn test_pending_record_is_not_processed() {
        let mut store = ProgressStore::new("unused.json");
        store.state_mut().processed_songs.insert(
            "p".to_string(),
            ProcessedRecord {
                md5: "p".to_string(),
                song_name: String::new(),
                artist: String::new(),
                status: ProcessStatus::Pending,
                timestamp: String::new(),
                error: None,
            },
        );

        assert!(!store.is_processed("p"));
        assert!(store.record("p").is_some());
    }
}
