//! # Sync Engine
//!
//! Copies every song of the source account that the target account lacks.
//!
//! ## Phases
//!
//! 1. Fetch both listings.
//! 2. Record the target hashes and split the source listing: songs the target
//!    holds are recorded as already existing, songs with a ledger record from
//!    an earlier run are left alone, the rest form the copy list in listing
//!    order.
//! 3. Run the per-item protocol for each song of the copy list, one at a time,
//!    recording every outcome and saving every `batch_size` items.
//! 4. Save unconditionally.
//!
//! Cancellation is observed between and during items. The ledger is saved
//! before returning [`SyncError::Cancelled`]; the outcome of an item that was
//! in flight is dropped, so the next run starts it over.

use crate::protocol::{ItemOutcome, ItemProtocol, DEFAULT_THROTTLE_GRACE};
use crate::store::ProgressStore;
use crate::{Result, SyncError};
use bridge_traits::storage::{CloudDriveService, SongRecord};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Items processed between two ledger saves
    pub batch_size: usize,

    /// Pause after a throttling code from the target
    pub throttle_grace: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            throttle_grace: DEFAULT_THROTTLE_GRACE,
        }
    }
}

/// Partition of the source listing for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub total_source: usize,
    pub already_in_target: usize,
    /// Songs skipped because an earlier run recorded an outcome
    pub previously_processed: usize,
    pub to_copy: Vec<SongRecord>,
}

/// What one run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub total_source: usize,
    pub total_target: usize,
    pub already_in_target: usize,
    pub previously_processed: usize,
    pub to_copy: usize,
    pub copied: usize,
    pub skipped_need_upload: usize,
    pub failed: usize,
}

impl SyncReport {
    pub fn processed(&self) -> usize {
        self.copied + self.skipped_need_upload + self.failed
    }
}

/// Sequential copier from one account to another
pub struct SyncEngine {
    source: Arc<dyn CloudDriveService>,
    target: Arc<dyn CloudDriveService>,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(source: Arc<dyn CloudDriveService>, target: Arc<dyn CloudDriveService>) -> Self {
        Self::with_config(source, target, SyncConfig::default())
    }

    pub fn with_config(
        source: Arc<dyn CloudDriveService>,
        target: Arc<dyn CloudDriveService>,
        config: SyncConfig,
    ) -> Self {
        Self {
            source,
            target,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Split `source_items` against the target hashes already stored in
    /// `store`, recording every song the target holds.
    pub fn plan(source_items: Vec<SongRecord>, store: &mut ProgressStore) -> SyncPlan {
        let mut plan = SyncPlan {
            total_source: source_items.len(),
            ..SyncPlan::default()
        };

        for song in source_items {
            if store.is_in_target(&song.content_hash) {
                debug!(md5 = %song.content_hash, title = %song.title, "Already in target");
                store.mark_skipped_already_exists(&song);
                plan.already_in_target += 1;
            } else if store.is_processed(&song.content_hash) {
                plan.previously_processed += 1;
            } else {
                plan.to_copy.push(song);
            }
        }

        plan
    }

    /// Run one migration pass, persisting progress into `store`.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Provider`] if either listing cannot be fetched
    /// - [`SyncError::Persistence`] if a save fails
    /// - [`SyncError::Cancelled`] once `cancellation_token` fires (after saving)
    #[instrument(skip_all, fields(batch_size = self.config.batch_size))]
    pub async fn run(
        &self,
        store: &mut ProgressStore,
        cancellation_token: &CancellationToken,
    ) -> Result<SyncReport> {
        let batch_size = self.config.batch_size.max(1);

        // Phase 1: Fetch listings
        info!("Phase 1: Fetching source and target listings");
        let source_items =
            Self::cancellable(cancellation_token, store, self.source.fetch_all_items()).await?;
        let target_items =
            Self::cancellable(cancellation_token, store, self.target.fetch_all_items()).await?;
        info!(
            source = source_items.len(),
            target = target_items.len(),
            "Listings fetched"
        );

        // Phase 2: Diff
        info!("Phase 2: Comparing listings");
        let target_hashes: HashSet<&str> = target_items
            .iter()
            .map(|song| song.content_hash.as_str())
            .collect();
        store.set_target_existing_hashes(target_hashes);

        let plan = Self::plan(source_items, store);
        store.update_statistics(plan.total_source, plan.already_in_target, plan.to_copy.len());
        info!(
            already_in_target = plan.already_in_target,
            previously_processed = plan.previously_processed,
            to_copy = plan.to_copy.len(),
            "Copy plan ready"
        );

        let mut report = SyncReport {
            total_source: plan.total_source,
            total_target: target_items.len(),
            already_in_target: plan.already_in_target,
            previously_processed: plan.previously_processed,
            to_copy: plan.to_copy.len(),
            ..SyncReport::default()
        };

        // Phase 3: Copy
        info!("Phase 3: Copying {} songs", plan.to_copy.len());
        let protocol =
            ItemProtocol::new(self.target.as_ref()).with_throttle_grace(self.config.throttle_grace);
        let total = plan.to_copy.len();

        for (index, song) in plan.to_copy.iter().enumerate() {
            if cancellation_token.is_cancelled() {
                return Self::abort(store).await;
            }

            info!("[{}/{}] {} - {}", index + 1, total, song.title, song.artist);

            let outcome = tokio::select! {
                biased;
                _ = cancellation_token.cancelled() => {
                    warn!(md5 = %song.content_hash, "Interrupted mid-item, outcome dropped");
                    return Self::abort(store).await;
                }
                outcome = protocol.run(song) => outcome,
            };

            match outcome {
                ItemOutcome::Success { song_id } => {
                    info!(song_id, "Copied");
                    store.mark_success(song);
                    report.copied += 1;
                }
                ItemOutcome::SkippedNeedUpload => {
                    info!("Skipped, the service needs the file uploaded");
                    store.mark_skipped_need_upload(song);
                    report.skipped_need_upload += 1;
                }
                ItemOutcome::Failed { stage, error } => {
                    error!(stage = %stage, "Copy failed: {}", error);
                    store.mark_failed(song, error);
                    report.failed += 1;
                }
            }
            store.set_remaining(total - index - 1);

            if (index + 1) % batch_size == 0 {
                store.save().await?;
                debug!(processed = index + 1, "Batch persisted");
            }
        }

        // Phase 4: Persist
        store.save().await?;
        info!(
            copied = report.copied,
            skipped_need_upload = report.skipped_need_upload,
            failed = report.failed,
            "Phase 4: Sync pass complete"
        );

        Ok(report)
    }

    /// Await `future` unless the token fires first, in which case the ledger
    /// is flushed and `Cancelled` returned.
    async fn cancellable<T, F>(
        cancellation_token: &CancellationToken,
        store: &mut ProgressStore,
        future: F,
    ) -> Result<T>
    where
        F: Future<Output = bridge_traits::error::Result<T>>,
    {
        tokio::select! {
            biased;
            _ = cancellation_token.cancelled() => Self::abort(store).await,
            result = future => result.map_err(SyncError::from),
        }
    }

    async fn abort<T>(store: &mut ProgressStore) -> Result<T> {
        warn!("Sync cancelled, saving progress");
        store.save().await?;
        Err(SyncError::Cancelled)
    }
}

/// Run one pass from `source` to `target` with the given batch size and no
/// external cancellation.
pub async fn run_sync(
    source: Arc<dyn CloudDriveService>,
    target: Arc<dyn CloudDriveService>,
    store: &mut ProgressStore,
    batch_size: usize,
) -> Result<SyncReport> {
    if batch_size == 0 {
        return Err(SyncError::InvalidConfig(
            "batch size must be at least 1".to_string(),
        ));
    }

    let config = SyncConfig {
        batch_size,
        ..SyncConfig::default()
    };
    SyncEngine::with_config(source, target, config)
        .run(store, &CancellationToken::new())
        .await
}
