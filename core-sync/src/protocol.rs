//! # Per-Item Copy Protocol
//!
//! Drives one song through the target account's ingestion sequence.
//!
//! ## State Machine
//!
//! ```text
//! CheckingUpload ──needUpload──→ SkippedNeedUpload
//!       │
//!       ↓
//! AllocatingToken → SubmittingMetadata ──code≠200 / no id──→ Failed
//!                          │
//!                          ↓
//!                     Publishing ──code≠200──→ Failed
//!                          │
//!                          ↓
//!                       Success
//! ```
//!
//! Any error raised by a step also ends in `Failed`. Throttling codes at the
//! submit and publish steps hold the caller for a grace period first so the
//! next item does not hit the same limit; the failing call is not repeated.

use bridge_traits::error::BridgeError;
use bridge_traits::storage::{CloudDriveService, MetadataSubmission, SongRecord};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Status codes that signal throttling
pub const THROTTLING_CODES: [i64; 2] = [429, 523];

/// Default pause after a throttling code
pub const DEFAULT_THROTTLE_GRACE: Duration = Duration::from_secs(5);

/// Human-readable meaning of a remote status code
pub fn describe_status_code(code: i64) -> &'static str {
    match code {
        401 => "unauthorized",
        403 => "forbidden",
        429 => "rate limited",
        500 => "internal server error",
        502 => "bad gateway",
        503 => "service unavailable",
        523 => "origin unreachable",
        _ => "unknown error",
    }
}

// ============================================================================
// States
// ============================================================================

/// Non-terminal protocol states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemState {
    CheckingUpload,
    AllocatingToken {
        remote_song_id: String,
    },
    SubmittingMetadata {
        remote_song_id: String,
        resource_id: i64,
    },
    Publishing {
        song_id: i64,
    },
}

impl ItemState {
    pub fn stage(&self) -> ItemStage {
        match self {
            ItemState::CheckingUpload => ItemStage::CheckingUpload,
            ItemState::AllocatingToken { .. } => ItemStage::AllocatingToken,
            ItemState::SubmittingMetadata { .. } => ItemStage::SubmittingMetadata,
            ItemState::Publishing { .. } => ItemStage::Publishing,
        }
    }
}

/// Protocol step, without the data carried between steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStage {
    CheckingUpload,
    AllocatingToken,
    SubmittingMetadata,
    Publishing,
}

impl ItemStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStage::CheckingUpload => "check upload",
            ItemStage::AllocatingToken => "allocate token",
            ItemStage::SubmittingMetadata => "submit metadata",
            ItemStage::Publishing => "publish",
        }
    }

    /// Steps after which a throttling code earns the grace period
    fn observes_throttling(&self) -> bool {
        matches!(self, ItemStage::SubmittingMetadata | ItemStage::Publishing)
    }
}

impl fmt::Display for ItemStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Success { song_id: i64 },
    SkippedNeedUpload,
    Failed { stage: ItemStage, error: String },
}

// ============================================================================
// Driver
// ============================================================================

/// Runs the protocol against one target account
pub struct ItemProtocol<'a> {
    target: &'a dyn CloudDriveService,
    throttle_grace: Duration,
}

impl<'a> ItemProtocol<'a> {
    pub fn new(target: &'a dyn CloudDriveService) -> Self {
        Self {
            target,
            throttle_grace: DEFAULT_THROTTLE_GRACE,
        }
    }

    pub fn with_throttle_grace(mut self, grace: Duration) -> Self {
        self.throttle_grace = grace;
        self
    }

    /// Drive `song` from `CheckingUpload` to a terminal outcome.
    pub async fn run(&self, song: &SongRecord) -> ItemOutcome {
        let mut state = ItemState::CheckingUpload;

        loop {
            let stage = state.stage();
            debug!(md5 = %song.content_hash, stage = %stage, "Protocol step");

            state = match self.step(song, state).await {
                Ok(Step::Next(next)) => next,
                Ok(Step::Done(outcome)) => return outcome,
                Err(error) => return self.fail_on_error(stage, error).await,
            };
        }
    }

    async fn step(&self, song: &SongRecord, state: ItemState) -> Result<Step, BridgeError> {
        match state {
            ItemState::CheckingUpload => {
                let check = self
                    .target
                    .check_upload_needed(&song.content_hash, song.file_size_bytes, song.bitrate)
                    .await?;

                if check.need_upload {
                    return Ok(Step::Done(ItemOutcome::SkippedNeedUpload));
                }
                Ok(Step::Next(ItemState::AllocatingToken {
                    remote_song_id: check.remote_song_id,
                }))
            }

            ItemState::AllocatingToken { remote_song_id } => {
                let token = self
                    .target
                    .allocate_upload_token(
                        &song.content_hash,
                        &song.file_name,
                        song.file_size_bytes,
                        song.bitrate,
                        song.file_extension(),
                    )
                    .await?;

                Ok(Step::Next(ItemState::SubmittingMetadata {
                    remote_song_id,
                    resource_id: token.resource_id,
                }))
            }

            ItemState::SubmittingMetadata {
                remote_song_id,
                resource_id,
            } => {
                let submission = MetadataSubmission::for_song(song, &remote_song_id, resource_id);
                let receipt = self.target.submit_metadata(&submission).await?;

                if !receipt.is_success() {
                    let outcome = self
                        .fail_on_status(
                            ItemStage::SubmittingMetadata,
                            receipt.status_code,
                            receipt.message.as_deref(),
                        )
                        .await;
                    return Ok(Step::Done(outcome));
                }

                match receipt.final_song_id() {
                    Some(song_id) => Ok(Step::Next(ItemState::Publishing { song_id })),
                    None => Ok(Step::Done(ItemOutcome::Failed {
                        stage: ItemStage::SubmittingMetadata,
                        error: "cannot resolve final id".to_string(),
                    })),
                }
            }

            ItemState::Publishing { song_id } => {
                let receipt = self.target.publish(song_id).await?;

                if !receipt.is_success() {
                    let outcome = self
                        .fail_on_status(
                            ItemStage::Publishing,
                            receipt.status_code,
                            receipt.message.as_deref(),
                        )
                        .await;
                    return Ok(Step::Done(outcome));
                }
                Ok(Step::Done(ItemOutcome::Success { song_id }))
            }
        }
    }

    /// Terminal failure for a non-success status code
    async fn fail_on_status(
        &self,
        stage: ItemStage,
        code: i64,
        message: Option<&str>,
    ) -> ItemOutcome {
        let error = format!(
            "{} failed: code={} ({}), message={}",
            stage,
            code,
            describe_status_code(code),
            message.unwrap_or("none")
        );

        if stage.observes_throttling() && THROTTLING_CODES.contains(&code) {
            warn!(
                code,
                grace_ms = self.throttle_grace.as_millis() as u64,
                "Throttled by remote, pausing before next item"
            );
            tokio::time::sleep(self.throttle_grace).await;
        }

        ItemOutcome::Failed { stage, error }
    }

    /// Terminal failure for an error raised by a step
    async fn fail_on_error(&self, stage: ItemStage, error: BridgeError) -> ItemOutcome {
        match error {
            BridgeError::HttpStatus { status, message } => {
                self.fail_on_status(stage, i64::from(status), Some(&message))
                    .await
            }
            other => ItemOutcome::Failed {
                stage,
                error: format!("{} failed: {}", stage, other),
            },
        }
    }
}

enum Step {
    Next(ItemState),
    Done(ItemOutcome),
}
