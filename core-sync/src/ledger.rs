//! # Progress Ledger Model
//!
//! Serializable state of a migration: one record per content hash plus
//! running statistics. The JSON layout is the on-disk format of the ledger
//! file, so field names are part of the contract.
//!
//! ```text
//! { version, last_updated, source_account, target_account,
//!   statistics: { total_source_songs, already_in_target, successfully_copied,
//!                 skipped_need_upload, failed, remaining },
//!   processed_songs: { <md5>: { md5, song_name, artist, status, timestamp, error? } },
//!   target_existing_md5s: [ <md5>, ... ] }
//! ```

use crate::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Ledger format version written by this crate
pub const LEDGER_VERSION: &str = "1.0";

// ============================================================================
// Status Types
// ============================================================================

/// Outcome recorded for one content hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    /// Published into the target account
    Success,
    /// A protocol step failed; not retried by later runs
    Failed,
    /// The service wants the raw bytes, which this tool does not upload
    SkippedNeedUpload,
    /// The target account already holds the content hash
    SkippedAlreadyExists,
    Pending,
}

impl ProcessStatus {
    /// Check if this status represents a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Success => "success",
            ProcessStatus::Failed => "failed",
            ProcessStatus::SkippedNeedUpload => "skipped_need_upload",
            ProcessStatus::SkippedAlreadyExists => "skipped_already_exists",
            ProcessStatus::Pending => "pending",
        }
    }
}

impl FromStr for ProcessStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "success" => Ok(ProcessStatus::Success),
            "failed" => Ok(ProcessStatus::Failed),
            "skipped_need_upload" => Ok(ProcessStatus::SkippedNeedUpload),
            "skipped_already_exists" => Ok(ProcessStatus::SkippedAlreadyExists),
            "pending" => Ok(ProcessStatus::Pending),
            _ => Err(SyncError::InvalidStatus(s.to_string())),
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Records
// ============================================================================

/// Ledger entry for one content hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub md5: String,
    pub song_name: String,
    pub artist: String,
    pub status: ProcessStatus,
    /// RFC 3339 time the outcome was recorded
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Running counters of a migration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    #[serde(default)]
    pub total_source_songs: usize,
    #[serde(default)]
    pub already_in_target: usize,
    #[serde(default)]
    pub successfully_copied: usize,
    #[serde(default)]
    pub skipped_need_upload: usize,
    #[serde(default)]
    pub failed: usize,
    #[serde(default)]
    pub remaining: usize,
}

impl Statistics {
    /// Counter tracking records of `status`, if any.
    pub fn counter_mut(&mut self, status: ProcessStatus) -> Option<&mut usize> {
        match status {
            ProcessStatus::Success => Some(&mut self.successfully_copied),
            ProcessStatus::Failed => Some(&mut self.failed),
            ProcessStatus::SkippedNeedUpload => Some(&mut self.skipped_need_upload),
            ProcessStatus::SkippedAlreadyExists => Some(&mut self.already_in_target),
            ProcessStatus::Pending => None,
        }
    }

    /// Counters rebuilt from the records themselves.
    ///
    /// `total_source_songs` and `remaining` are not derivable from records and
    /// are carried over from `self`.
    pub fn recount<'a>(&self, records: impl IntoIterator<Item = &'a ProcessedRecord>) -> Self {
        let mut counted = Statistics {
            total_source_songs: self.total_source_songs,
            remaining: self.remaining,
            ..Statistics::default()
        };

        for record in records {
            if let Some(counter) = counted.counter_mut(record.status) {
                *counter += 1;
            }
        }

        counted
    }
}

// ============================================================================
// Ledger State
// ============================================================================

/// Full persisted state of a migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub source_account: Option<String>,
    #[serde(default)]
    pub target_account: Option<String>,
    #[serde(default)]
    pub statistics: Statistics,
    #[serde(default)]
    pub processed_songs: BTreeMap<String, ProcessedRecord>,
    /// Content hashes of the most recent target listing
    #[serde(default)]
    pub target_existing_md5s: BTreeSet<String>,
}

fn default_version() -> String {
    LEDGER_VERSION.to_string()
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            version: default_version(),
            last_updated: None,
            source_account: None,
            target_account: None,
            statistics: Statistics::default(),
            processed_songs: BTreeMap::new(),
            target_existing_md5s: BTreeSet::new(),
        }
    }
}

impl ProgressState {
    /// Whether the incrementally maintained counters agree with the records.
    pub fn counters_consistent(&self) -> bool {
        self.statistics.recount(self.processed_songs.values()) == self.statistics
    }

    /// Records with the given status, in hash order.
    pub fn records_with_status(
        &self,
        status: ProcessStatus,
    ) -> impl Iterator<Item = &ProcessedRecord> {
        self.processed_songs
            .values()
            .filter(move |record| record.status == status)
    }
}
