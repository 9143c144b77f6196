//! Human-readable ledger summary

use crate::ledger::{ProcessStatus, ProgressState, Statistics};
use crate::store::ProgressStore;
use std::fmt;

const RULE_WIDTH: usize = 60;

/// Failed songs listed in full before the list is truncated
const MAX_LISTED_FAILURES: usize = 20;

const COUNTER_NOTE: &str = "Counts show each song's latest status. A song copied by an \
earlier run that now appears in the target counts as already in target.";

/// Snapshot of a ledger for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub source_account: Option<String>,
    pub target_account: Option<String>,
    pub last_updated: Option<String>,
    pub statistics: Statistics,
    pub processed: usize,
    /// `(song name, artist, error)` of failed records
    pub failures: Vec<(String, String, String)>,
}

impl SyncSummary {
    pub fn from_state(state: &ProgressState) -> Self {
        let failures = state
            .records_with_status(ProcessStatus::Failed)
            .map(|record| {
                (
                    record.song_name.clone(),
                    record.artist.clone(),
                    record.error.clone().unwrap_or_default(),
                )
            })
            .collect();

        Self {
            source_account: state.source_account.clone(),
            target_account: state.target_account.clone(),
            last_updated: state.last_updated.clone(),
            statistics: state.statistics.clone(),
            processed: state.processed_songs.len(),
            failures,
        }
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        let stats = &self.statistics;
        let label = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

        writeln!(f, "{}", rule)?;
        writeln!(f, "Sync summary")?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "Source account:        {}", label(&self.source_account))?;
        writeln!(f, "Target account:        {}", label(&self.target_account))?;
        writeln!(f, "Source songs:          {}", stats.total_source_songs)?;
        writeln!(f, "Already in target:     {}", stats.already_in_target)?;
        writeln!(f, "Copied:                {}", stats.successfully_copied)?;
        writeln!(f, "Skipped (need upload): {}", stats.skipped_need_upload)?;
        writeln!(f, "Failed:                {}", stats.failed)?;
        writeln!(f, "Remaining:             {}", stats.remaining)?;
        writeln!(f, "Ledger records:        {}", self.processed)?;
        writeln!(f, "Last updated:          {}", label(&self.last_updated))?;
        writeln!(f, "{}", COUNTER_NOTE)?;

        if !self.failures.is_empty() {
            writeln!(f, "{}", rule)?;
            writeln!(f, "Failed songs:")?;
            for (song, artist, error) in self.failures.iter().take(MAX_LISTED_FAILURES) {
                writeln!(f, "  - {} - {}: {}", song, artist, error)?;
            }
            if self.failures.len() > MAX_LISTED_FAILURES {
                writeln!(
                    f,
                    "  ... and {} more",
                    self.failures.len() - MAX_LISTED_FAILURES
                )?;
            }
        }

        write!(f, "{}", rule)
    }
}

/// Render the statistics held by `store` as a multi-line report.
pub fn render_summary(store: &ProgressStore) -> String {
    SyncSummary::from_state(store.state()).to_string()
}
