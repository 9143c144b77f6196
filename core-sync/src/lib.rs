//! # Sync Module
//!
//! Resumable migration of cloud drive songs from one account to another.
//!
//! ## Overview
//!
//! This module manages a migration pass, including:
//! - Diffing the source listing against the target listing and the ledger
//! - Driving each missing song through the target's ingestion protocol
//! - Recording every outcome in a crash-safe progress ledger
//! - Summarizing the ledger for display
//!
//! ## Components
//!
//! - **Ledger** (`ledger`): Serializable progress state and statistics
//! - **Progress Store** (`store`): Atomic persistence and bookkeeping helpers
//! - **Item Protocol** (`protocol`): Per-song state machine
//! - **Sync Engine** (`engine`): Listing, diff, and the sequential copy loop
//! - **Summary** (`summary`): Report rendering

pub mod engine;
pub mod error;
pub mod ledger;
pub mod protocol;
pub mod store;
pub mod summary;

pub use engine::{run_sync, SyncConfig, SyncEngine, SyncPlan, SyncReport};
pub use error::{Result, SyncError};
pub use ledger::{ProcessStatus, ProcessedRecord, ProgressState, Statistics, LEDGER_VERSION};
pub use protocol::{describe_status_code, ItemOutcome, ItemProtocol, ItemStage, ItemState};
pub use store::ProgressStore;
pub use summary::{render_summary, SyncSummary};
