//! # NetEase Cloud Drive Provider
//!
//! Implements the `CloudDriveService` trait for the NetEase Cloud Music
//! private cloud ("云盘").
//!
//! ## Overview
//!
//! This module provides:
//! - Cookie-authenticated access to one account's cloud drive
//! - Paginated listing of stored songs
//! - The check / token / metadata / publish sequence that adds a song to an
//!   account by content hash, without transferring audio bytes
//! - Per-account call pacing and retry of transport faults

pub mod connector;
pub mod error;
pub mod rate_limiter;
pub mod types;

pub use connector::NetEaseConnector;
pub use error::{NetEaseError, Result};
pub use rate_limiter::RateLimiter;
