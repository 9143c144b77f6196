//! # Host Bridge Traits
//!
//! Abstraction traits between the migration core and the outside world.
//!
//! ## Overview
//!
//! This crate defines the contract between the sync engine and the concrete
//! adapters it runs on. Each trait represents a capability the core requires
//! but that is implemented elsewhere: the HTTP stack lives in
//! `bridge-desktop`, the remote cloud drive wire protocol in
//! `provider-netease`.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Single-shot async HTTP with a retrying wrapper
//! - [`RetryingTransport`](http::RetryingTransport) - Bounded exponential backoff on transport faults
//!
//! ### Remote Storage
//! - [`CloudDriveService`](storage::CloudDriveService) - Listing and the four-step ingestion sequence
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. The
//! variants separate the failure kinds the core reacts to differently:
//!
//! | Variant | Meaning | Retried |
//! |---------|---------|---------|
//! | `Timeout`, `Connection` | transport fault | yes, by `RetryingTransport` |
//! | `HttpStatus` | remote rejected the call | no |
//! | `Decode` | body did not match the schema | no |
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so one connector can be
//! shared behind an `Arc` across async tasks.
//!
//! ## Examples
//!
//! ### Implementing HttpClient
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient {
//!     client: reqwest::Client,
//! }
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         // One round trip; map timeouts and connect failures
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy, RetryingTransport};
pub use storage::{
    CloudDriveService, MetadataReceipt, MetadataSubmission, PublishReceipt, SongRecord,
    UploadCheck, UploadToken,
};
pub use time::{Clock, LogLevel, SystemClock};
