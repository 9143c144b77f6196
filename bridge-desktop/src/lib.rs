//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` with rustls, one round trip per `execute`
//!   and [`RetryingTransport`](bridge_traits::http::RetryingTransport) driving
//!   `execute_with_retry`
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use std::sync::Arc;
//!
//! let http_client = Arc::new(ReqwestHttpClient::new()?);
//! let connector = NetEaseConnector::new(http_client, cookie);
//! ```

mod http;

pub use http::ReqwestHttpClient;
