//! # Core Configuration Module
//!
//! Provides configuration management for the migration tool.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance holding the two account credentials and the tuning knobs of a run.
//! It enforces fail-fast validation so a bad value is reported before any
//! request leaves the machine.
//!
//! ## Credentials File
//!
//! Account cookies live in a JSON file (`config/cookies.json` by default):
//!
//! ```json
//! {
//!   "source": { "cookie": "MUSIC_U=...; __csrf=...", "account_name": "old" },
//!   "target": { "cookie": "MUSIC_U=...; __csrf=..." }
//! }
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, CredentialConfig};
//!
//! let config = CoreConfig::builder()
//!     .credentials(CredentialConfig::load("config/cookies.json")?)
//!     .progress_path("data/progress.json")
//!     .batch_size(20)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Credentials are required
//! let config = CoreConfig::builder()
//!     .batch_size(5)
//!     .build()
//!     .expect("Should fail - missing credentials");
//! ```

use crate::error::{Error, Result};
use crate::logging::redact_if_sensitive;
use bridge_traits::http::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Credentials file read when none is given
pub const DEFAULT_CREDENTIALS_PATH: &str = "config/cookies.json";

/// Ledger location when none is given
pub const DEFAULT_PROGRESS_PATH: &str = "data/progress.json";

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Per-account request pacing
pub const DEFAULT_CALLS_PER_SECOND: f64 = 2.0;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause after a throttling code from the target account
pub const DEFAULT_THROTTLE_GRACE: Duration = Duration::from_secs(5);

// ============================================================================
// Credentials
// ============================================================================

/// One account's session
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Full `Cookie` header value of a logged-in session
    pub cookie: String,

    /// Display label stored in the ledger
    #[serde(default)]
    pub account_name: Option<String>,
}

impl AccountConfig {
    pub fn new(cookie: impl Into<String>) -> Self {
        Self {
            cookie: cookie.into(),
            account_name: None,
        }
    }

    pub fn with_account_name(mut self, name: impl Into<String>) -> Self {
        self.account_name = Some(name.into());
        self
    }

    fn validate(&self, role: &str) -> Result<()> {
        if self.cookie.trim().is_empty() {
            return Err(Error::Config(format!(
                "The {} account has an empty cookie. Copy the Cookie header of a \
                 logged-in music.163.com session into the credentials file.",
                role
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountConfig")
            .field("cookie", &redact_if_sensitive("cookie", &self.cookie))
            .field("account_name", &self.account_name)
            .finish()
    }
}

/// Both accounts of a migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialConfig {
    pub source: AccountConfig,
    pub target: AccountConfig,
}

impl CredentialConfig {
    /// Parses the credentials JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let credentials: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid credentials file: {}", e)))?;
        credentials.validate()?;
        Ok(credentials)
    }

    /// Reads and parses the credentials file at `path`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the file does not exist, with a hint about the
    ///   example file
    /// - [`Error::Io`] if it exists but cannot be read
    /// - [`Error::Config`] if it is not a valid credentials document
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!(
                    "Credentials file not found: {}. Create it from cookies.json.example.",
                    path.display()
                ))
            } else {
                Error::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.source.validate("source")?;
        self.target.validate("target")
    }
}

// ============================================================================
// Core Configuration
// ============================================================================

/// Settings of one migration run.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub credentials: CredentialConfig,

    /// Progress ledger file
    pub progress_path: PathBuf,

    /// Items processed between two ledger saves
    pub batch_size: usize,

    /// Request rate allowed per account
    pub calls_per_second: f64,

    /// Timeout of a single HTTP attempt
    pub request_timeout: Duration,

    /// Retry schedule for transport faults
    pub retry_policy: RetryPolicy,

    /// Pause after a throttling code
    pub throttle_grace: Duration,
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Both cookies are present
    /// - The progress path is not empty
    /// - Batch size is at least 1
    /// - The call rate is a positive number
    /// - The request timeout and retry attempts are non-zero
    pub fn validate(&self) -> Result<()> {
        self.credentials.validate()?;

        if self.progress_path.as_os_str().is_empty() {
            return Err(Error::Config("Progress path cannot be empty".to_string()));
        }

        if self.batch_size == 0 {
            return Err(Error::Config(
                "Batch size must be at least 1".to_string(),
            ));
        }

        if !self.calls_per_second.is_finite() || self.calls_per_second <= 0.0 {
            return Err(Error::Config(format!(
                "Calls per second must be a positive number, got {}",
                self.calls_per_second
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.retry_policy.max_attempts == 0 {
            return Err(Error::Config(
                "Retry policy needs at least one attempt".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    credentials: Option<CredentialConfig>,
    progress_path: Option<PathBuf>,
    batch_size: Option<usize>,
    calls_per_second: Option<f64>,
    request_timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
    throttle_grace: Option<Duration>,
}

impl CoreConfigBuilder {
    /// Sets both account credentials (required).
    pub fn credentials(mut self, credentials: CredentialConfig) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the ledger path.
    ///
    /// Default: `data/progress.json`
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .progress_path("/var/lib/migration/progress.json");
    /// ```
    pub fn progress_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.progress_path = Some(path.into());
        self
    }

    /// Default: 10
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Default: 2.0
    pub fn calls_per_second(mut self, calls_per_second: f64) -> Self {
        self.calls_per_second = Some(calls_per_second);
        self
    }

    /// Default: 30 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Default: 3 attempts, 2 s base delay, 10 s cap
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Default: 5 seconds
    pub fn throttle_grace(mut self, grace: Duration) -> Self {
        self.throttle_grace = Some(grace);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if credentials are missing or any value is
    /// out of range.
    pub fn build(self) -> Result<CoreConfig> {
        let credentials = self.credentials.ok_or_else(|| {
            Error::Config(
                "Credentials are required. Use .credentials() with a loaded CredentialConfig."
                    .to_string(),
            )
        })?;

        let config = CoreConfig {
            credentials,
            progress_path: self
                .progress_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRESS_PATH)),
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            calls_per_second: self.calls_per_second.unwrap_or(DEFAULT_CALLS_PER_SECOND),
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            retry_policy: self.retry_policy.unwrap_or_default(),
            throttle_grace: self.throttle_grace.unwrap_or(DEFAULT_THROTTLE_GRACE),
        };

        config.validate()?;

        Ok(config)
    }
}
