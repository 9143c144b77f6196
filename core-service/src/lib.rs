//! Core service façade and bootstrap helpers.
//!
//! This crate wires the run configuration and one cloud drive connector per
//! account into the sync engine. Desktop builds enable the `desktop-shims`
//! feature, which builds NetEase connectors on top of `bridge-desktop`'s
//! reqwest client; tests and other hosts inject their own
//! [`CloudDriveService`] implementations through [`CoreDependencies`].

pub mod error;

pub use error::{CoreError, Result};

use std::path::Path;
use std::sync::Arc;

use bridge_traits::storage::CloudDriveService;
use core_runtime::config::CoreConfig;
use core_sync::{ProgressStore, SyncConfig, SyncEngine, SyncReport, SyncSummary};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// The two accounts a migration talks to.
pub struct CoreDependencies {
    pub source: Arc<dyn CloudDriveService>,
    pub target: Arc<dyn CloudDriveService>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit service handles.
    pub fn new(source: Arc<dyn CloudDriveService>, target: Arc<dyn CloudDriveService>) -> Self {
        Self { source, target }
    }

    /// NetEase connectors for both accounts of `config`, sharing one HTTP
    /// client but pacing requests per account.
    #[cfg(feature = "desktop-shims")]
    pub fn from_config(config: &CoreConfig) -> Result<Self> {
        use bridge_desktop::ReqwestHttpClient;
        use bridge_traits::http::HttpClient;
        use provider_netease::NetEaseConnector;

        let http_client: Arc<dyn HttpClient> = Arc::new(
            ReqwestHttpClient::with_timeout(config.request_timeout)
                .map_err(|e| CoreError::InitializationFailed(e.to_string()))?,
        );

        let connector = |cookie: &str| -> Arc<dyn CloudDriveService> {
            Arc::new(
                NetEaseConnector::new(Arc::clone(&http_client), cookie)
                    .with_rate_limit(config.calls_per_second)
                    .with_retry_policy(config.retry_policy.clone())
                    .with_request_timeout(config.request_timeout),
            )
        };

        Ok(Self {
            source: connector(&config.credentials.source.cookie),
            target: connector(&config.credentials.target.cookie),
        })
    }
}

/// Primary façade exposed to the command line front end.
#[derive(Clone)]
pub struct MigrationService {
    config: Arc<CoreConfig>,
    deps: Arc<CoreDependencies>,
}

impl MigrationService {
    /// Create a new service from the provided configuration and dependencies.
    pub fn new(config: CoreConfig, deps: CoreDependencies) -> Self {
        Self {
            config: Arc::new(config),
            deps: Arc::new(deps),
        }
    }

    /// Service talking to the NetEase accounts named in `config`.
    #[cfg(feature = "desktop-shims")]
    pub fn from_config(config: CoreConfig) -> Result<Self> {
        let deps = CoreDependencies::from_config(&config)?;
        Ok(Self::new(config, deps))
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Access the service handles being used.
    pub fn dependencies(&self) -> Arc<CoreDependencies> {
        Arc::clone(&self.deps)
    }

    /// Check both credentials, source first.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidCredential`] naming the first account the service
    /// rejected; any other failure of the probe request as
    /// [`CoreError::Bridge`].
    pub async fn validate_credentials(&self) -> Result<()> {
        for (account, service) in [("source", &self.deps.source), ("target", &self.deps.target)] {
            if !service.validate_credential().await? {
                return Err(CoreError::InvalidCredential {
                    account: account.to_string(),
                });
            }
            info!(account, "Credential accepted");
        }
        Ok(())
    }

    /// Run one migration pass against the configured ledger.
    ///
    /// Credentials are checked before the ledger is touched by the engine.
    /// When `shutdown` fires the ledger is flushed and the call returns an
    /// error for which [`CoreError::is_cancelled`] holds.
    #[instrument(skip_all, fields(progress = %self.config.progress_path.display()))]
    pub async fn run_copy(&self, shutdown: &CancellationToken) -> Result<SyncReport> {
        let mut store = ProgressStore::open(&self.config.progress_path).await;

        self.validate_credentials().await?;

        let credentials = &self.config.credentials;
        let source_label = credentials
            .source
            .account_name
            .clone()
            .or_else(|| store.state().source_account.clone());
        let target_label = credentials
            .target
            .account_name
            .clone()
            .or_else(|| store.state().target_account.clone());
        store.set_account_labels(source_label, target_label);

        let engine = SyncEngine::with_config(
            Arc::clone(&self.deps.source),
            Arc::clone(&self.deps.target),
            SyncConfig {
                batch_size: self.config.batch_size,
                throttle_grace: self.config.throttle_grace,
            },
        );

        let report = engine.run(&mut store, shutdown).await?;
        info!(
            copied = report.copied,
            skipped_need_upload = report.skipped_need_upload,
            failed = report.failed,
            "Migration finished"
        );
        Ok(report)
    }

    /// Summary of the configured ledger.
    pub async fn summary(&self) -> Option<SyncSummary> {
        status(&self.config.progress_path).await
    }
}

/// Summary of the ledger at `progress_path`, or `None` when no ledger exists.
pub async fn status(progress_path: impl AsRef<Path>) -> Option<SyncSummary> {
    let path = progress_path.as_ref();
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return None;
    }

    let store = ProgressStore::open(path).await;
    Some(SyncSummary::from_state(store.state()))
}
