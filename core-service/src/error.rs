use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("The {account} account credential is invalid or expired")]
    InvalidCredential { account: String },

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Provider error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),
}

impl CoreError {
    /// Whether the run stopped because the shutdown token fired
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CoreError::Sync(core_sync::SyncError::Cancelled))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
