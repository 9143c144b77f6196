use bridge_traits::error::BridgeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Provider error: {0}")]
    Provider(#[from] BridgeError),

    #[error("Failed to persist progress to {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize progress: {0}")]
    Serialization(String),

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Invalid process status: {0}")]
    InvalidStatus(String),

    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
