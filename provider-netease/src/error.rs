//! Error types for the NetEase cloud drive provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// NetEase provider errors
#[derive(Error, Debug)]
pub enum NetEaseError {
    /// The session cookie was rejected
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned an error status
    #[error("NetEase API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for NetEase operations
pub type Result<T> = std::result::Result<T, NetEaseError>;

impl From<NetEaseError> for BridgeError {
    fn from(error: NetEaseError) -> Self {
        match error {
            NetEaseError::AuthenticationFailed(message) => BridgeError::HttpStatus {
                status: 401,
                message,
            },
            NetEaseError::ApiError {
                status_code,
                message,
            } => BridgeError::HttpStatus {
                status: status_code,
                message,
            },
            NetEaseError::ParseError(msg) => BridgeError::Decode(msg),
            NetEaseError::BridgeError(e) => e,
        }
    }
}
