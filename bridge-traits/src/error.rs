use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The request did not complete before its deadline.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The remote host could not be reached.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The remote service answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// The response body did not match the expected schema.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Transport faults that are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, BridgeError::Timeout(_) | BridgeError::Connection(_))
    }

    /// Authentication-class rejection (401/403).
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            BridgeError::HttpStatus {
                status: 401 | 403,
                ..
            }
        )
    }

    /// Status code carried by a remote rejection, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            BridgeError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
