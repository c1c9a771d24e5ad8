use thiserror::Error;

/// Failure reported by a host-provided collaborator.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge connection lost: {0}")]
    Disconnected(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether the failure means the host side is currently unreachable
    /// (as opposed to rejecting the request).
    pub fn is_unavailable(&self) -> bool {
        matches!(self, BridgeError::NotAvailable(_) | BridgeError::Disconnected(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
