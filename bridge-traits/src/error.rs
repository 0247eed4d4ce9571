use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The host engine refused the request (bad source, unsupported format, ...).
    #[error("Request rejected by player: {0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
