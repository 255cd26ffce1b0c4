//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Panel connectivity errors
#[derive(Error, Debug)]
pub enum PanelError {
    #[error("Panel unreachable: {0}")]
    Unreachable(String),

    #[error("Panel rejected the credentials: {0}")]
    Rejected(String),
}

/// Everything that can end a dialogue early.
///
/// These are converted to a reply inside the router and never propagate to
/// the transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("sender is not an admin")]
    AuthorizationDenied,

    #[error("invalid input {value:?}, retry with /{retry}")]
    Validation { value: String, retry: &'static str },

    #[error("{0} already exists")]
    DuplicateEntity(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("external store unavailable: {reason}")]
    ExternalStoreUnavailable { reason: String, retry: &'static str },
}

impl FlowError {
    pub fn validation(value: impl Into<String>, retry: &'static str) -> Self {
        FlowError::Validation { value: value.into(), retry }
    }

    pub fn unavailable(reason: impl ToString, retry: &'static str) -> Self {
        FlowError::ExternalStoreUnavailable { reason: reason.to_string(), retry }
    }
}
