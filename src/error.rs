use std::io::ErrorKind;

pub type Result<T> = std::result::Result<T, BrowserError>;

/// Failures surfaced by the gateway, the history stack and file operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrowserError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Not available: {0}")]
    NotAvailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl BrowserError {
    pub fn io(message: impl Into<String>) -> Self {
        BrowserError::Io(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        BrowserError::InvalidInput(message.into())
    }
}

impl From<std::io::Error> for BrowserError {
    fn from(error: std::io::Error) -> Self {
        let message = error.to_string();
        match error.kind() {
            ErrorKind::NotFound => BrowserError::NotFound(message),
            ErrorKind::PermissionDenied => BrowserError::PermissionDenied(message),
            ErrorKind::AlreadyExists => BrowserError::AlreadyExists(message),
            ErrorKind::InvalidInput => BrowserError::InvalidInput(message),
            _ => BrowserError::Io(message),
        }
    }
}

impl From<serde_json::Error> for BrowserError {
    fn from(error: serde_json::Error) -> Self {
        BrowserError::InvalidInput(error.to_string())
    }
}

impl From<tokio::task::JoinError> for BrowserError {
    fn from(error: tokio::task::JoinError) -> Self {
        BrowserError::Io(format!("background task failed: {}", error))
    }
}
