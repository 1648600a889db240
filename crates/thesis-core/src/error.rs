use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing credentials or invalid settings; fatal at startup.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Persisted corpus artifacts missing, unreadable or mutually inconsistent.
    #[error("Storage error: {0}")]
    Storage(String),

    /// An embedding or generation call failed.
    #[error("External service error ({service}): {message}")]
    ExternalService { service: String, message: String },

    #[error("External service '{service}' timed out after {secs}s")]
    Timeout { service: String, secs: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn external(service: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::ExternalService { service: service.into(), message: message.to_string() }
    }

    pub fn storage(message: impl std::fmt::Display) -> Self {
        Self::Storage(message.to_string())
    }

    /// Failures a caller may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExternalService { .. } | Self::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
