//! Registry client error types.

use thiserror::Error;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors that can occur while talking to the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Registry returned {status}: {body}")]
    RequestFailed { status: u16, body: String },
}

impl RegistryError {
    /// Whether retrying the call can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            RegistryError::Network(_) => true,
            RegistryError::RequestFailed { status, .. } => *status >= 500,
        }
    }
}
