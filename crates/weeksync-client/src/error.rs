//! Client error types.

use thiserror::Error;

use weeksync_core::ScheduleError;
use weeksync_providers::ProviderError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Schedule file or slot validation error.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// Remote provider error.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
