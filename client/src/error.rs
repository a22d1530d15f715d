//! Unified error handling for the client.

use crate::config::ConfigError;
use crate::remote::NetworkError;
use crate::storage::StorageError;

/// Client error type.
///
/// Network failures during optimistic mutations never surface here -
/// they only keep records pending. What does surface: storage failures
/// on save (silent data loss is worse than a visible error), mutations
/// targeting unknown records, and setup problems.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("engine error: {0}")]
    Engine(#[from] tasksync_engine::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// True when the failing call targeted a record that does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::Engine(tasksync_engine::Error::TaskNotFound(_))
        )
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
