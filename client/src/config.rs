//! Configuration management for the sync client.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote task API
    pub api_base_url: String,
    /// User id appended to every request path
    pub user_id: String,
    /// Path of the local collection file
    pub storage_path: PathBuf,
    /// Timeout applied to every remote call
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url =
            env::var("TASKSYNC_API_URL").map_err(|_| ConfigError::MissingApiUrl)?;

        let user_id = env::var("TASKSYNC_USER_ID").map_err(|_| ConfigError::MissingUserId)?;

        let storage_path = env::var("TASKSYNC_DB_PATH")
            .unwrap_or_else(|_| "tasks.json".to_string())
            .into();

        let request_timeout = env::var("TASKSYNC_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidTimeout)?;

        Ok(Self {
            api_base_url,
            user_id,
            storage_path,
            request_timeout,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TASKSYNC_API_URL environment variable is required")]
    MissingApiUrl,

    #[error("TASKSYNC_USER_ID environment variable is required")]
    MissingUserId,

    #[error("Invalid TASKSYNC_TIMEOUT_SECS value")]
    InvalidTimeout,
}
