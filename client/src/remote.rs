//! HTTP client for the remote task resource.
//!
//! A thin wrapper: every non-2xx response or transport failure becomes a
//! [`NetworkError`]. No retries happen here - retry policy belongs to the
//! service's sync passes.

use crate::config::Config;
use std::future::Future;
use std::time::Duration;
use tasksync_engine::{RemoteTask, TaskPayload};
use thiserror::Error;

/// Remote call failure.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Server answered with a non-2xx status
    #[error("remote returned status {0}")]
    Status(u16),

    /// Transport-level failure (DNS, connection, timeout, bad body)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl NetworkError {
    /// HTTP status code when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            NetworkError::Status(code) => Some(*code),
            NetworkError::Transport(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

/// The remote task API the service talks to.
///
/// Implemented by [`HttpRemoteClient`] and by scripted test doubles.
pub trait RemoteApi: Send + Sync {
    /// Fetch the full remote collection.
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<RemoteTask>, NetworkError>> + Send;

    /// Create a record, returning it with its server-assigned id.
    fn create(
        &self,
        payload: &TaskPayload,
    ) -> impl Future<Output = Result<RemoteTask, NetworkError>> + Send;

    /// Patch an existing record.
    fn update(
        &self,
        remote_id: &str,
        payload: &TaskPayload,
    ) -> impl Future<Output = Result<RemoteTask, NetworkError>> + Send;

    /// Delete a record.
    fn delete(&self, remote_id: &str) -> impl Future<Output = Result<(), NetworkError>> + Send;
}

/// Remote client backed by the task REST resource:
/// `GET/POST {base}/{user}`, `PATCH/DELETE {base}/{user}/{id}`.
#[derive(Debug, Clone)]
pub struct HttpRemoteClient {
    http: reqwest::Client,
    base_url: String,
    user_id: String,
}

impl HttpRemoteClient {
    /// Build a client for the given API base URL and user.
    pub fn new(
        base_url: impl Into<String>,
        user_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NetworkError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id: user_id.into(),
        })
    }

    /// Build a client from configuration.
    pub fn from_config(config: &Config) -> Result<Self, NetworkError> {
        Self::new(
            config.api_base_url.clone(),
            config.user_id.clone(),
            config.request_timeout,
        )
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, self.user_id)
    }

    fn record_url(&self, remote_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.user_id, remote_id)
    }

    fn check_status(response: reqwest::Response) -> Result<reqwest::Response, NetworkError> {
        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

impl RemoteApi for HttpRemoteClient {
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<RemoteTask>, NetworkError>> + Send {
        async move {
            let response = self.http.get(self.collection_url()).send().await?;
            let response = Self::check_status(response)?;
            Ok(response.json().await?)
        }
    }

    fn create(
        &self,
        payload: &TaskPayload,
    ) -> impl Future<Output = Result<RemoteTask, NetworkError>> + Send {
        async move {
            let response = self
                .http
                .post(self.collection_url())
                .json(payload)
                .send()
                .await?;
            let response = Self::check_status(response)?;
            Ok(response.json().await?)
        }
    }

    fn update(
        &self,
        remote_id: &str,
        payload: &TaskPayload,
    ) -> impl Future<Output = Result<RemoteTask, NetworkError>> + Send {
        let url = self.record_url(remote_id);
        async move {
            let response = self.http.patch(url).json(payload).send().await?;
            let response = Self::check_status(response)?;
            Ok(response.json().await?)
        }
    }

    fn delete(&self, remote_id: &str) -> impl Future<Output = Result<(), NetworkError>> + Send {
        let url = self.record_url(remote_id);
        async move {
            let response = self.http.delete(url).send().await?;
            Self::check_status(response)?;
            Ok(())
        }
    }
}
