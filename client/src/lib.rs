//! Tasksync client - the I/O shell around the sync engine.
//!
//! Wires the deterministic engine to the real world: a file-backed
//! record store, an HTTP client for the remote task resource, a
//! connectivity observer, and the [`TaskService`] that applies
//! optimistic local mutations and replays pending records when
//! connectivity allows.
//!
//! The UI talks only to [`TaskService`]; the remote is consulted
//! opportunistically and never read directly.

pub mod config;
pub mod connectivity;
pub mod error;
pub mod remote;
pub mod service;
pub mod storage;

pub use config::{Config, ConfigError};
pub use connectivity::{run_sync_on_reconnect, ConnectivityObserver};
pub use error::Error;
pub use remote::{HttpRemoteClient, NetworkError, RemoteApi};
pub use service::{SyncReport, SyncStatus, TaskService};
pub use storage::{StorageError, TaskStore};
