//! Error types for the tasksync engine.

use crate::TaskId;
use thiserror::Error;

/// All possible errors from the tasksync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("duplicate task id: {0}")]
    DuplicateTask(TaskId),

    #[error("task title must not be empty")]
    EmptyTitle,

    #[error("invalid backup: {0}")]
    InvalidBackup(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
