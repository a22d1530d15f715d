//! Local persistence of the task collection.
//!
//! One JSON file holds the whole serialized collection, read and
//! rewritten per mutation. Read-modify-write is not atomic across
//! callers; the service serializes access through its collection lock.

use std::path::{Path, PathBuf};
use tasksync_engine::TaskCollection;
use thiserror::Error;

/// Local persistence failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt task data in {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize task data: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// File-backed store for the serialized task collection.
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted collection. A missing file is an empty
    /// collection; any other failure is the caller's decision.
    pub async fn load(&self) -> Result<TaskCollection, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(TaskCollection::new());
            }
            Err(source) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Persist the collection, replacing the previous contents.
    pub async fn save(&self, collection: &TaskCollection) -> Result<(), StorageError> {
        let json = serde_json::to_vec(collection).map_err(StorageError::Serialize)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|source| StorageError::Write {
                        path: self.path.clone(),
                        source,
                    })?;
            }
        }

        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| StorageError::Write {
                path: self.path.clone(),
                source,
            })
    }

    /// Remove the persisted file if present.
    pub async fn clear(&self) -> Result<(), StorageError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasksync_engine::{Task, TaskDraft};
    use uuid::Uuid;

    fn temp_store() -> TaskStore {
        let path = std::env::temp_dir().join(format!("tasksync-store-{}.json", Uuid::new_v4()));
        TaskStore::new(path)
    }

    fn sample_collection() -> TaskCollection {
        let mut collection = TaskCollection::new();
        collection
            .insert(Task::from_draft(
                TaskDraft::new("Persisted").date("2024-01-01"),
                "local-1",
                "t0",
            ))
            .unwrap();
        collection
    }

    #[tokio::test]
    async fn load_missing_file_is_empty() {
        let store = temp_store();
        let collection = store.load().await.unwrap();
        assert!(collection.is_empty());
    }

    #[tokio::test]
    async fn save_load_roundtrip() {
        let store = temp_store();
        let collection = sample_collection();

        store.save(&collection).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded, collection);
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let store = temp_store();
        tokio::fs::write(store.path(), b"{not json").await.unwrap();

        let result = store.load().await;
        assert!(matches!(result, Err(StorageError::Corrupt { .. })));
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let store = temp_store();
        store.save(&sample_collection()).await.unwrap();

        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert!(store.load().await.unwrap().is_empty());
    }
}
