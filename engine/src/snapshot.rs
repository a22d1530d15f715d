//! Whole-collection backup for export and restore.
//!
//! The backup is a plain JSON document designed to round-trip losslessly:
//! importing what was exported reproduces the collection exactly,
//! including hidden pending-delete records and their sync state.

use crate::{error::Result, Error, Task, TaskCollection, Timestamp};
use serde::{Deserialize, Serialize};

/// Version of the backup format for future compatibility.
pub const BACKUP_FORMAT_VERSION: u32 = 1;

fn default_format_version() -> u32 {
    BACKUP_FORMAT_VERSION
}

/// A point-in-time export of the whole task collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    /// Backup format version; absent in older exports, treated as 1
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    /// When the export was taken
    pub export_date: Timestamp,
    /// Every record, including hidden pending deletes
    pub tasks: Vec<Task>,
}

impl Backup {
    /// Create a backup of the given records.
    pub fn new(tasks: Vec<Task>, export_date: impl Into<Timestamp>) -> Self {
        Self {
            format_version: BACKUP_FORMAT_VERSION,
            export_date: export_date.into(),
            tasks,
        }
    }

    /// Export a collection.
    pub fn from_collection(collection: &TaskCollection, export_date: impl Into<Timestamp>) -> Self {
        Self::new(collection.tasks().to_vec(), export_date)
    }

    /// Restore the exported collection.
    pub fn into_collection(self) -> TaskCollection {
        TaskCollection::from_tasks(self.tasks)
    }

    /// Number of records in the backup.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidBackup(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidBackup(e.to_string()))
    }

    /// Deserialize from JSON, rejecting backups from a newer format.
    pub fn from_json(json: &str) -> Result<Self> {
        let backup: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidBackup(e.to_string()))?;

        if backup.format_version > BACKUP_FORMAT_VERSION {
            return Err(Error::InvalidBackup(format!(
                "unsupported backup format version: {} (max supported: {})",
                backup.format_version, BACKUP_FORMAT_VERSION
            )));
        }

        Ok(backup)
    }
}
