//! # Tasksync Engine
//!
//! The deterministic core of an offline-first task manager.
//!
//! This crate owns the task record model, the per-record sync state
//! machine, the local/remote merge, and the pure query layer. It has no
//! knowledge of files, the network, clocks or id generators - timestamps
//! and identifiers are always supplied by the caller, so the same inputs
//! always produce the same outputs and tests need no mocks.
//!
//! ## Core concepts
//!
//! ### Records
//!
//! A [`Task`] carries a client-generated `local_id`, an optional
//! server-assigned `remote_id`, the user-visible content fields, and its
//! sync state: a `synced` flag plus an optional [`PendingAction`]
//! (`create`, `update` or `delete`) describing the operation that still
//! has to be replayed against the remote.
//!
//! ### Collection
//!
//! The [`TaskCollection`] is the single authoritative copy of every
//! record, including pending deletes that are hidden from views but must
//! survive until the remote delete resolves. It serializes as a plain
//! array, which is exactly what the local store persists.
//!
//! ### Merge
//!
//! [`merge_remote`] reconciles an authoritative remote read into the
//! local collection: the remote wins for cleanly synced records, local
//! pending edits are never clobbered, unknown remote records are
//! inserted, and records the server dropped are removed unless something
//! is still pending on them.
//!
//! ### Queries
//!
//! The [`query`] module derives filtered, sorted, searched views and
//! completion statistics without ever mutating the collection.
//!
//! ## Persistence
//!
//! The collection serializes directly; [`Backup`] adds a versioned
//! whole-collection export (`{formatVersion, exportDate, tasks}`) that
//! round-trips losslessly.

pub mod collection;
pub mod error;
pub mod merge;
pub mod query;
pub mod snapshot;
pub mod task;

// Re-export main types at crate root
pub use collection::TaskCollection;
pub use error::Error;
pub use merge::{merge_remote, MergeSummary};
pub use query::{
    category_stats, filter_by_category, filter_by_date, filter_by_search, sort_tasks, stats,
    CategoryStats, SortField, SortOrder, TaskQuery, TaskStats, ALL_CATEGORIES, DEFAULT_CATEGORY,
};
pub use snapshot::{Backup, BACKUP_FORMAT_VERSION};
pub use task::{PendingAction, RemoteTask, Task, TaskDraft, TaskPatch, TaskPayload};

/// Type aliases for clarity
pub type TaskId = String;
pub type RemoteId = String;
pub type Timestamp = String;
