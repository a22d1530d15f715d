//! The reconciliation service: optimistic local mutations with remote replay.
//!
//! Every mutation is applied to the in-memory collection and persisted
//! before any network traffic, so the caller always gets its result
//! immediately. Remote calls trail behind: a failure keeps the record
//! pending for a later sync pass, it never surfaces to the caller.
//!
//! All mutations funnel through one collection lock, so back-to-back
//! mutations cannot lose each other's writes. Remote calls run with the
//! lock released; a per-record in-flight guard prevents two concurrent
//! calls for the same record.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::remote::{HttpRemoteClient, RemoteApi};
use crate::storage::TaskStore;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tasksync_engine::{
    merge_remote, Backup, PendingAction, Task, TaskCollection, TaskDraft, TaskId, TaskPatch,
    Timestamp,
};
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

/// Snapshot of the sync machinery for UI indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub is_online: bool,
    pub pending_changes: usize,
    pub syncing: bool,
}

/// Outcome of one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Records whose pending operation was acknowledged by the remote
    pub synced: usize,
    /// Records still pending after a failed attempt
    pub failed: usize,
    /// Records purged locally without a remote call
    pub purged: usize,
}

/// What a single remote replay attempt did.
enum PushOutcome {
    Synced,
    Purged,
    Failed,
    Skipped,
}

/// Removes the in-flight marker when the remote call resolves.
struct InFlight<'a> {
    map: &'a DashMap<TaskId, ()>,
    local_id: TaskId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.local_id);
    }
}

/// The offline-first task service.
///
/// Owns the single authoritative in-memory collection; the UI reads and
/// mutates tasks only through this type.
pub struct TaskService<R> {
    remote: R,
    store: TaskStore,
    connectivity: watch::Receiver<bool>,
    tasks: Mutex<TaskCollection>,
    in_flight: DashMap<TaskId, ()>,
    syncing: AtomicBool,
}

impl TaskService<HttpRemoteClient> {
    /// Build a service wired to the real HTTP API from configuration.
    pub fn from_config(config: &Config, connectivity: watch::Receiver<bool>) -> Result<Self> {
        let remote = HttpRemoteClient::from_config(config)?;
        let store = TaskStore::new(config.storage_path.clone());
        Ok(Self::new(remote, store, connectivity))
    }
}

impl<R: RemoteApi> TaskService<R> {
    pub fn new(remote: R, store: TaskStore, connectivity: watch::Receiver<bool>) -> Self {
        Self {
            remote,
            store,
            connectivity,
            tasks: Mutex::new(TaskCollection::new()),
            in_flight: DashMap::new(),
            syncing: AtomicBool::new(false),
        }
    }

    pub fn is_online(&self) -> bool {
        *self.connectivity.borrow()
    }

    fn now() -> Timestamp {
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn new_local_id() -> TaskId {
        Uuid::new_v4().to_string()
    }

    /// Claim the in-flight slot for a record, or back off if a remote
    /// call for it is already running.
    fn begin_flight(&self, local_id: &str) -> Option<InFlight<'_>> {
        match self.in_flight.entry(local_id.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => {
                entry.insert(());
                Some(InFlight {
                    map: &self.in_flight,
                    local_id: local_id.to_string(),
                })
            }
        }
    }

    /// Load the persisted collection and, when online, refresh it from
    /// the remote. Returns the visible tasks.
    ///
    /// A load failure degrades to an empty collection so the app stays
    /// usable offline; a remote fetch failure degrades to local data.
    pub async fn load_and_merge(&self) -> Result<Vec<Task>> {
        let loaded = match self.store.load().await {
            Ok(collection) => collection,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load local tasks, starting empty");
                TaskCollection::new()
            }
        };

        let fetched = if self.is_online() {
            match self.remote.fetch_all().await {
                Ok(remote_tasks) => Some(remote_tasks),
                Err(e) => {
                    tracing::warn!(error = %e, "remote fetch failed, using local data");
                    None
                }
            }
        } else {
            None
        };

        let mut tasks = self.tasks.lock().await;
        *tasks = loaded;

        if let Some(remote_tasks) = fetched {
            let summary = merge_remote(&mut tasks, remote_tasks);
            tracing::debug!(
                added = summary.added,
                updated = summary.updated,
                removed = summary.removed,
                kept_pending = summary.kept_pending,
                "merged remote tasks"
            );
            if !summary.is_noop() {
                self.store.save(&tasks).await?;
            }
        }

        Ok(tasks.visible().cloned().collect())
    }

    /// Create a task. Applied locally at once; submitted to the remote
    /// when online, with failures leaving the record pending.
    pub async fn create_task(&self, draft: TaskDraft) -> Result<Task> {
        draft.validate()?;
        let task = Task::from_draft(draft, Self::new_local_id(), Self::now());
        let local_id = task.local_id.clone();

        {
            let mut tasks = self.tasks.lock().await;
            tasks.insert(task.clone())?;
            self.store.save(&tasks).await?;
        }
        tracing::debug!(%local_id, "task created locally");

        if self.is_online() {
            self.push_create(&local_id).await?;
        }

        let tasks = self.tasks.lock().await;
        Ok(tasks.get(&local_id).cloned().unwrap_or(task))
    }

    /// Apply a partial edit. Fails with a not-found error for unknown
    /// (or already deleted) records.
    pub async fn update_task(&self, local_id: &str, patch: TaskPatch) -> Result<Task> {
        let updated = {
            let mut tasks = self.tasks.lock().await;
            let Some(task) = tasks.get_mut(local_id).filter(|t| t.is_visible()) else {
                return Err(tasksync_engine::Error::TaskNotFound(local_id.to_string()).into());
            };
            task.apply_patch(patch, Self::now());
            let snapshot = task.clone();
            self.store.save(&tasks).await?;
            snapshot
        };
        tracing::debug!(%local_id, "task updated locally");

        if self.is_online() {
            match updated.pending_action {
                Some(PendingAction::Create) => {
                    self.push_create(local_id).await?;
                }
                Some(PendingAction::Update) => {
                    self.push_update(local_id).await?;
                }
                _ => {}
            }
        }

        let tasks = self.tasks.lock().await;
        Ok(tasks.get(local_id).cloned().unwrap_or(updated))
    }

    /// Flip a task's completion state.
    pub async fn toggle_completed(&self, local_id: &str) -> Result<Task> {
        let completed = {
            let tasks = self.tasks.lock().await;
            let Some(task) = tasks.get(local_id).filter(|t| t.is_visible()) else {
                return Err(tasksync_engine::Error::TaskNotFound(local_id.to_string()).into());
            };
            !task.completed
        };
        self.update_task(local_id, TaskPatch::default().completed(completed))
            .await
    }

    /// Delete a task. A record the remote never saw is purged at once;
    /// anything else leaves a hidden tombstone until the remote delete
    /// succeeds.
    pub async fn delete_task(&self, local_id: &str) -> Result<()> {
        {
            let mut tasks = self.tasks.lock().await;
            let Some(task) = tasks.get_mut(local_id).filter(|t| t.is_visible()) else {
                return Err(tasksync_engine::Error::TaskNotFound(local_id.to_string()).into());
            };

            if task.never_synced() && !self.in_flight.contains_key(local_id) {
                tasks.remove(local_id);
                self.store.save(&tasks).await?;
                tracing::debug!(%local_id, "never-synced task purged");
                return Ok(());
            }

            // A create may still be in flight; once it resolves the
            // record has a remote id and the delete can be replayed.
            task.mark_deleted(Self::now());
            self.store.save(&tasks).await?;
        }
        tracing::debug!(%local_id, "task flagged for remote deletion");

        if self.is_online() {
            self.push_delete(local_id).await?;
        }
        Ok(())
    }

    /// Number of records with an outstanding remote operation.
    pub async fn count_pending(&self) -> usize {
        self.tasks.lock().await.pending_count()
    }

    /// The records presentable to the user.
    pub async fn visible_tasks(&self) -> Vec<Task> {
        self.tasks.lock().await.visible().cloned().collect()
    }

    /// Snapshot of the whole collection, hidden records included.
    pub async fn collection(&self) -> TaskCollection {
        self.tasks.lock().await.clone()
    }

    /// Current sync indicators for the UI.
    pub async fn status(&self) -> SyncStatus {
        SyncStatus {
            is_online: self.is_online(),
            pending_changes: self.count_pending().await,
            syncing: self.syncing.load(Ordering::SeqCst),
        }
    }

    /// Replay every pending record against the remote: one attempt per
    /// record per pass, one record's failure never blocks the others.
    ///
    /// Triggered by manual refresh and by the reconnect watcher.
    pub async fn sync_pending_records(&self) -> Result<SyncReport> {
        if !self.is_online() {
            tracing::debug!("sync requested while offline, skipping");
            return Ok(SyncReport::default());
        }
        if self.syncing.swap(true, Ordering::SeqCst) {
            tracing::debug!("sync pass already running");
            return Ok(SyncReport::default());
        }

        let result = self.run_sync_pass().await;
        self.syncing.store(false, Ordering::SeqCst);
        result
    }

    async fn run_sync_pass(&self) -> Result<SyncReport> {
        let pending: Vec<(TaskId, PendingAction)> = {
            let tasks = self.tasks.lock().await;
            tasks
                .iter()
                .filter_map(|t| t.pending_action.map(|action| (t.local_id.clone(), action)))
                .collect()
        };
        tracing::debug!(count = pending.len(), "starting sync pass");

        let mut report = SyncReport::default();
        for (local_id, action) in pending {
            let outcome = match action {
                PendingAction::Create => self.push_create(&local_id).await?,
                PendingAction::Update => self.push_update(&local_id).await?,
                PendingAction::Delete => self.push_delete(&local_id).await?,
            };
            match outcome {
                PushOutcome::Synced => report.synced += 1,
                PushOutcome::Purged => report.purged += 1,
                PushOutcome::Failed => report.failed += 1,
                PushOutcome::Skipped => {}
            }
        }

        tracing::info!(
            synced = report.synced,
            failed = report.failed,
            purged = report.purged,
            "sync pass finished"
        );
        Ok(report)
    }

    /// Export the whole collection as a backup document.
    pub async fn export_tasks(&self) -> Result<String> {
        let tasks = self.tasks.lock().await;
        let backup = Backup::from_collection(&tasks, Self::now());
        Ok(backup.to_json()?)
    }

    /// Replace the collection with a previously exported backup.
    /// Returns the number of imported records.
    pub async fn import_tasks(&self, json: &str) -> Result<usize> {
        let backup = Backup::from_json(json)?;
        let mut tasks = self.tasks.lock().await;
        *tasks = backup.into_collection();
        self.store.save(&tasks).await?;
        Ok(tasks.total_len())
    }

    /// Remove every record, locally and from disk.
    pub async fn clear_all(&self) -> Result<()> {
        let mut tasks = self.tasks.lock().await;
        *tasks = TaskCollection::new();
        self.store.clear().await?;
        Ok(())
    }

    async fn push_create(&self, local_id: &str) -> Result<PushOutcome> {
        let Some(_guard) = self.begin_flight(local_id) else {
            return Ok(PushOutcome::Skipped);
        };

        let (payload, sent_updated_at) = {
            let tasks = self.tasks.lock().await;
            match tasks.get(local_id) {
                Some(task) if task.pending_action == Some(PendingAction::Create) => {
                    (task.payload(), task.updated_at.clone())
                }
                _ => return Ok(PushOutcome::Skipped),
            }
        };

        match self.remote.create(&payload).await {
            Ok(created) => {
                let mut tasks = self.tasks.lock().await;
                if let Some(task) = tasks.get_mut(local_id) {
                    task.remote_id = Some(created.id);
                    if task.pending_action == Some(PendingAction::Create) {
                        if task.updated_at == sent_updated_at {
                            task.mark_synced(None);
                        } else {
                            // edited while the create was in flight; the
                            // newer content still has to reach the server
                            task.pending_action = Some(PendingAction::Update);
                        }
                    }
                }
                self.store.save(&tasks).await?;
                tracing::debug!(%local_id, "remote create acknowledged");
                Ok(PushOutcome::Synced)
            }
            Err(e) => {
                tracing::warn!(%local_id, error = %e, "remote create failed, record stays pending");
                Ok(PushOutcome::Failed)
            }
        }
    }

    async fn push_update(&self, local_id: &str) -> Result<PushOutcome> {
        let Some(_guard) = self.begin_flight(local_id) else {
            return Ok(PushOutcome::Skipped);
        };

        let (remote_id, payload, sent_updated_at) = {
            let tasks = self.tasks.lock().await;
            match tasks.get(local_id) {
                Some(task) if task.pending_action == Some(PendingAction::Update) => {
                    match &task.remote_id {
                        Some(remote_id) => {
                            (remote_id.clone(), task.payload(), task.updated_at.clone())
                        }
                        None => return Ok(PushOutcome::Skipped),
                    }
                }
                _ => return Ok(PushOutcome::Skipped),
            }
        };

        match self.remote.update(&remote_id, &payload).await {
            Ok(_) => {
                let mut tasks = self.tasks.lock().await;
                if let Some(task) = tasks.get_mut(local_id) {
                    if task.pending_action == Some(PendingAction::Update)
                        && task.updated_at == sent_updated_at
                    {
                        task.mark_synced(None);
                    }
                }
                self.store.save(&tasks).await?;
                tracing::debug!(%local_id, "remote update acknowledged");
                Ok(PushOutcome::Synced)
            }
            Err(e) => {
                tracing::warn!(%local_id, error = %e, "remote update failed, record stays pending");
                Ok(PushOutcome::Failed)
            }
        }
    }

    async fn push_delete(&self, local_id: &str) -> Result<PushOutcome> {
        let Some(_guard) = self.begin_flight(local_id) else {
            return Ok(PushOutcome::Skipped);
        };

        let remote_id = {
            let tasks = self.tasks.lock().await;
            match tasks.get(local_id) {
                Some(task) if task.pending_action == Some(PendingAction::Delete) => {
                    task.remote_id.clone()
                }
                _ => return Ok(PushOutcome::Skipped),
            }
        };

        let Some(remote_id) = remote_id else {
            // The create never reached the server, so there is nothing
            // to delete remotely.
            let mut tasks = self.tasks.lock().await;
            tasks.remove(local_id);
            self.store.save(&tasks).await?;
            tracing::debug!(%local_id, "unsynced tombstone purged");
            return Ok(PushOutcome::Purged);
        };

        match self.remote.delete(&remote_id).await {
            Ok(()) => {
                let mut tasks = self.tasks.lock().await;
                tasks.remove(local_id);
                self.store.save(&tasks).await?;
                tracing::debug!(%local_id, "remote delete acknowledged");
                Ok(PushOutcome::Synced)
            }
            Err(e) => {
                tracing::warn!(%local_id, error = %e, "remote delete failed, record stays pending");
                Ok(PushOutcome::Failed)
            }
        }
    }
}
