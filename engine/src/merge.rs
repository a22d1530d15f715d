//! Local/remote reconciliation.
//!
//! Merges an authoritative remote read into the local collection. This
//! system has no version field or vector clock: the whole policy is that
//! the remote wins for cleanly synced records and local pending edits are
//! never clobbered by a stale read.

use crate::{RemoteTask, Task, TaskCollection};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Counters describing what a merge pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSummary {
    /// Remote records inserted as new synced tasks
    pub added: usize,
    /// Synced local records overwritten with newer remote content
    pub updated: usize,
    /// Synced local records already matching the remote, left untouched
    pub unchanged: usize,
    /// Local pending records kept verbatim
    pub kept_pending: usize,
    /// Local records removed because the server no longer has them
    pub removed: usize,
}

impl MergeSummary {
    /// True when the merge changed nothing in the local collection.
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.removed == 0
    }
}

/// Merge a remote read into the local collection, by `remote_id` identity.
///
/// - synced local counterpart: remote content overwrites it, unless the
///   content already matches (no `updatedAt` churn)
/// - pending local counterpart: local kept verbatim
/// - no local counterpart: inserted as a new synced record
/// - local record the remote no longer has: removed if cleanly synced
///   (server-side delete), kept if anything is pending on it
pub fn merge_remote(local: &mut TaskCollection, remote: Vec<RemoteTask>) -> MergeSummary {
    let mut summary = MergeSummary::default();

    let remote_ids: HashSet<&str> = remote.iter().map(|r| r.id.as_str()).collect();

    local.retain(|task| match task.remote_id.as_deref() {
        Some(id) if remote_ids.contains(id) => true,
        _ if task.is_pending() => {
            // Not on the server yet (or a delete the server must still see).
            summary.kept_pending += 1;
            true
        }
        _ => {
            summary.removed += 1;
            false
        }
    });

    for remote_task in remote {
        match local.find_by_remote_id_mut(&remote_task.id) {
            Some(task) if task.is_pending() => {
                summary.kept_pending += 1;
            }
            Some(task) if task.content_matches(&remote_task) => {
                summary.unchanged += 1;
            }
            Some(task) => {
                task.adopt_remote(remote_task);
                summary.updated += 1;
            }
            None => {
                if local.insert(Task::from_remote(remote_task)).is_ok() {
                    summary.added += 1;
                }
            }
        }
    }

    summary
}
