//! Task record types and per-record sync state transitions.

use crate::{error::Result, Error, RemoteId, TaskId, Timestamp};
use serde::{Deserialize, Serialize};

/// The outstanding operation that must be replayed against the remote
/// when connectivity allows. Absent once the record is synced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingAction {
    Create,
    Update,
    Delete,
}

/// A task record.
///
/// The persisted shape is this struct exactly (camelCase keys, optional
/// fields omitted), so stored state reloads without transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Client-generated identifier, assigned at creation, immutable
    pub local_id: TaskId,
    /// Server-assigned identifier, present once a create was acknowledged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<RemoteId>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_members: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Calendar date, `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Wall-clock start, `HH:MM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// Wall-clock end, `HH:MM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub completed: bool,
    pub created_at: Timestamp,
    /// Refreshed on every local mutation
    pub updated_at: Timestamp,
    /// True iff local content matches the last successful remote write/read
    pub synced: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_action: Option<PendingAction>,
}

/// Input for creating a task. Only the title is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub team_members: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

impl TaskDraft {
    /// Create a draft with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn team_members(mut self, team_members: impl Into<String>) -> Self {
        self.team_members = Some(team_members.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn start_time(mut self, start_time: impl Into<String>) -> Self {
        self.start_time = Some(start_time.into());
        self
    }

    pub fn end_time(mut self, end_time: impl Into<String>) -> Self {
        self.end_time = Some(end_time.into());
        self
    }

    /// Validate the draft before a task is built from it.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::EmptyTitle);
        }
        Ok(())
    }
}

/// A partial edit. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_members: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn team_members(mut self, team_members: impl Into<String>) -> Self {
        self.team_members = Some(team_members.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn start_time(mut self, start_time: impl Into<String>) -> Self {
        self.start_time = Some(start_time.into());
        self
    }

    pub fn end_time(mut self, end_time: impl Into<String>) -> Self {
        self.end_time = Some(end_time.into());
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.team_members.is_none()
            && self.category.is_none()
            && self.date.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.completed.is_none()
    }
}

/// Wire shape of a task record as returned by the remote API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTask {
    /// Server-assigned identifier
    #[serde(alias = "_id")]
    pub id: RemoteId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_members: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Wire shape sent to the remote API on create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_members: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    pub completed: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Task {
    /// Build a new local task from a draft. The record starts life
    /// unsynced with a pending create.
    pub fn from_draft(
        draft: TaskDraft,
        local_id: impl Into<TaskId>,
        now: impl Into<Timestamp>,
    ) -> Self {
        let now = now.into();
        Self {
            local_id: local_id.into(),
            remote_id: None,
            title: draft.title.trim().to_string(),
            description: draft.description,
            team_members: draft.team_members,
            category: draft.category,
            date: draft.date,
            start_time: draft.start_time,
            end_time: draft.end_time,
            completed: draft.completed,
            created_at: now.clone(),
            updated_at: now,
            synced: false,
            pending_action: Some(PendingAction::Create),
        }
    }

    /// Adopt a record the server knows and this client has never seen.
    /// The remote id doubles as the local id so the merge stays
    /// deterministic.
    pub fn from_remote(remote: RemoteTask) -> Self {
        Self {
            local_id: remote.id.clone(),
            remote_id: Some(remote.id),
            title: remote.title,
            description: remote.description,
            team_members: remote.team_members,
            category: remote.category,
            date: remote.date,
            start_time: remote.start_time,
            end_time: remote.end_time,
            completed: remote.completed,
            created_at: remote.created_at,
            updated_at: remote.updated_at,
            synced: true,
            pending_action: None,
        }
    }

    /// Overwrite content from an authoritative remote read. Keeps
    /// `local_id` and `created_at`.
    pub fn adopt_remote(&mut self, remote: RemoteTask) {
        self.remote_id = Some(remote.id);
        self.title = remote.title;
        self.description = remote.description;
        self.team_members = remote.team_members;
        self.category = remote.category;
        self.date = remote.date;
        self.start_time = remote.start_time;
        self.end_time = remote.end_time;
        self.completed = remote.completed;
        self.updated_at = remote.updated_at;
        self.synced = true;
        self.pending_action = None;
    }

    /// True when the record content matches a remote copy field for field.
    pub fn content_matches(&self, remote: &RemoteTask) -> bool {
        self.remote_id.as_deref() == Some(remote.id.as_str())
            && self.title == remote.title
            && self.description == remote.description
            && self.team_members == remote.team_members
            && self.category == remote.category
            && self.date == remote.date
            && self.start_time == remote.start_time
            && self.end_time == remote.end_time
            && self.completed == remote.completed
            && self.updated_at == remote.updated_at
    }

    /// Apply a partial edit. A record the remote has never seen stays
    /// pending create; anything else degrades to pending update.
    pub fn apply_patch(&mut self, patch: TaskPatch, now: impl Into<Timestamp>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(team_members) = patch.team_members {
            self.team_members = Some(team_members);
        }
        if let Some(category) = patch.category {
            self.category = Some(category);
        }
        if let Some(date) = patch.date {
            self.date = Some(date);
        }
        if let Some(start_time) = patch.start_time {
            self.start_time = Some(start_time);
        }
        if let Some(end_time) = patch.end_time {
            self.end_time = Some(end_time);
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        self.updated_at = now.into();
        self.synced = false;
        self.pending_action = match self.pending_action {
            Some(PendingAction::Create) => Some(PendingAction::Create),
            _ => Some(PendingAction::Update),
        };
    }

    /// Flag the record for remote deletion. It stays in the collection
    /// (hidden from views) until the remote delete succeeds.
    pub fn mark_deleted(&mut self, now: impl Into<Timestamp>) {
        self.updated_at = now.into();
        self.synced = false;
        self.pending_action = Some(PendingAction::Delete);
    }

    /// Record a successful remote write.
    pub fn mark_synced(&mut self, remote_id: Option<RemoteId>) {
        if let Some(id) = remote_id {
            self.remote_id = Some(id);
        }
        self.synced = true;
        self.pending_action = None;
    }

    /// True when an operation is waiting to be replayed against the remote.
    pub fn is_pending(&self) -> bool {
        self.pending_action.is_some()
    }

    /// Visible records are everything except pending deletes.
    pub fn is_visible(&self) -> bool {
        self.pending_action != Some(PendingAction::Delete)
    }

    /// True when no create for this record has ever been acknowledged.
    pub fn never_synced(&self) -> bool {
        self.remote_id.is_none()
    }

    /// Wire payload for create and update calls.
    pub fn payload(&self) -> TaskPayload {
        TaskPayload {
            title: self.title.clone(),
            description: self.description.clone(),
            team_members: self.team_members.clone(),
            category: self.category.clone(),
            date: self.date.clone(),
            start_time: self.start_time.clone(),
            end_time: self.end_time.clone(),
            completed: self.completed,
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}
