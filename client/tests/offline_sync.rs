//! End-to-end tests for the offline-first service.
//!
//! A scripted in-memory remote stands in for the HTTP API, so every
//! connectivity scenario is deterministic: no sockets, no timers.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tasksync_client::{
    run_sync_on_reconnect, ConnectivityObserver, NetworkError, RemoteApi, TaskService, TaskStore,
};
use tasksync_engine::{PendingAction, RemoteTask, TaskDraft, TaskPatch, TaskPayload};
use uuid::Uuid;

/// In-memory remote with programmable failures.
#[derive(Clone, Default)]
struct MockRemote {
    inner: Arc<MockInner>,
}

#[derive(Default)]
struct MockInner {
    records: Mutex<Vec<RemoteTask>>,
    failing: AtomicBool,
    calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl MockRemote {
    fn new() -> Self {
        Self::default()
    }

    fn seed(&self, record: RemoteTask) {
        self.inner.records.lock().unwrap().push(record);
    }

    fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    fn call_count(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    fn records(&self) -> Vec<RemoteTask> {
        self.inner.records.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), NetworkError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(NetworkError::Status(503));
        }
        Ok(())
    }

    fn record_from(&self, id: String, payload: &TaskPayload) -> RemoteTask {
        RemoteTask {
            id,
            title: payload.title.clone(),
            description: payload.description.clone(),
            team_members: payload.team_members.clone(),
            category: payload.category.clone(),
            date: payload.date.clone(),
            start_time: payload.start_time.clone(),
            end_time: payload.end_time.clone(),
            completed: payload.completed,
            created_at: payload.created_at.clone(),
            updated_at: payload.updated_at.clone(),
        }
    }
}

impl RemoteApi for MockRemote {
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<RemoteTask>, NetworkError>> + Send {
        async move {
            self.check()?;
            Ok(self.records())
        }
    }

    fn create(
        &self,
        payload: &TaskPayload,
    ) -> impl Future<Output = Result<RemoteTask, NetworkError>> + Send {
        let payload = payload.clone();
        async move {
            self.check()?;
            let id = format!("srv-{}", self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1);
            let record = self.record_from(id, &payload);
            self.inner.records.lock().unwrap().push(record.clone());
            Ok(record)
        }
    }

    fn update(
        &self,
        remote_id: &str,
        payload: &TaskPayload,
    ) -> impl Future<Output = Result<RemoteTask, NetworkError>> + Send {
        let remote_id = remote_id.to_string();
        let payload = payload.clone();
        async move {
            self.check()?;
            let mut records = self.inner.records.lock().unwrap();
            let Some(existing) = records.iter_mut().find(|r| r.id == remote_id) else {
                return Err(NetworkError::Status(404));
            };
            *existing = self.record_from(remote_id, &payload);
            Ok(existing.clone())
        }
    }

    fn delete(&self, remote_id: &str) -> impl Future<Output = Result<(), NetworkError>> + Send {
        let remote_id = remote_id.to_string();
        async move {
            self.check()?;
            let mut records = self.inner.records.lock().unwrap();
            let before = records.len();
            records.retain(|r| r.id != remote_id);
            if records.len() == before {
                return Err(NetworkError::Status(404));
            }
            Ok(())
        }
    }
}

fn temp_store() -> TaskStore {
    TaskStore::new(std::env::temp_dir().join(format!("tasksync-e2e-{}.json", Uuid::new_v4())))
}

fn make_service(
    mock: MockRemote,
    online: bool,
) -> (Arc<TaskService<MockRemote>>, ConnectivityObserver) {
    let observer = ConnectivityObserver::new(online);
    let service = Arc::new(TaskService::new(mock, temp_store(), observer.subscribe()));
    (service, observer)
}

fn draft(title: &str) -> TaskDraft {
    TaskDraft::new(title)
        .date("2024-01-01")
        .start_time("09:00")
        .end_time("10:00")
}

#[tokio::test]
async fn offline_create_touches_no_remote() {
    let mock = MockRemote::new();
    let (service, _observer) = make_service(mock.clone(), false);

    let task = service.create_task(draft("A")).await.unwrap();

    assert_eq!(task.pending_action, Some(PendingAction::Create));
    assert!(task.remote_id.is_none());
    assert_eq!(service.count_pending().await, 1);
    assert_eq!(service.visible_tasks().await.len(), 1);
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn offline_mutation_sequence_counts_distinct_records() {
    let mock = MockRemote::new();
    let (service, observer) = make_service(mock.clone(), true);

    // one record synced while online
    let synced = service.create_task(draft("Synced")).await.unwrap();
    assert!(synced.synced);

    observer.set_online(false);

    let a = service.create_task(draft("A")).await.unwrap();
    service
        .update_task(&a.local_id, TaskPatch::default().completed(true))
        .await
        .unwrap();
    service.delete_task(&synced.local_id).await.unwrap();

    // every mutation reflected locally at once
    let visible = service.visible_tasks().await;
    assert_eq!(visible.len(), 1);
    assert!(visible[0].completed);
    // a created+edited record and a deleted record: two distinct pending
    assert_eq!(service.count_pending().await, 2);
    // only the initial online create reached the remote
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn reconnect_sync_acknowledges_offline_create() {
    let mock = MockRemote::new();
    let (service, observer) = make_service(mock.clone(), false);

    let task = service.create_task(draft("A")).await.unwrap();
    assert_eq!(service.count_pending().await, 1);

    observer.set_online(true);
    let report = service.sync_pending_records().await.unwrap();

    assert_eq!(report.synced, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(service.count_pending().await, 0);

    let synced = &service.visible_tasks().await[0];
    assert_eq!(synced.local_id, task.local_id);
    assert_eq!(synced.remote_id.as_deref(), Some("srv-1"));
    assert!(synced.pending_action.is_none());
    assert_eq!(mock.records().len(), 1);
}

#[tokio::test]
async fn online_create_is_synced_immediately() {
    let mock = MockRemote::new();
    let (service, _observer) = make_service(mock.clone(), true);

    let task = service.create_task(draft("A")).await.unwrap();

    assert!(task.synced);
    assert!(task.remote_id.is_some());
    assert_eq!(service.count_pending().await, 0);
    assert_eq!(mock.records().len(), 1);
}

#[tokio::test]
async fn failed_remote_create_keeps_record_pending() {
    let mock = MockRemote::new();
    let (service, _observer) = make_service(mock.clone(), true);
    mock.set_failing(true);

    // the caller still gets its optimistic result
    let task = service.create_task(draft("A")).await.unwrap();
    assert_eq!(task.pending_action, Some(PendingAction::Create));
    assert_eq!(service.count_pending().await, 1);

    // next pass retries and succeeds
    mock.set_failing(false);
    let report = service.sync_pending_records().await.unwrap();
    assert_eq!(report.synced, 1);
    assert_eq!(service.count_pending().await, 0);
    assert_eq!(mock.records().len(), 1);
}

#[tokio::test]
async fn one_failure_does_not_block_other_records() {
    let mock = MockRemote::new();
    let (service, observer) = make_service(mock.clone(), true);

    let doomed = service.create_task(draft("Doomed")).await.unwrap();
    observer.set_online(false);
    service
        .update_task(&doomed.local_id, TaskPatch::default().title("Edited"))
        .await
        .unwrap();
    let fresh = service.create_task(draft("Fresh")).await.unwrap();

    // the server lost the first record, so its pending update will 404
    mock.inner.records.lock().unwrap().clear();

    observer.set_online(true);
    let report = service.sync_pending_records().await.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.synced, 1);
    // the fresh record was acknowledged despite the other failure
    assert!(service
        .visible_tasks()
        .await
        .iter()
        .any(|t| t.local_id == fresh.local_id && t.synced));
}

#[tokio::test]
async fn mutations_on_unknown_records_are_not_found() {
    let (service, _observer) = make_service(MockRemote::new(), false);

    let err = service
        .update_task("ghost", TaskPatch::default().completed(true))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = service.delete_task("ghost").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn deleting_never_synced_record_purges_immediately() {
    let mock = MockRemote::new();
    let (service, _observer) = make_service(mock.clone(), false);

    let task = service.create_task(draft("A")).await.unwrap();
    service.delete_task(&task.local_id).await.unwrap();

    assert_eq!(service.count_pending().await, 0);
    assert_eq!(service.collection().await.total_len(), 0);
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn deleting_synced_record_leaves_hidden_tombstone() {
    let mock = MockRemote::new();
    let (service, observer) = make_service(mock.clone(), true);

    let task = service.create_task(draft("A")).await.unwrap();
    observer.set_online(false);

    service.delete_task(&task.local_id).await.unwrap();

    // hidden from views but still physically stored
    assert!(service.visible_tasks().await.is_empty());
    assert_eq!(service.count_pending().await, 1);
    assert_eq!(service.collection().await.total_len(), 1);
    assert_eq!(mock.records().len(), 1);

    observer.set_online(true);
    let report = service.sync_pending_records().await.unwrap();

    assert_eq!(report.synced, 1);
    assert_eq!(service.collection().await.total_len(), 0);
    assert!(mock.records().is_empty());
}

#[tokio::test]
async fn load_and_merge_pulls_remote_records() {
    let mock = MockRemote::new();
    mock.seed(RemoteTask {
        id: "srv-a".into(),
        title: "From server".into(),
        description: None,
        team_members: None,
        category: None,
        date: Some("2024-01-01".into()),
        start_time: None,
        end_time: None,
        completed: false,
        created_at: "t0".into(),
        updated_at: "t0".into(),
    });
    let (service, _observer) = make_service(mock, true);

    let visible = service.load_and_merge().await.unwrap();

    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].title, "From server");
    assert!(visible[0].synced);
}

#[tokio::test]
async fn merge_never_clobbers_pending_local_edit() {
    let mock = MockRemote::new();
    let (service, observer) = make_service(mock.clone(), true);

    let task = service.create_task(draft("Original")).await.unwrap();

    observer.set_online(false);
    service
        .update_task(&task.local_id, TaskPatch::default().title("Local edit"))
        .await
        .unwrap();

    // the server copy drifts in the meantime
    {
        let mut records = mock.inner.records.lock().unwrap();
        records[0].title = "Server edit".into();
        records[0].updated_at = "t99".into();
    }

    observer.set_online(true);
    service.load_and_merge().await.unwrap();

    let visible = service.visible_tasks().await;
    assert_eq!(visible[0].title, "Local edit");
    assert_eq!(visible[0].pending_action, Some(PendingAction::Update));

    // replaying the pending update pushes the local content to the server
    service.sync_pending_records().await.unwrap();
    assert_eq!(mock.records()[0].title, "Local edit");
    assert_eq!(service.count_pending().await, 0);
}

#[tokio::test]
async fn fetch_failure_degrades_to_local_data() {
    let mock = MockRemote::new();
    let (service, _observer) = make_service(mock.clone(), true);

    let task = service.create_task(draft("A")).await.unwrap();
    mock.set_failing(true);

    let visible = service.load_and_merge().await.unwrap();

    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].local_id, task.local_id);
}

#[tokio::test]
async fn export_import_roundtrip() {
    let mock = MockRemote::new();
    let (service, observer) = make_service(mock, true);

    service.create_task(draft("A")).await.unwrap();
    observer.set_online(false);
    service.create_task(draft("B")).await.unwrap();
    let before = service.collection().await;

    let exported = service.export_tasks().await.unwrap();
    service.clear_all().await.unwrap();
    assert!(service.visible_tasks().await.is_empty());

    let imported = service.import_tasks(&exported).await.unwrap();

    assert_eq!(imported, 2);
    assert_eq!(service.collection().await, before);
}

#[tokio::test]
async fn collection_survives_service_restart() {
    let store = temp_store();
    let observer = ConnectivityObserver::new(false);

    let service = TaskService::new(MockRemote::new(), store.clone(), observer.subscribe());
    let task = service.create_task(draft("A")).await.unwrap();
    drop(service);

    let revived = TaskService::new(MockRemote::new(), store, observer.subscribe());
    let visible = revived.load_and_merge().await.unwrap();

    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].local_id, task.local_id);
    assert_eq!(visible[0].pending_action, Some(PendingAction::Create));
}

#[tokio::test]
async fn reconnect_watcher_drains_pending_records() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let mock = MockRemote::new();
    let (service, observer) = make_service(mock.clone(), false);

    service.create_task(draft("A")).await.unwrap();
    assert_eq!(service.count_pending().await, 1);

    let watcher = tokio::spawn(run_sync_on_reconnect(service.clone(), observer.subscribe()));
    observer.set_online(true);

    tokio::time::timeout(Duration::from_secs(2), async {
        while service.count_pending().await > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("pending records were not drained after reconnect");

    assert_eq!(mock.records().len(), 1);
    watcher.abort();
}

#[tokio::test]
async fn offline_sync_request_is_a_noop() {
    let mock = MockRemote::new();
    let (service, _observer) = make_service(mock.clone(), false);

    service.create_task(draft("A")).await.unwrap();
    let report = service.sync_pending_records().await.unwrap();

    assert_eq!(report, Default::default());
    assert_eq!(mock.call_count(), 0);
    assert_eq!(service.count_pending().await, 1);
}

#[tokio::test]
async fn status_reflects_connectivity_and_pending() {
    let mock = MockRemote::new();
    let (service, observer) = make_service(mock, false);

    service.create_task(draft("A")).await.unwrap();
    let status = service.status().await;
    assert!(!status.is_online);
    assert_eq!(status.pending_changes, 1);
    assert!(!status.syncing);

    observer.set_online(true);
    assert!(service.status().await.is_online);
}
