//! Online/offline state for gating remote operations.
//!
//! The service only consumes the current boolean and the offline-to-online
//! edge; how the state is detected (polling, OS signal) is wired by the
//! embedding application through [`ConnectivityObserver::set_online`].

use crate::remote::RemoteApi;
use crate::service::TaskService;
use std::sync::Arc;
use tokio::sync::watch;

/// Observes connectivity and broadcasts transitions.
#[derive(Debug)]
pub struct ConnectivityObserver {
    sender: watch::Sender<bool>,
}

impl ConnectivityObserver {
    /// Start in the given state.
    pub fn new(online: bool) -> Self {
        let (sender, _) = watch::channel(online);
        Self { sender }
    }

    /// Current state.
    pub fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    /// Record a connectivity change. No-op when the state is unchanged,
    /// so subscribers only ever see real transitions.
    pub fn set_online(&self, online: bool) {
        self.sender.send_if_modified(|state| {
            if *state == online {
                false
            } else {
                *state = online;
                true
            }
        });
    }

    /// Subscribe to transitions.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

impl Default for ConnectivityObserver {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Drive a sync pass on every offline-to-online transition.
///
/// Runs until every [`ConnectivityObserver`] handle feeding the receiver
/// is dropped. Spawn it next to the service:
///
/// ```ignore
/// tokio::spawn(run_sync_on_reconnect(service.clone(), observer.subscribe()));
/// ```
pub async fn run_sync_on_reconnect<R>(service: Arc<TaskService<R>>, mut rx: watch::Receiver<bool>)
where
    R: RemoteApi,
{
    let mut was_online = *rx.borrow();
    while rx.changed().await.is_ok() {
        let online = *rx.borrow_and_update();
        if online && !was_online {
            tracing::info!("connectivity restored, replaying pending records");
            match service.sync_pending_records().await {
                Ok(report) => tracing::debug!(
                    synced = report.synced,
                    failed = report.failed,
                    purged = report.purged,
                    "reconnect sync pass finished"
                ),
                Err(e) => tracing::error!(error = %e, "reconnect sync pass failed"),
            }
        }
        was_online = online;
    }
}
