//! Pool coordination client
//!
//! Polls the pool endpoint on a fixed cadence for visibility into which
//! upstream decoding instances are reserved, exposes the advisory release
//! action, and projects instances into display rows with lock countdowns.
//!
//! The pool itself is owned and mutated by the external pool-management
//! service; this client only reads snapshots and requests releases.

use std::sync::Arc;
use std::time::Duration;

use poolcast_api::{ApiClient, PoolSnapshot};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Format a lock countdown as `mm:ss`. Defined for non-negative inputs.
pub fn format_countdown(total_seconds: u64) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Reservation state of one instance, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceState {
    Available,
    Locked { countdown: String },
}

/// Display projection of one pool instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolRow {
    /// 1-based position in the polled list.
    pub ordinal: usize,
    pub instance_id: String,
    pub content_id: Option<String>,
    pub healthy: bool,
    pub state: InstanceState,
}

impl PoolRow {
    pub fn label(&self) -> String {
        match &self.state {
            InstanceState::Available => "Available".to_string(),
            InstanceState::Locked { countdown } => format!("Locked for {countdown}"),
        }
    }

    /// Whether a release action makes sense for this row.
    pub fn can_release(&self) -> bool {
        matches!(self.state, InstanceState::Locked { .. })
    }
}

/// Project a snapshot into display rows.
pub fn project_rows(snapshot: &PoolSnapshot) -> Vec<PoolRow> {
    snapshot
        .iter()
        .enumerate()
        .map(|(index, instance)| PoolRow {
            ordinal: index + 1,
            instance_id: instance.instance_id.clone(),
            content_id: instance.loaded_content().map(str::to_string),
            healthy: instance.healthy,
            state: if instance.locked_in {
                InstanceState::Locked {
                    countdown: format_countdown(instance.time_until_unlock),
                }
            } else {
                InstanceState::Available
            },
        })
        .collect()
}

/// Handle for requesting an out-of-cadence pool refresh.
///
/// The playback transport holds one of these: a verified play is evidence
/// the assigned instance is healthy, worth reflecting immediately.
#[derive(Clone, Default)]
pub struct PoolRefreshHandle {
    notify: Arc<Notify>,
}

impl PoolRefreshHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_refresh(&self) {
        self.notify.notify_one();
    }

    /// Wait for the next refresh request.
    pub async fn notified(&self) {
        self.notify.notified().await;
    }
}

struct PoolInner {
    api: ApiClient,
    snapshot_tx: watch::Sender<Option<PoolSnapshot>>,
    refresh: PoolRefreshHandle,
    poll_interval: Duration,
}

/// Periodic pool visibility, owned by whoever needs the data.
///
/// Polls are serialized by the single poll loop: the previous fetch is
/// awaited before the next starts, so a slow response can never overwrite
/// a newer one. Poll failures keep the last-known-good snapshot. The
/// worker is cancelled when the watcher is dropped.
pub struct PoolWatcher {
    inner: Arc<PoolInner>,
    worker: JoinHandle<()>,
}

impl PoolWatcher {
    pub fn spawn(api: ApiClient, poll_interval: Duration) -> Self {
        let (snapshot_tx, _rx) = watch::channel(None);
        let inner = Arc::new(PoolInner {
            api,
            snapshot_tx,
            refresh: PoolRefreshHandle::new(),
            poll_interval,
        });
        let worker = tokio::spawn(run_poll_loop(inner.clone()));
        Self { inner, worker }
    }

    /// Last successfully polled snapshot, if any.
    pub fn snapshot(&self) -> Option<PoolSnapshot> {
        self.inner.snapshot_tx.borrow().clone()
    }

    /// Watch snapshot replacements reactively.
    pub fn watch_snapshot(&self) -> watch::Receiver<Option<PoolSnapshot>> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Display rows for the current snapshot.
    pub fn rows(&self) -> Vec<PoolRow> {
        self.snapshot()
            .map(|snapshot| project_rows(&snapshot))
            .unwrap_or_default()
    }

    /// Request an instance release, then refresh so the UI catches up.
    ///
    /// Idempotent from this client's point of view: releasing an
    /// already-available instance succeeds.
    pub async fn release(&self, instance_id: &str) -> poolcast_api::Result<()> {
        self.inner.api.release_instance(instance_id).await?;
        self.refresh_now();
        Ok(())
    }

    /// Nudge the poll loop to refresh out of cadence.
    pub fn refresh_now(&self) {
        self.inner.refresh.request_refresh();
    }

    /// Handle for other components (e.g. the transport) to nudge
    /// refreshes.
    pub fn refresh_handle(&self) -> PoolRefreshHandle {
        self.inner.refresh.clone()
    }

    /// Run one poll immediately. Returns whether it succeeded.
    pub async fn poll_once(&self) -> bool {
        poll_once(&self.inner).await
    }
}

impl Drop for PoolWatcher {
    fn drop(&mut self) {
        tracing::debug!("pool watcher stopped");
        self.worker.abort();
    }
}

async fn run_poll_loop(inner: Arc<PoolInner>) {
    let mut ticker = tokio::time::interval(inner.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = inner.refresh.notified() => {
                tracing::debug!("out-of-cadence pool refresh requested");
            }
        }
        poll_once(&inner).await;
    }
}

async fn poll_once(inner: &PoolInner) -> bool {
    match inner.api.fetch_pool().await {
        Ok(snapshot) => {
            inner.snapshot_tx.send_replace(Some(snapshot));
            true
        }
        Err(e) => {
            // Keep the last-known-good snapshot rather than blanking
            tracing::warn!(error = %e, "pool poll failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use poolcast_api::{ApiConfig, PoolInstance};
    use url::Url;

    use super::*;

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(0), "00:00");
        assert_eq!(format_countdown(59), "00:59");
        assert_eq!(format_countdown(65), "01:05");
        assert_eq!(format_countdown(125), "02:05");
        assert_eq!(format_countdown(600), "10:00");
    }

    fn instance(id: &str, content: &str, locked: bool, unlock: u64) -> PoolInstance {
        PoolInstance {
            instance_id: id.to_string(),
            content_id: content.to_string(),
            healthy: true,
            locked_in: locked,
            time_until_unlock: unlock,
        }
    }

    #[test]
    fn test_available_instance_row() {
        let snapshot = PoolSnapshot {
            instances: vec![instance("1", "", false, 0)],
        };
        let rows = project_rows(&snapshot);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ordinal, 1);
        assert_eq!(rows[0].state, InstanceState::Available);
        assert_eq!(rows[0].label(), "Available");
        assert!(rows[0].content_id.is_none());
        assert!(!rows[0].can_release());
    }

    #[test]
    fn test_locked_instance_row_with_countdown() {
        let snapshot = PoolSnapshot {
            instances: vec![instance("1", "abc", true, 65)],
        };
        let rows = project_rows(&snapshot);
        assert_eq!(rows[0].label(), "Locked for 01:05");
        assert_eq!(rows[0].content_id.as_deref(), Some("abc"));
        assert!(rows[0].can_release());
    }

    #[test]
    fn test_ordinals_follow_list_position() {
        let snapshot = PoolSnapshot {
            instances: vec![
                instance("b", "", false, 0),
                instance("a", "xyz", true, 10),
            ],
        };
        let rows = project_rows(&snapshot);
        assert_eq!(rows[0].ordinal, 1);
        assert_eq!(rows[0].instance_id, "b");
        assert_eq!(rows[1].ordinal, 2);
        assert_eq!(rows[1].instance_id, "a");
    }

    async fn watcher_for(server: &mockito::ServerGuard, interval: Duration) -> PoolWatcher {
        let base = Url::parse(&server.url()).unwrap();
        let api = ApiClient::new(ApiConfig::new(base)).unwrap();
        PoolWatcher::spawn(api, interval)
    }

    #[tokio::test]
    async fn test_poll_replaces_snapshot_wholesale() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/api/ace_pool")
            .with_status(200)
            .with_body(r#"[{"ace_id": "a1", "content_id": "", "healthy": true, "locked_in": false}]"#)
            .expect(1)
            .create_async()
            .await;

        let watcher = watcher_for(&server, Duration::from_secs(3600)).await;
        assert!(watcher.poll_once().await);
        assert_eq!(watcher.snapshot().unwrap().len(), 1);
        first.remove_async().await;

        server
            .mock("GET", "/api/ace_pool")
            .with_status(200)
            .with_body(
                r#"[{"ace_id": "a2", "content_id": "abc", "healthy": true,
                     "locked_in": true, "time_until_unlock": 5},
                    {"ace_id": "a3", "content_id": "", "healthy": false, "locked_in": false}]"#,
            )
            .create_async()
            .await;

        assert!(watcher.poll_once().await);
        let snapshot = watcher.snapshot().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.instances[0].instance_id, "a2");
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_last_snapshot() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("GET", "/api/ace_pool")
            .with_status(200)
            .with_body(r#"[{"ace_id": "a1", "content_id": "", "healthy": true, "locked_in": false}]"#)
            .expect(1)
            .create_async()
            .await;

        let watcher = watcher_for(&server, Duration::from_secs(3600)).await;
        assert!(watcher.poll_once().await);
        ok.remove_async().await;

        server
            .mock("GET", "/api/ace_pool")
            .with_status(503)
            .create_async()
            .await;

        assert!(!watcher.poll_once().await);
        // Previous snapshot retained
        assert_eq!(watcher.snapshot().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_release_is_advisory_passthrough() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/ace_pool/a1")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let watcher = watcher_for(&server, Duration::from_secs(3600)).await;
        watcher.release("a1").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_handle_stores_a_permit() {
        let handle = PoolRefreshHandle::new();
        // Request before anyone waits: the wakeup must not be lost
        handle.request_refresh();
        tokio::time::timeout(Duration::from_secs(1), handle.notified())
            .await
            .expect("refresh permit consumed");
    }
}
