//! Status store: single source of truth plus observer broadcast
//!
//! The `StatusStore` decouples status producers (session controller,
//! playback transport) from consumers (tables, widgets, log sinks). A
//! producer pushes a partial `StatusUpdate`; the store merges it and
//! synchronously notifies every registered observer, in registration
//! order, with the same merged snapshot. Async consumers can use the
//! `watch` channel instead of a callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::status::{SessionStatus, StatusUpdate};

/// Delivered to observers on every update.
#[derive(Debug, Clone)]
pub struct StatusChange {
    /// The full merged record after the update.
    pub status: SessionStatus,
    /// True when this update moved the session into an error state from a
    /// non-error one. Lets consumers flag the transition (flash, tone)
    /// without diffing records themselves.
    pub entered_error: bool,
}

type ObserverFn = dyn Fn(&StatusChange) + Send + Sync;

struct Inner {
    /// Serializes whole update calls so merge + notify is atomic with
    /// respect to other updates, without holding the state lock during
    /// observer callbacks.
    update_gate: Mutex<()>,
    state: Mutex<SessionStatus>,
    observers: Mutex<Vec<(u64, Box<ObserverFn>)>>,
    next_observer_id: AtomicU64,
    tx: watch::Sender<SessionStatus>,
}

/// Shared handle to the session-status record. Cheap to clone; all clones
/// operate on the same record and observer registry.
#[derive(Clone)]
pub struct StatusStore {
    inner: Arc<Inner>,
}

impl StatusStore {
    pub fn new() -> Self {
        let status = SessionStatus::default();
        let (tx, _rx) = watch::channel(status.clone());
        Self {
            inner: Arc::new(Inner {
                update_gate: Mutex::new(()),
                state: Mutex::new(status),
                observers: Mutex::new(Vec::new()),
                next_observer_id: AtomicU64::new(0),
                tx,
            }),
        }
    }

    /// The current merged snapshot.
    pub fn current(&self) -> SessionStatus {
        self.inner.state.lock().clone()
    }

    /// Merge a partial update and notify every observer synchronously, in
    /// registration order. Observers all receive the same snapshot for
    /// this update. Observers must not call `update` re-entrantly.
    pub fn update(&self, update: StatusUpdate) {
        if update.is_empty() {
            return;
        }

        let _gate = self.inner.update_gate.lock();

        let change = {
            let mut state = self.inner.state.lock();
            let was_error = state.in_error();
            update.apply(&mut state);
            StatusChange {
                status: state.clone(),
                entered_error: !was_error && state.in_error(),
            }
        };

        if change.entered_error {
            tracing::debug!(player = %change.status.player, transport = %change.status.transport,
                "session entered error state");
        }

        // send_replace so the value updates even with no receivers
        self.inner.tx.send_replace(change.status.clone());

        let observers = self.inner.observers.lock();
        for (_, callback) in observers.iter() {
            callback(&change);
        }
    }

    /// Register an observer for future updates.
    ///
    /// The current value is not replayed; read it via `current()` at
    /// subscribe time if needed. Dropping the returned `Subscription`
    /// deregisters the observer.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&StatusChange) + Send + Sync + 'static,
    {
        let id = self.inner.next_observer_id.fetch_add(1, Ordering::Relaxed);
        self.inner.observers.lock().push((id, Box::new(callback)));
        Subscription {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Watch the status reactively (current value available immediately
    /// via `borrow`).
    pub fn watch(&self) -> watch::Receiver<SessionStatus> {
        self.inner.tx.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.lock().len()
    }
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StatusStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusStore")
            .field("status", &self.current())
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Guard for a registered observer. Unsubscribes on drop.
pub struct Subscription {
    inner: Weak<Inner>,
    id: u64,
}

impl Subscription {
    /// Explicitly deregister the observer.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.observers.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{PlayerStatus, TransportStatus};

    #[test]
    fn test_update_merges_and_exposes_current() {
        let store = StatusStore::new();
        store.update(StatusUpdate::new().player(PlayerStatus::Loading));
        store.update(StatusUpdate::new().transport(TransportStatus::Healthy));

        let status = store.current();
        assert_eq!(status.player, PlayerStatus::Loading);
        assert_eq!(status.transport, TransportStatus::Healthy);
    }

    #[test]
    fn test_observers_notified_in_registration_order() {
        let store = StatusStore::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o1 = order.clone();
        let _s1 = store.subscribe(move |_| o1.lock().push(1));
        let o2 = order.clone();
        let _s2 = store.subscribe(move |_| o2.lock().push(2));
        let o3 = order.clone();
        let _s3 = store.subscribe(move |_| o3.lock().push(3));

        store.update(StatusUpdate::new().player(PlayerStatus::Playing));
        assert_eq!(*order.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn test_observers_see_same_snapshot() {
        let store = StatusStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s1 = seen.clone();
        let _sub1 = store.subscribe(move |change| s1.lock().push(change.status.clone()));
        let s2 = seen.clone();
        let _sub2 = store.subscribe(move |change| s2.lock().push(change.status.clone()));

        store.update(StatusUpdate::new().stream_url("http://a/hls/x"));

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], seen[1]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let store = StatusStore::new();
        let count = Arc::new(AtomicU64::new(0));

        let c = count.clone();
        let sub = store.subscribe(move |_| {
            c.fetch_add(1, Ordering::Relaxed);
        });

        store.update(StatusUpdate::new().player(PlayerStatus::Loading));
        assert_eq!(count.load(Ordering::Relaxed), 1);

        sub.unsubscribe();
        assert_eq!(store.observer_count(), 0);

        store.update(StatusUpdate::new().player(PlayerStatus::Playing));
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let store = StatusStore::new();
        {
            let _sub = store.subscribe(|_| {});
            assert_eq!(store.observer_count(), 1);
        }
        assert_eq!(store.observer_count(), 0);
    }

    #[test]
    fn test_no_replay_on_subscribe() {
        let store = StatusStore::new();
        store.update(StatusUpdate::new().player(PlayerStatus::Playing));

        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        let _sub = store.subscribe(move |_| {
            c.fetch_add(1, Ordering::Relaxed);
        });

        // Nothing delivered until the next update
        assert_eq!(count.load(Ordering::Relaxed), 0);
        assert_eq!(store.current().player, PlayerStatus::Playing);
    }

    #[test]
    fn test_entered_error_marks_transition_only() {
        let store = StatusStore::new();
        let flags = Arc::new(Mutex::new(Vec::new()));
        let f = flags.clone();
        let _sub = store.subscribe(move |change| f.lock().push(change.entered_error));

        store.update(StatusUpdate::new().player(PlayerStatus::Loading));
        store.update(StatusUpdate::new().transport(TransportStatus::Error("a".into())));
        store.update(StatusUpdate::new().transport(TransportStatus::Error("b".into())));
        store.update(StatusUpdate::new().transport(TransportStatus::Healthy));
        store.update(StatusUpdate::new().player(PlayerStatus::Error("c".into())));

        assert_eq!(*flags.lock(), vec![false, true, false, false, true]);
    }

    #[test]
    fn test_empty_update_is_ignored() {
        let store = StatusStore::new();
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        let _sub = store.subscribe(move |_| {
            c.fetch_add(1, Ordering::Relaxed);
        });

        store.update(StatusUpdate::new());
        assert_eq!(count.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_watch_sees_updates() {
        let store = StatusStore::new();
        let mut rx = store.watch();

        assert_eq!(rx.borrow().player, PlayerStatus::Idle);

        store.update(StatusUpdate::new().player(PlayerStatus::Playing));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().player, PlayerStatus::Playing);
    }
}
