//! Background task ownership
//!
//! Two small primitives keep every background activity owned by the
//! component that needs it:
//!
//! - [`RepeatingTask`] - a repeating tokio task behind an owned handle,
//!   aborted on drop so a torn-down component never leaves a timer
//!   mutating dead state.
//! - [`TaskSlot`] - a single-slot task handle: starting a new task while
//!   an unfinished one occupies the slot is rejected, not queued.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A repeating background task. The first iteration runs immediately,
/// then once per period. Cancelled when the handle is dropped.
pub struct RepeatingTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl RepeatingTask {
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut task: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                task().await;
            }
        });
        tracing::debug!(task = name, ?period, "repeating task started");
        Self { name, handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        tracing::debug!(task = self.name, "repeating task cancelled");
        self.handle.abort();
    }
}

/// Single-slot task handle.
///
/// Replaces a boolean "in progress" flag with explicit ownership: the
/// slot holds the running task's handle, a second start while the task
/// is unfinished is dropped, and a finished handle frees the slot
/// implicitly.
#[derive(Default)]
pub struct TaskSlot {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TaskSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `fut` into the slot unless an unfinished task occupies it.
    /// Returns whether the task was started.
    pub fn try_start<F>(&self, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.handle.lock();
        if let Some(existing) = slot.as_ref() {
            if !existing.is_finished() {
                return false;
            }
        }
        *slot = Some(tokio::spawn(fut));
        true
    }

    /// Whether an unfinished task currently occupies the slot.
    pub fn is_busy(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Abort the occupying task, if any, and free the slot.
    pub fn abort(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_slot_rejects_while_busy() {
        let slot = TaskSlot::new();

        assert!(slot.try_start(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }));
        assert!(slot.is_busy());
        assert!(!slot.try_start(async {}));

        slot.abort();
        assert!(!slot.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slot_frees_after_completion() {
        let slot = TaskSlot::new();
        let ran = Arc::new(AtomicU32::new(0));

        let r = ran.clone();
        assert!(slot.try_start(async move {
            r.fetch_add(1, Ordering::SeqCst);
        }));

        // Let the spawned task finish
        while slot.is_busy() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        let r = ran.clone();
        assert!(slot.try_start(async move {
            r.fetch_add(1, Ordering::SeqCst);
        }));
        while slot.is_busy() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(ran.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeating_task_ticks() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let task = RepeatingTask::spawn("test-tick", Duration::from_secs(10), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        // First tick is immediate, then one per period
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        task.cancel();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeating_task_cancelled_on_drop() {
        let count = Arc::new(AtomicU32::new(0));
        {
            let c = count.clone();
            let _task = RepeatingTask::spawn("test-drop", Duration::from_secs(10), move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                }
            });
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        let after_drop = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), after_drop);
    }
}
