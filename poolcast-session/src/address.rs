//! Navigable address mirror
//!
//! The session controller owns the session state; the navigable address
//! (URL fragment, deep link, whatever the host embeds) is a secondary
//! mirror of it. Ownership is one-directional: the controller publishes
//! the active content identifier into the mirror, and an externally
//! driven mirror change (the user editing the address) is observed and
//! answered with an equivalent load.

use tokio::sync::watch;

/// Seam between the session and the host's address surface.
pub trait AddressMirror: Send + Sync {
    /// Record the active content identifier. Called by the controller
    /// only.
    fn publish(&self, content_id: &str);

    /// Watch address values, including externally driven edits. The
    /// receiver also observes the controller's own publishes; consumers
    /// suppress those echoes by comparing against the active session.
    fn changes(&self) -> watch::Receiver<Option<String>>;
}

/// In-memory mirror, the default when the host has no address surface.
pub struct InMemoryAddress {
    tx: watch::Sender<Option<String>>,
}

impl InMemoryAddress {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Seed the mirror with a pre-selected identifier, as a page load
    /// with a fragment would.
    pub fn with_initial(content_id: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(Some(content_id.into()));
        Self { tx }
    }

    /// Simulate an external edit of the address.
    pub fn set_external(&self, content_id: Option<String>) {
        self.tx.send_replace(content_id);
    }

    /// The current address value.
    pub fn current(&self) -> Option<String> {
        self.tx.borrow().clone()
    }
}

impl Default for InMemoryAddress {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressMirror for InMemoryAddress {
    fn publish(&self, content_id: &str) {
        self.tx.send_replace(Some(content_id.to_string()));
    }

    fn changes(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}
