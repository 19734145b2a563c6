//! Shared session-status record with observer broadcast
//!
//! This crate holds the single status record for a playback session and
//! fans updates out to any number of observers:
//!
//! - [`SessionStatus`] - the record: player state, transport state, stream
//!   URL. Exactly one exists per [`StatusStore`].
//! - [`StatusUpdate`] - a partial merge; unset fields are retained.
//! - [`StatusStore`] - owns the record; `update()` merges and notifies all
//!   observers synchronously, in registration order, with the same
//!   snapshot. `watch()` exposes the record on a `tokio::sync::watch`
//!   channel for async consumers.
//!
//! # Usage
//!
//! ```rust,ignore
//! let store = StatusStore::new();
//!
//! let _sub = store.subscribe(|change| {
//!     if change.entered_error {
//!         eprintln!("session failed: {}", change.status.player);
//!     }
//! });
//!
//! store.update(StatusUpdate::new().player(PlayerStatus::Loading));
//! ```

pub use status::{
    PlayerStatus, SessionStatus, StatusUpdate, TransportStatus, NO_STREAM_SENTINEL,
};
pub use store::{StatusChange, StatusStore, Subscription};

mod status;
mod store;
