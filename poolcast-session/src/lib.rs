//! Playback-session state machine and pool coordination
//!
//! The core of the poolcast SDK:
//!
//! - [`StreamSessionController`] - resolves a content identifier to a
//!   transport URL (token-aware, anonymous fallback), tears down the
//!   previous attachment, attaches a new one and runs the play protocol.
//!   Loads are generation-tagged so superseded results are discarded.
//! - [`PlaybackTransport`] - wraps the black-box adaptive engine behind
//!   the [`AdaptiveEngine`]/[`MediaSink`] seams, classifies engine errors
//!   and drives the bounded play-retry protocol.
//! - [`PoolWatcher`] - periodic visibility into pool occupancy, the
//!   advisory release action and lock-countdown display rows.
//! - [`DescriptorCache`] - per-content descriptor cache with a slow
//!   background refresh.
//! - [`AddressMirror`] - one-directional projection of the session into
//!   the host's navigable address.
//!
//! All background work is held behind owned task handles and cancelled on
//! drop; no timer outlives the component that started it.

pub use address::{AddressMirror, InMemoryAddress};
pub use catalog::DescriptorCache;
pub use config::SessionConfig;
pub use controller::StreamSessionController;
pub use error::{Result, SessionError};
pub use pool::{
    format_countdown, project_rows, InstanceState, PoolRefreshHandle, PoolRow, PoolWatcher,
};
pub use scheduler::{RepeatingTask, TaskSlot};
pub use transport::{
    AdaptiveEngine, EngineError, EngineErrorCategory, EngineEvent, EngineEvents, MediaSink,
    PlayRejected, PlaybackTransport, TransportError,
};

mod address;
mod catalog;
mod config;
mod controller;
mod error;
pub mod logging;
mod pool;
mod scheduler;
mod transport;

pub mod mock;
