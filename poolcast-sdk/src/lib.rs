//! # Poolcast SDK - watch live feeds through a shared decoder pool
//!
//! A client SDK for playing live video feeds that are served through a
//! capacity-limited pool of upstream decoding instances. The SDK resolves
//! a content identifier to a transport URL, attaches an adaptive
//! streaming engine, recovers from transient failures, and reflects
//! session and pool health to any number of observers.
//!
//! ```rust,ignore
//! use poolcast_sdk::{SessionConfig, StreamSystem};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), poolcast_sdk::SdkError> {
//!     let config = SessionConfig::new("http://tv-box:8000".parse().unwrap());
//!     let system = StreamSystem::connect(config, engine, Some(sink), None)?;
//!
//!     // Observe the session
//!     let _sub = system.subscribe(|change| {
//!         println!("{} / {}", change.status.player, change.status.transport);
//!     });
//!
//!     // Watch the pool
//!     for row in system.pool().rows() {
//!         println!("#{} {}", row.ordinal, row.label());
//!     }
//!
//!     system.load_and_play("my-channel").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! poolcast-sdk (StreamSystem facade)
//!     ↓
//! poolcast-session (controller, transport, pool watcher, catalog)
//!     ↓                              ↓
//! status-store (observers)    poolcast-api (HTTP contract)
//! ```
//!
//! The adaptive streaming engine and the playback surface stay behind the
//! [`AdaptiveEngine`] and [`MediaSink`] seams; the SDK never assumes a
//! concrete engine.

// Main exports
pub use error::SdkError;
pub use system::StreamSystem;

// Re-export the configuration and the seams implementors need
pub use poolcast_session::{
    AdaptiveEngine, AddressMirror, EngineError, EngineErrorCategory, EngineEvent, InMemoryAddress,
    MediaSink, SessionConfig,
};

// Re-export commonly consumed types
pub use poolcast_api::{PoolInstance, PoolSnapshot, QualityTier, StreamDescriptor};
pub use status_store::{PlayerStatus, SessionStatus, StatusChange, TransportStatus};

// Internal modules
mod error;
mod system;
