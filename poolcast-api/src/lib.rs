//! Typed HTTP client for the poolcast server surface
//!
//! The server side (scraping, EPG, persistence) is an external
//! collaborator; this crate only speaks its contract:
//!
//! | Method | Path | Purpose |
//! |---|---|---|
//! | GET | `{pool_path}` | pool snapshot |
//! | DELETE | `{pool_path}/{id}` | release a reservation |
//! | GET | `/api/stream/{content_id}` | stream descriptor |
//! | GET | `{token_path}` | short-lived stream token |
//! | GET | `/hls/{content_id}?token=...` | transport manifest (composed here, consumed by the engine) |
//!
//! All requests are unauthenticated-tolerant: a missing token degrades to
//! an anonymous request because some deployments disable authentication
//! entirely.

pub use client::{
    ApiClient, ApiConfig, DEFAULT_API_TIMEOUT, DEFAULT_POOL_PATH, DEFAULT_PROBE_TIMEOUT,
    DEFAULT_PROBE_WAIT, DEFAULT_TOKEN_PATH,
};
pub use error::{ApiError, Result};
pub use quality::{tier, QualityTier};
pub use types::{PoolInstance, PoolSnapshot, StreamDescriptor, TokenResponse};

mod client;
mod error;
mod quality;
mod types;
