use thiserror::Error;

use crate::transport::TransportError;

/// Session-level errors for loading and playing a stream.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] poolcast_api::ApiError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A newer load started while this one was resolving; its results
    /// were discarded without touching session status.
    #[error("superseded by a newer load")]
    Superseded,

    /// No media sink is configured for this session.
    #[error("no media sink is attached to this session")]
    SinkUnavailable,

    /// The availability probe stayed negative and the session is
    /// configured to treat the probe as a hard precondition.
    #[error("stream source is not ready")]
    SourceNotReady,
}

/// Type alias for results that can return a SessionError
pub type Result<T> = std::result::Result<T, SessionError>;
