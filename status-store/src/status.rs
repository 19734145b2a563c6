//! Session status record and partial updates
//!
//! `SessionStatus` is the single shared record describing the playback
//! session: what the player is doing, what the transport is doing, and
//! which stream URL (if any) is loaded. Producers never replace the record
//! wholesale; they apply `StatusUpdate` merges so unrelated fields written
//! by other components are retained.

use std::fmt;

use serde::Serialize;

/// Shown wherever a URL is expected but no stream has been loaded yet.
pub const NO_STREAM_SENTINEL: &str = "no stream loaded";

/// What the player (the sink-facing side of the session) is doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PlayerStatus {
    Idle,
    Loading,
    Playing,
    Paused,
    /// Terminal for the current load; the message is user-displayable.
    Error(String),
}

impl PlayerStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, PlayerStatus::Error(_))
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerStatus::Idle => write!(f, "idle"),
            PlayerStatus::Loading => write!(f, "loading"),
            PlayerStatus::Playing => write!(f, "playing"),
            PlayerStatus::Paused => write!(f, "paused"),
            PlayerStatus::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

/// What the adaptive transport attachment is doing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TransportStatus {
    Idle,
    Initialising,
    Loading,
    Healthy,
    /// The message carries the most specific known failure description.
    Error(String),
    /// The sink can play neither adaptive nor native streams. Permanent
    /// for this sink.
    Unsupported,
}

impl TransportStatus {
    /// `Unsupported` counts as an error state: observers use this to mark
    /// transitions into failure, and an unsupported sink is a failure the
    /// user has to notice.
    pub fn is_error(&self) -> bool {
        matches!(self, TransportStatus::Error(_) | TransportStatus::Unsupported)
    }
}

impl fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportStatus::Idle => write!(f, "idle"),
            TransportStatus::Initialising => write!(f, "initialising"),
            TransportStatus::Loading => write!(f, "loading"),
            TransportStatus::Healthy => write!(f, "healthy"),
            TransportStatus::Error(msg) => write!(f, "error: {}", msg),
            TransportStatus::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// The shared session-status record.
///
/// Exactly one of these exists per `StatusStore`; every observer sees the
/// same merged snapshot after each update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub player: PlayerStatus,
    pub transport: TransportStatus,
    /// Last resolved transport URL. `None` until the first load succeeds.
    pub stream_url: Option<String>,
}

impl SessionStatus {
    /// The stream URL for display, falling back to the sentinel.
    pub fn display_url(&self) -> &str {
        self.stream_url.as_deref().unwrap_or(NO_STREAM_SENTINEL)
    }

    /// True when either the player or the transport is in an error state.
    pub fn in_error(&self) -> bool {
        self.player.is_error() || self.transport.is_error()
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            player: PlayerStatus::Idle,
            transport: TransportStatus::Idle,
            stream_url: None,
        }
    }
}

/// A partial update merged into the session status.
///
/// Unset fields keep their current value, so components only describe the
/// part of the session they own:
///
/// ```rust,ignore
/// status.update(StatusUpdate::new().player(PlayerStatus::Loading));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    player: Option<PlayerStatus>,
    transport: Option<TransportStatus>,
    stream_url: Option<String>,
}

impl StatusUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player(mut self, player: PlayerStatus) -> Self {
        self.player = Some(player);
        self
    }

    pub fn transport(mut self, transport: TransportStatus) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = Some(url.into());
        self
    }

    /// True when the update would change nothing.
    pub fn is_empty(&self) -> bool {
        self.player.is_none() && self.transport.is_none() && self.stream_url.is_none()
    }

    pub(crate) fn apply(self, status: &mut SessionStatus) {
        if let Some(player) = self.player {
            status.player = player;
        }
        if let Some(transport) = self.transport {
            status.transport = transport;
        }
        if let Some(url) = self.stream_url {
            status.stream_url = Some(url);
        }
    }
}
