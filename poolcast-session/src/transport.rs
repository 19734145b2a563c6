//! Playback transport: the adaptive-engine wrapper
//!
//! The streaming engine itself is a black box behind [`AdaptiveEngine`]:
//! it accepts a URL, attaches to a [`MediaSink`], and emits a fixed set of
//! lifecycle/error events. This module translates those events into the
//! session-status vocabulary and drives the bounded play-retry protocol.
//!
//! State per attachment: unattached -> attaching -> ready -> playing,
//! with errors reachable from any attached state. A sink that supports
//! neither adaptive nor native playback latches `Unsupported` permanently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use status_store::{PlayerStatus, StatusStore, StatusUpdate, TransportStatus};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use crate::config::SessionConfig;
use crate::pool::PoolRefreshHandle;
use crate::scheduler::TaskSlot;

/// Engine-reported error category. Everything the engine cannot name
/// more precisely arrives as `Other` with a detail string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorCategory {
    Network,
    Media,
    Mux,
    Other,
}

/// An error event from the streaming engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub category: EngineErrorCategory,
    pub detail: String,
}

impl EngineError {
    pub fn new(category: EngineErrorCategory, detail: impl Into<String>) -> Self {
        Self {
            category,
            detail: detail.into(),
        }
    }
}

/// The fixed set of lifecycle/error events an engine emits per
/// attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The engine bound itself to the sink.
    Attached,
    /// The manifest parsed and segments are flowing.
    ManifestLoaded,
    Error(EngineError),
}

/// Per-attachment event stream handed back by [`AdaptiveEngine::attach`].
pub type EngineEvents = mpsc::UnboundedReceiver<EngineEvent>;

/// A play call the sink refused (autoplay policy, detached element, ...).
#[derive(Debug, Clone, Error)]
#[error("play rejected: {0}")]
pub struct PlayRejected(pub String);

/// The local playback surface the transport attaches to.
#[async_trait]
pub trait MediaSink: Send + Sync + std::fmt::Debug {
    async fn play(&self) -> std::result::Result<(), PlayRejected>;

    fn is_paused(&self) -> bool;

    fn has_ended(&self) -> bool;

    /// Elapsed playback position.
    fn position(&self) -> Duration;

    /// Whether the sink can play the stream format natively, without the
    /// adaptive engine.
    fn supports_native(&self) -> bool;

    /// Whether playback is actually advancing (used to verify a play
    /// call took effect).
    fn is_advancing(&self) -> bool {
        !self.is_paused() && !self.has_ended() && self.position() > Duration::ZERO
    }
}

/// Black-box adaptive streaming engine.
///
/// An implementation that finds the sink supports the format natively is
/// expected to wire the URL straight into the sink during `attach`.
#[async_trait]
pub trait AdaptiveEngine: Send + Sync {
    /// Whether the engine can drive this sink.
    fn supported(&self, sink: &dyn MediaSink) -> bool;

    /// Attach the URL to the sink and return the attachment's event
    /// stream.
    async fn attach(
        &self,
        url: &Url,
        sink: Arc<dyn MediaSink>,
    ) -> std::result::Result<EngineEvents, EngineError>;

    /// Tear down the current attachment. Must be safe to call with none.
    async fn detach(&self);
}

/// Internal error taxonomy for engine-reported failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("media error: {0}")]
    Media(String),

    #[error("mux error: {0}")]
    Mux(String),

    #[error("transport error: {0}")]
    Other(String),

    #[error("adaptive playback is not supported by this sink")]
    Unsupported,
}

impl TransportError {
    pub fn classify(error: &EngineError) -> Self {
        match error.category {
            EngineErrorCategory::Network => TransportError::Network(error.detail.clone()),
            EngineErrorCategory::Media => TransportError::Media(error.detail.clone()),
            EngineErrorCategory::Mux => TransportError::Mux(error.detail.clone()),
            EngineErrorCategory::Other => TransportError::Other(error.detail.clone()),
        }
    }

    /// Most specific user-facing description for the session status.
    pub fn status_text(&self) -> String {
        match self {
            TransportError::Network(_) => {
                "Network error: upstream has not produced this segment yet".to_string()
            }
            TransportError::Media(detail) => format!("Media error: {detail}"),
            TransportError::Mux(detail) => format!("Mux error: {detail}"),
            TransportError::Other(detail) => format!("Transport error: {detail}"),
            TransportError::Unsupported => {
                "This player supports neither adaptive nor native playback".to_string()
            }
        }
    }

    /// Network failures are recoverable: the upstream instance is likely
    /// still assembling the segment, so one replay is worth trying.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TransportError::Network(_))
    }
}

struct TransportInner {
    engine: Arc<dyn AdaptiveEngine>,
    status: StatusStore,
    sink: Mutex<Option<Arc<dyn MediaSink>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
    play_slot: TaskSlot,
    /// One automatic replay per attachment for recoverable errors.
    network_retry_used: AtomicBool,
    /// Once a sink proves unable to play anything, stay unsupported.
    unsupported: AtomicBool,
    pool_refresh: Option<PoolRefreshHandle>,
    play_backoff: Duration,
    verify_delay: Duration,
    default_max_attempts: u32,
}

/// Wrapper around the adaptive engine that owns the attachment
/// lifecycle, the event pump and the play-retry protocol.
#[derive(Clone)]
pub struct PlaybackTransport {
    inner: Arc<TransportInner>,
}

impl PlaybackTransport {
    pub fn new(
        engine: Arc<dyn AdaptiveEngine>,
        status: StatusStore,
        config: &SessionConfig,
        pool_refresh: Option<PoolRefreshHandle>,
    ) -> Self {
        Self {
            inner: Arc::new(TransportInner {
                engine,
                status,
                sink: Mutex::new(None),
                pump: Mutex::new(None),
                play_slot: TaskSlot::new(),
                network_retry_used: AtomicBool::new(false),
                unsupported: AtomicBool::new(false),
                pool_refresh,
                play_backoff: config.play_backoff,
                verify_delay: config.verify_delay,
                default_max_attempts: config.max_play_attempts,
            }),
        }
    }

    /// Attach a transport URL to a sink.
    ///
    /// Tears down any previous attachment first and resets the
    /// per-attachment replay budget. Fails with `Unsupported` when the
    /// sink can play neither adaptively nor natively; that verdict is
    /// permanent for this transport.
    pub async fn attach(
        &self,
        url: &Url,
        sink: Arc<dyn MediaSink>,
    ) -> std::result::Result<(), TransportError> {
        let inner = &self.inner;

        if inner.unsupported.load(Ordering::SeqCst) {
            return Err(TransportError::Unsupported);
        }
        if !inner.engine.supported(sink.as_ref()) && !sink.supports_native() {
            inner.unsupported.store(true, Ordering::SeqCst);
            inner
                .status
                .update(StatusUpdate::new().transport(TransportStatus::Unsupported));
            tracing::warn!("sink supports neither adaptive nor native playback");
            return Err(TransportError::Unsupported);
        }

        self.detach().await;
        inner.network_retry_used.store(false, Ordering::SeqCst);
        *inner.sink.lock() = Some(sink.clone());

        let events = match inner.engine.attach(url, sink).await {
            Ok(events) => events,
            Err(e) => {
                let kind = TransportError::classify(&e);
                inner
                    .status
                    .update(StatusUpdate::new().transport(TransportStatus::Error(kind.status_text())));
                inner.sink.lock().take();
                return Err(kind);
            }
        };

        let pump_inner = inner.clone();
        *inner.pump.lock() = Some(tokio::spawn(pump_events(pump_inner, events)));
        tracing::debug!(url = %url, "transport attached");
        Ok(())
    }

    /// Tear down the current attachment. Idempotent: safe with none.
    pub async fn detach(&self) {
        let inner = &self.inner;
        if let Some(pump) = inner.pump.lock().take() {
            pump.abort();
        }
        inner.play_slot.abort();
        let had_attachment = inner.sink.lock().take().is_some();
        if had_attachment {
            inner.engine.detach().await;
            tracing::debug!("transport detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.inner.sink.lock().is_some()
    }

    /// Start the bounded play-retry protocol.
    ///
    /// At most one attempt chain runs at a time: while one occupies the
    /// slot a second call is dropped (returns `false`) without touching
    /// session status. The chain waits `backoff * n` before attempt `n`,
    /// issues the play call, then verifies shortly after that the sink is
    /// actually advancing. Success marks the player `Playing` and nudges
    /// the pool watcher (a working play is evidence the instance is
    /// healthy); exhaustion reports a terminal player error.
    pub fn start_play(&self, max_attempts: u32) -> bool {
        let inner = self.inner.clone();
        let started = self
            .inner
            .play_slot
            .try_start(async move { run_play_attempts(inner, max_attempts).await });
        if !started {
            tracing::debug!("play attempt already in flight, dropping request");
        }
        started
    }

    /// `start_play` with the configured default budget.
    pub fn start_play_default(&self) -> bool {
        self.start_play(self.inner.default_max_attempts)
    }

    pub fn is_play_in_flight(&self) -> bool {
        self.inner.play_slot.is_busy()
    }

    /// Record that the host paused the sink. The transport does not poll
    /// the sink for pause state; hosts report it.
    pub fn mark_paused(&self) {
        self.inner
            .status
            .update(StatusUpdate::new().player(PlayerStatus::Paused));
    }
}

async fn run_play_attempts(inner: Arc<TransportInner>, max_attempts: u32) {
    let sink = match inner.sink.lock().clone() {
        Some(sink) => sink,
        None => {
            tracing::warn!("play requested with no attachment");
            return;
        }
    };

    for attempt in 1..=max_attempts {
        // Linearly increasing backoff gives the transport time to buffer
        tokio::time::sleep(inner.play_backoff * attempt).await;

        match sink.play().await {
            Ok(()) => {
                tokio::time::sleep(inner.verify_delay).await;
                if sink.is_advancing() {
                    tracing::info!(attempt, "playback verified");
                    inner
                        .status
                        .update(StatusUpdate::new().player(PlayerStatus::Playing));
                    if let Some(refresh) = &inner.pool_refresh {
                        refresh.request_refresh();
                    }
                    return;
                }
                tracing::debug!(attempt, "sink not advancing after play call");
            }
            Err(e) => {
                tracing::debug!(attempt, error = %e, "play call rejected");
            }
        }
    }

    tracing::warn!(max_attempts, "play retry budget exhausted");
    inner.status.update(
        StatusUpdate::new().player(PlayerStatus::Error(format!(
            "playback failed after {max_attempts} attempts"
        ))),
    );
}

async fn pump_events(inner: Arc<TransportInner>, mut events: EngineEvents) {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::Attached => {
                inner
                    .status
                    .update(StatusUpdate::new().transport(TransportStatus::Loading));
            }
            EngineEvent::ManifestLoaded => {
                inner
                    .status
                    .update(StatusUpdate::new().transport(TransportStatus::Healthy));
            }
            EngineEvent::Error(error) => {
                let kind = TransportError::classify(&error);
                tracing::warn!(error = %kind, "engine reported an error");
                inner
                    .status
                    .update(StatusUpdate::new().transport(TransportStatus::Error(kind.status_text())));

                if kind.is_recoverable()
                    && !inner.network_retry_used.swap(true, Ordering::SeqCst)
                {
                    tracing::info!("recoverable network error, replaying once");
                    let replay_inner = inner.clone();
                    inner
                        .play_slot
                        .try_start(async move { run_play_attempts(replay_inner, 1).await });
                }
            }
        }
    }
    tracing::debug!("engine event stream closed");
}
