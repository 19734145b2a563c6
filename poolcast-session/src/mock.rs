//! Scriptable test doubles for the engine and sink seams
//!
//! Shipped as a normal module so downstream crates' tests and examples
//! can drive a session without a real streaming engine.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use url::Url;

use crate::transport::{
    AdaptiveEngine, EngineError, EngineEvent, EngineEvents, MediaSink, PlayRejected,
};

/// Sink double with scriptable play outcomes.
///
/// The first `reject_plays` play calls are rejected; the sink reports an
/// advancing position once the total number of play calls reaches
/// `advance_on_call` (never, when `None`).
#[derive(Debug)]
pub struct MockSink {
    play_calls: AtomicU32,
    reject_plays: u32,
    advance_on_call: Option<u32>,
    native: bool,
}

impl MockSink {
    pub fn new(reject_plays: u32, advance_on_call: Option<u32>) -> Self {
        Self {
            play_calls: AtomicU32::new(0),
            reject_plays,
            advance_on_call,
            native: false,
        }
    }

    /// First play call succeeds and the sink advances.
    pub fn advancing_immediately() -> Self {
        Self::new(0, Some(1))
    }

    /// Play calls succeed but the sink never advances.
    pub fn never_advancing() -> Self {
        Self::new(0, None)
    }

    pub fn with_native_support(mut self) -> Self {
        self.native = true;
        self
    }

    pub fn play_call_count(&self) -> u32 {
        self.play_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaSink for MockSink {
    async fn play(&self) -> Result<(), PlayRejected> {
        let call = self.play_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.reject_plays {
            Err(PlayRejected(format!("scripted rejection #{call}")))
        } else {
            Ok(())
        }
    }

    fn is_paused(&self) -> bool {
        false
    }

    fn has_ended(&self) -> bool {
        false
    }

    fn position(&self) -> Duration {
        let calls = self.play_calls.load(Ordering::SeqCst);
        match self.advance_on_call {
            Some(threshold) if calls >= threshold => Duration::from_secs(1),
            _ => Duration::ZERO,
        }
    }

    fn supports_native(&self) -> bool {
        self.native
    }
}

/// Engine double that records attachments and lets tests inject events.
pub struct MockEngine {
    supported: bool,
    fail_attach: Option<EngineError>,
    attached: Mutex<Vec<Url>>,
    detach_count: AtomicU32,
    events_tx: Mutex<Option<mpsc::UnboundedSender<EngineEvent>>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            supported: true,
            fail_attach: None,
            attached: Mutex::new(Vec::new()),
            detach_count: AtomicU32::new(0),
            events_tx: Mutex::new(None),
        }
    }

    /// Engine that cannot drive any sink.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    /// Engine whose attach call fails.
    pub fn failing_attach(error: EngineError) -> Self {
        Self {
            fail_attach: Some(error),
            ..Self::new()
        }
    }

    /// Push an event into the current attachment's stream. Returns false
    /// when nothing is attached.
    pub fn emit(&self, event: EngineEvent) -> bool {
        match self.events_tx.lock().as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    pub fn attached_urls(&self) -> Vec<Url> {
        self.attached.lock().clone()
    }

    pub fn detach_count(&self) -> u32 {
        self.detach_count.load(Ordering::SeqCst)
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdaptiveEngine for MockEngine {
    fn supported(&self, _sink: &dyn MediaSink) -> bool {
        self.supported
    }

    async fn attach(
        &self,
        url: &Url,
        _sink: Arc<dyn MediaSink>,
    ) -> Result<EngineEvents, EngineError> {
        if let Some(error) = &self.fail_attach {
            return Err(error.clone());
        }
        self.attached.lock().push(url.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        *self.events_tx.lock() = Some(tx);
        Ok(rx)
    }

    async fn detach(&self) {
        self.detach_count.fetch_add(1, Ordering::SeqCst);
        self.events_tx.lock().take();
    }
}
