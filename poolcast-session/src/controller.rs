//! Stream session controller
//!
//! Owns the mapping from "selected content identifier" to an active
//! playback attachment: token resolution, URL composition, teardown of
//! the previous attachment, the optional availability probe, and the
//! hand-off to the transport's play protocol.
//!
//! Every load is tagged with a monotonic generation. A load that resumes
//! from a suspension point and finds a newer generation abandons itself
//! without touching session status, so a slow response can never
//! overwrite a newer session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use poolcast_api::ApiClient;
use status_store::{PlayerStatus, StatusStore, StatusUpdate, TransportStatus};
use url::Url;

use crate::address::AddressMirror;
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::transport::{MediaSink, PlaybackTransport};

struct ControllerInner {
    api: ApiClient,
    status: StatusStore,
    transport: PlaybackTransport,
    address: Arc<dyn AddressMirror>,
    sink: Mutex<Option<Arc<dyn MediaSink>>>,
    /// Monotonic load generation; stale continuations check against it.
    generation: AtomicU64,
    /// Content identifier of the newest load that reached publication.
    current_content: Mutex<Option<String>>,
    config: SessionConfig,
}

/// Top-level orchestrator for one playback session.
#[derive(Clone)]
pub struct StreamSessionController {
    inner: Arc<ControllerInner>,
}

impl StreamSessionController {
    pub fn new(
        api: ApiClient,
        status: StatusStore,
        transport: PlaybackTransport,
        address: Arc<dyn AddressMirror>,
        sink: Option<Arc<dyn MediaSink>>,
        config: SessionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                api,
                status,
                transport,
                address,
                sink: Mutex::new(sink),
                generation: AtomicU64::new(0),
                current_content: Mutex::new(None),
                config,
            }),
        }
    }

    /// Attach the playback surface after construction.
    pub fn set_sink(&self, sink: Arc<dyn MediaSink>) {
        *self.inner.sink.lock() = Some(sink);
    }

    /// Content identifier of the active session, if any.
    pub fn current_content_id(&self) -> Option<String> {
        self.inner.current_content.lock().clone()
    }

    pub fn transport(&self) -> &PlaybackTransport {
        &self.inner.transport
    }

    /// Resolve the transport URL for a content identifier.
    ///
    /// A missing token is non-fatal: some deployments disable
    /// authentication, so the URL degrades to an anonymous one.
    pub async fn resolve_stream_url(&self, content_id: &str) -> Result<Url> {
        match self.inner.api.fetch_token().await {
            Ok(token) => Ok(self.inner.api.hls_url(content_id, Some(&token))?),
            Err(e) => {
                tracing::warn!(error = %e, "stream token unavailable, composing anonymous URL");
                Ok(self.inner.api.hls_url(content_id, None)?)
            }
        }
    }

    /// Load a stream: tear down the previous attachment, resolve the URL
    /// and attach. Returns the sink handle so the caller can start
    /// playback.
    ///
    /// A call superseded by a newer `load_stream` fails with
    /// [`SessionError::Superseded`] and leaves session status to the
    /// newer load.
    pub async fn load_stream(&self, content_id: &str) -> Result<Arc<dyn MediaSink>> {
        let sink = match self.inner.sink.lock().clone() {
            Some(sink) => sink,
            None => {
                // Fatal but local: nothing to attach to, nothing to report
                tracing::error!(content_id, "no media sink configured, ignoring load request");
                return Err(SessionError::SinkUnavailable);
            }
        };

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(content_id, generation, "loading stream");

        self.inner.status.update(
            StatusUpdate::new()
                .player(PlayerStatus::Loading)
                .transport(TransportStatus::Initialising),
        );

        self.inner.transport.detach().await;

        let url = self.resolve_stream_url(content_id).await?;
        self.ensure_current(generation)?;

        if self.inner.config.probe_retries > 0 {
            let ready = self
                .inner
                .api
                .wait_for_source_ready(&url, self.inner.config.probe_retries)
                .await;
            self.ensure_current(generation)?;
            if !ready {
                if self.inner.config.strict_probe {
                    self.inner.status.update(StatusUpdate::new().player(PlayerStatus::Error(
                        "stream source is not ready".to_string(),
                    )));
                    return Err(SessionError::SourceNotReady);
                }
                tracing::warn!(content_id, "source probe negative, attaching anyway");
            }
        }

        self.inner
            .status
            .update(StatusUpdate::new().stream_url(url.to_string()));
        *self.inner.current_content.lock() = Some(content_id.to_string());
        self.inner.address.publish(content_id);

        if let Err(e) = self.inner.transport.attach(&url, sink.clone()).await {
            self.inner
                .status
                .update(StatusUpdate::new().player(PlayerStatus::Error(e.status_text())));
            return Err(e.into());
        }
        self.ensure_current(generation)?;

        Ok(sink)
    }

    /// Load a stream, then run the retry-protected play protocol.
    ///
    /// The retry policy applies to the play call, not the attach. A
    /// superseded load is not an error: the newer load owns the session.
    pub async fn load_and_play(&self, content_id: &str) -> Result<()> {
        match self.load_stream(content_id).await {
            Ok(_sink) => {
                self.inner
                    .transport
                    .start_play(self.inner.config.max_play_attempts);
                Ok(())
            }
            Err(SessionError::Superseded) => {
                tracing::debug!(content_id, "load superseded, skipping play");
                Ok(())
            }
            Err(SessionError::Api(e)) => {
                // Playback-path failures are never swallowed silently
                self.inner
                    .status
                    .update(StatusUpdate::new().player(PlayerStatus::Error(e.to_string())));
                Err(SessionError::Api(e))
            }
            Err(e) => Err(e),
        }
    }

    /// Tear down the active attachment, if any.
    pub async fn teardown(&self) {
        self.inner.transport.detach().await;
    }

    fn ensure_current(&self, generation: u64) -> Result<()> {
        let newest = self.inner.generation.load(Ordering::SeqCst);
        if newest != generation {
            tracing::debug!(generation, newest, "discarding superseded load");
            Err(SessionError::Superseded)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::InMemoryAddress;
    use crate::mock::{MockEngine, MockSink};

    struct Fixture {
        controller: StreamSessionController,
        status: StatusStore,
        engine: Arc<MockEngine>,
        address: Arc<InMemoryAddress>,
        sink: Arc<MockSink>,
    }

    fn fixture(_server: &mockito::ServerGuard, config: SessionConfig) -> Fixture {
        let api = ApiClient::new(config.api_config()).unwrap();
        let status = StatusStore::new();
        let engine = Arc::new(MockEngine::new());
        let transport = PlaybackTransport::new(engine.clone(), status.clone(), &config, None);
        let address = Arc::new(InMemoryAddress::new());
        let sink = Arc::new(MockSink::advancing_immediately());
        let controller = StreamSessionController::new(
            api,
            status.clone(),
            transport,
            address.clone(),
            Some(sink.clone()),
            config,
        );
        Fixture {
            controller,
            status,
            engine,
            address,
            sink,
        }
    }

    fn config_for(server: &mockito::ServerGuard) -> SessionConfig {
        // Probing off by default in tests; individual tests opt back in.
        // Short retry timings: these tests run against a real local
        // server, so the clock is real too.
        SessionConfig::new(Url::parse(&server.url()).unwrap())
            .with_probe_retries(0)
            .with_play_backoff(std::time::Duration::from_millis(10))
            .with_verify_delay(std::time::Duration::from_millis(5))
    }

    async fn mock_token(server: &mut mockito::ServerGuard) -> mockito::Mock {
        server
            .mock("GET", "/api/auth/token")
            .with_status(200)
            .with_body(r#"{"stream_token": "tok-1"}"#)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_resolve_url_with_token() {
        let mut server = mockito::Server::new_async().await;
        mock_token(&mut server).await;

        let f = fixture(&server, config_for(&server));
        let url = f.controller.resolve_stream_url("abc").await.unwrap();
        assert!(url.as_str().ends_with("/hls/abc?token=tok-1"));
    }

    #[tokio::test]
    async fn test_token_failure_degrades_to_anonymous() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/auth/token")
            .with_status(500)
            .create_async()
            .await;

        let f = fixture(&server, config_for(&server));
        let url = f.controller.resolve_stream_url("abc").await.unwrap();
        assert!(url.as_str().ends_with("/hls/abc"));
        assert!(url.query().is_none());
    }

    #[tokio::test]
    async fn test_load_stream_attaches_and_publishes() {
        let mut server = mockito::Server::new_async().await;
        mock_token(&mut server).await;

        let f = fixture(&server, config_for(&server));
        f.controller.load_stream("abc").await.unwrap();

        let status = f.status.current();
        assert!(status.stream_url.as_deref().unwrap().contains("/hls/abc"));
        assert_eq!(f.controller.current_content_id().as_deref(), Some("abc"));
        assert_eq!(f.address.current().as_deref(), Some("abc"));
        assert_eq!(f.engine.attached_urls().len(), 1);
    }

    #[tokio::test]
    async fn test_session_attaches_anonymously_when_token_fails() {
        // Scenario: token resolution fails, the session still attaches
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/auth/token")
            .with_status(503)
            .create_async()
            .await;

        let f = fixture(&server, config_for(&server));
        f.controller.load_and_play("abc").await.unwrap();

        let attached = f.engine.attached_urls();
        assert_eq!(attached.len(), 1);
        assert!(attached[0].query().is_none());
    }

    #[tokio::test]
    async fn test_no_sink_is_fatal_but_local() {
        let mut server = mockito::Server::new_async().await;
        let f = fixture(&server, config_for(&server));
        *f.controller.inner.sink.lock() = None;

        let err = f.controller.load_stream("abc").await.unwrap_err();
        assert!(matches!(err, SessionError::SinkUnavailable));
        // Status untouched: the failure is local to the call
        assert_eq!(f.status.current(), status_store::SessionStatus::default());
        assert!(f.engine.attached_urls().is_empty());
    }

    #[tokio::test]
    async fn test_generation_safety_newest_load_wins() {
        let mut server = mockito::Server::new_async().await;
        mock_token(&mut server).await;

        let f = fixture(&server, config_for(&server));

        // Both loads run concurrently; whichever response lands first,
        // the final session must reflect the newer call ("bbb").
        let (result_a, result_b) =
            tokio::join!(f.controller.load_stream("aaa"), f.controller.load_stream("bbb"));

        assert!(matches!(result_a, Err(SessionError::Superseded)));
        assert!(result_b.is_ok());

        let status = f.status.current();
        assert!(status.stream_url.as_deref().unwrap().contains("/hls/bbb"));
        assert_eq!(f.controller.current_content_id().as_deref(), Some("bbb"));
    }

    #[tokio::test]
    async fn test_advisory_probe_attaches_despite_negative_result() {
        let mut server = mockito::Server::new_async().await;
        mock_token(&mut server).await;
        // Probe target never answers with success
        server
            .mock("GET", mockito::Matcher::Regex(r"^/hls/.*$".to_string()))
            .with_status(500)
            .create_async()
            .await;

        let config = SessionConfig::new(Url::parse(&server.url()).unwrap())
            .with_probe_retries(2)
            .with_probe_wait(std::time::Duration::from_millis(10));
        let f = fixture(&server, config);

        f.controller.load_stream("abc").await.unwrap();
        assert_eq!(f.engine.attached_urls().len(), 1);
    }

    #[tokio::test]
    async fn test_strict_probe_blocks_attach() {
        let mut server = mockito::Server::new_async().await;
        mock_token(&mut server).await;
        server
            .mock("GET", mockito::Matcher::Regex(r"^/hls/.*$".to_string()))
            .with_status(500)
            .create_async()
            .await;

        let config = SessionConfig::new(Url::parse(&server.url()).unwrap())
            .with_probe_retries(2)
            .with_probe_wait(std::time::Duration::from_millis(10))
            .with_strict_probe(true);
        let f = fixture(&server, config);

        let err = f.controller.load_stream("abc").await.unwrap_err();
        assert!(matches!(err, SessionError::SourceNotReady));
        assert!(f.engine.attached_urls().is_empty());
        assert!(f.status.current().player.is_error());
    }

    #[tokio::test]
    async fn test_load_and_play_reaches_playing() {
        let mut server = mockito::Server::new_async().await;
        mock_token(&mut server).await;

        let f = fixture(&server, config_for(&server));
        f.controller.load_and_play("abc").await.unwrap();

        while f.controller.transport().is_play_in_flight() {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(f.status.current().player, PlayerStatus::Playing);
        assert_eq!(f.sink.play_call_count(), 1);
    }

    #[tokio::test]
    async fn test_reload_tears_down_previous_attachment() {
        let mut server = mockito::Server::new_async().await;
        mock_token(&mut server).await;

        let f = fixture(&server, config_for(&server));
        f.controller.load_stream("abc").await.unwrap();
        f.controller.load_stream("def").await.unwrap();

        assert_eq!(f.engine.attached_urls().len(), 2);
        assert_eq!(f.engine.detach_count(), 1);
        assert_eq!(f.controller.current_content_id().as_deref(), Some("def"));
    }
}
