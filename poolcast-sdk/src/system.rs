//! StreamSystem - main entry point for the SDK
//!
//! Wires the API client, status store, playback transport, session
//! controller, pool watcher and descriptor catalog together, and owns the
//! address-watcher task for the lifetime of the system.

use std::sync::Arc;

use poolcast_api::ApiClient;
use poolcast_session::{
    AdaptiveEngine, AddressMirror, DescriptorCache, InMemoryAddress, MediaSink, PlaybackTransport,
    PoolWatcher, SessionConfig, StreamSessionController,
};
use status_store::{SessionStatus, StatusChange, StatusStore, Subscription};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::SdkError;

/// Main system entry point.
///
/// Must be created inside a tokio runtime: the pool poll loop, catalog
/// refresh and address watcher are spawned at construction and cancelled
/// when the system is dropped.
///
/// # Example
///
/// ```rust,ignore
/// use poolcast_sdk::StreamSystem;
/// use poolcast_session::SessionConfig;
///
/// #[tokio::main]
/// async fn main() -> Result<(), poolcast_sdk::SdkError> {
///     let config = SessionConfig::new("http://tv-box:8000".parse().unwrap());
///     let system = StreamSystem::connect(config, engine, Some(sink), None)?;
///
///     let _sub = system.subscribe(|change| {
///         println!("status: {} / {}", change.status.player, change.status.transport);
///     });
///
///     system.load_and_play("my-channel").await?;
///     Ok(())
/// }
/// ```
pub struct StreamSystem {
    status: StatusStore,
    controller: StreamSessionController,
    pool: PoolWatcher,
    catalog: DescriptorCache,
    address_watcher: JoinHandle<()>,
}

impl StreamSystem {
    /// Wire up a system against the configured server.
    ///
    /// `sink` may be attached later via the controller; loads without one
    /// fail locally. A missing `address` mirror falls back to an
    /// in-memory one. If the mirror already carries a content identifier
    /// (a page load with a pre-selected feed), that stream is loaded
    /// immediately.
    pub fn connect(
        config: SessionConfig,
        engine: Arc<dyn AdaptiveEngine>,
        sink: Option<Arc<dyn MediaSink>>,
        address: Option<Arc<dyn AddressMirror>>,
    ) -> Result<Self, SdkError> {
        let api = ApiClient::new(config.api_config())?;
        let status = StatusStore::new();

        let pool = PoolWatcher::spawn(api.clone(), config.pool_poll_interval);
        let transport = PlaybackTransport::new(
            engine,
            status.clone(),
            &config,
            Some(pool.refresh_handle()),
        );

        let address: Arc<dyn AddressMirror> =
            address.unwrap_or_else(|| Arc::new(InMemoryAddress::new()));
        let catalog = DescriptorCache::spawn(api.clone(), config.catalog_refresh_interval);

        let controller = StreamSessionController::new(
            api,
            status.clone(),
            transport,
            address.clone(),
            sink,
            config,
        );

        let address_watcher = spawn_address_watcher(controller.clone(), address.changes());

        Ok(Self {
            status,
            controller,
            pool,
            catalog,
            address_watcher,
        })
    }

    /// Load a content identifier and start playback with retry.
    pub async fn load_and_play(&self, content_id: &str) -> Result<(), SdkError> {
        self.controller.load_and_play(content_id).await?;
        Ok(())
    }

    /// Load a content identifier without starting playback.
    pub async fn load_stream(&self, content_id: &str) -> Result<(), SdkError> {
        self.controller.load_stream(content_id).await?;
        Ok(())
    }

    /// Current session status snapshot.
    pub fn status(&self) -> SessionStatus {
        self.status.current()
    }

    /// Register a status observer. Dropping the subscription
    /// deregisters it.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&StatusChange) + Send + Sync + 'static,
    {
        self.status.subscribe(callback)
    }

    /// Watch the session status reactively.
    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.watch()
    }

    pub fn pool(&self) -> &PoolWatcher {
        &self.pool
    }

    pub fn catalog(&self) -> &DescriptorCache {
        &self.catalog
    }

    pub fn controller(&self) -> &StreamSessionController {
        &self.controller
    }
}

impl Drop for StreamSystem {
    fn drop(&mut self) {
        self.address_watcher.abort();
    }
}

/// Watch the address mirror and answer externally driven changes with an
/// equivalent load. The controller's own publishes echo through the same
/// channel; they are recognised by comparing against the active session
/// and skipped.
fn spawn_address_watcher(
    controller: StreamSessionController,
    mut changes: watch::Receiver<Option<String>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // A pre-selected identifier (page load with a fragment) starts
        // the first session.
        let initial = changes.borrow_and_update().clone();
        if let Some(content_id) = initial {
            load_from_address(&controller, &content_id).await;
        }

        while changes.changed().await.is_ok() {
            let target = changes.borrow_and_update().clone();
            let Some(content_id) = target else { continue };
            if controller.current_content_id().as_deref() == Some(content_id.as_str()) {
                continue;
            }
            load_from_address(&controller, &content_id).await;
        }
        tracing::debug!("address watcher stopped");
    })
}

async fn load_from_address(controller: &StreamSessionController, content_id: &str) {
    tracing::info!(content_id, "address changed, loading stream");
    if let Err(e) = controller.load_and_play(content_id).await {
        tracing::warn!(content_id, error = %e, "address-driven load failed");
    }
}
