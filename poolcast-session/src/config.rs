//! Session configuration
//!
//! One builder-style struct covers the whole SDK: endpoint composition,
//! retry budgets, probe policy and the background cadences. Defaults
//! match the deployed system; override per call site.

use std::time::Duration;

use poolcast_api::{ApiConfig, DEFAULT_POOL_PATH, DEFAULT_TOKEN_PATH};
use url::Url;

/// Default play-retry budget per `load_and_play` call.
pub const DEFAULT_MAX_PLAY_ATTEMPTS: u32 = 3;
/// Backoff unit before play attempt `n` (waits `unit * n`).
pub const DEFAULT_PLAY_BACKOFF: Duration = Duration::from_millis(1000);
/// Wait after a successful play call before verifying the sink advances.
pub const DEFAULT_VERIFY_DELAY: Duration = Duration::from_millis(500);
/// Availability probes issued before attaching.
pub const DEFAULT_PROBE_RETRIES: u32 = 5;
/// Pool snapshot cadence.
pub const DEFAULT_POOL_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Descriptor catalog cadence. Deliberately not a multiple of the pool
/// cadence so the two refreshes do not synchronize into load bursts.
pub const DEFAULT_CATALOG_REFRESH_INTERVAL: Duration = Duration::from_secs(95);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub base_url: Url,
    pub max_play_attempts: u32,
    pub play_backoff: Duration,
    pub verify_delay: Duration,
    pub probe_retries: u32,
    /// When true, a negative availability probe aborts the load instead
    /// of logging a warning.
    pub strict_probe: bool,
    pub pool_poll_interval: Duration,
    pub catalog_refresh_interval: Duration,
    pub api_timeout: Duration,
    pub probe_timeout: Duration,
    pub probe_wait: Duration,
    pub pool_path: String,
    pub token_path: String,
}

impl SessionConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            max_play_attempts: DEFAULT_MAX_PLAY_ATTEMPTS,
            play_backoff: DEFAULT_PLAY_BACKOFF,
            verify_delay: DEFAULT_VERIFY_DELAY,
            probe_retries: DEFAULT_PROBE_RETRIES,
            strict_probe: false,
            pool_poll_interval: DEFAULT_POOL_POLL_INTERVAL,
            catalog_refresh_interval: DEFAULT_CATALOG_REFRESH_INTERVAL,
            api_timeout: poolcast_api::DEFAULT_API_TIMEOUT,
            probe_timeout: poolcast_api::DEFAULT_PROBE_TIMEOUT,
            probe_wait: poolcast_api::DEFAULT_PROBE_WAIT,
            pool_path: DEFAULT_POOL_PATH.to_string(),
            token_path: DEFAULT_TOKEN_PATH.to_string(),
        }
    }

    pub fn with_max_play_attempts(mut self, attempts: u32) -> Self {
        self.max_play_attempts = attempts;
        self
    }

    pub fn with_play_backoff(mut self, backoff: Duration) -> Self {
        self.play_backoff = backoff;
        self
    }

    pub fn with_verify_delay(mut self, delay: Duration) -> Self {
        self.verify_delay = delay;
        self
    }

    /// `0` disables the availability probe entirely.
    pub fn with_probe_retries(mut self, retries: u32) -> Self {
        self.probe_retries = retries;
        self
    }

    pub fn with_strict_probe(mut self, strict: bool) -> Self {
        self.strict_probe = strict;
        self
    }

    pub fn with_pool_poll_interval(mut self, interval: Duration) -> Self {
        self.pool_poll_interval = interval;
        self
    }

    pub fn with_catalog_refresh_interval(mut self, interval: Duration) -> Self {
        self.catalog_refresh_interval = interval;
        self
    }

    pub fn with_api_timeout(mut self, timeout: Duration) -> Self {
        self.api_timeout = timeout;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_probe_wait(mut self, wait: Duration) -> Self {
        self.probe_wait = wait;
        self
    }

    pub fn with_pool_path(mut self, path: impl Into<String>) -> Self {
        self.pool_path = path.into();
        self
    }

    pub fn with_token_path(mut self, path: impl Into<String>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Derive the HTTP client settings.
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(self.base_url.clone())
            .with_pool_path(self.pool_path.clone())
            .with_token_path(self.token_path.clone())
            .with_api_timeout(self.api_timeout)
            .with_probe_timeout(self.probe_timeout)
            .with_probe_wait(self.probe_wait)
    }
}
