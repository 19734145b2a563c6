//! HTTP client for the poolcast server surface
//!
//! Thin, typed wrapper over the endpoints this SDK consumes: pool
//! snapshot, instance release, stream descriptors, stream tokens and the
//! availability probe. Every request carries its own bounded timeout; a
//! timed-out request is cancelled and reported as `ApiError::Timeout`,
//! never unwound as a panic.

use std::time::Duration;

use url::Url;

use crate::error::{ApiError, Result};
use crate::types::{PoolSnapshot, StreamDescriptor, TokenResponse};

/// Default timeout for API calls.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(5);
/// Default timeout for a single availability probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);
/// Default wait between availability probes.
pub const DEFAULT_PROBE_WAIT: Duration = Duration::from_secs(3);
/// Default pool endpoint path. Some deployments serve `/api/ace-pool`
/// instead; override via [`ApiConfig::with_pool_path`].
pub const DEFAULT_POOL_PATH: &str = "/api/ace_pool";
/// Default stream-token endpoint path.
pub const DEFAULT_TOKEN_PATH: &str = "/api/auth/token";

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub pool_path: String,
    pub token_path: String,
    pub api_timeout: Duration,
    pub probe_timeout: Duration,
    pub probe_wait: Duration,
}

impl ApiConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            pool_path: DEFAULT_POOL_PATH.to_string(),
            token_path: DEFAULT_TOKEN_PATH.to_string(),
            api_timeout: DEFAULT_API_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            probe_wait: DEFAULT_PROBE_WAIT,
        }
    }

    pub fn with_pool_path(mut self, path: impl Into<String>) -> Self {
        self.pool_path = path.into();
        self
    }

    pub fn with_token_path(mut self, path: impl Into<String>) -> Self {
        self.token_path = path.into();
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
}

/// Client for the poolcast server endpoints.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Fetch the current pool snapshot.
    ///
    /// Bounded to the API timeout; timeouts and non-success statuses are
    /// reported as pool-specific failures so polling callers can log and
    /// keep the last-known-good snapshot.
    pub async fn fetch_pool(&self) -> Result<PoolSnapshot> {
        let url = self.endpoint(&self.config.pool_path)?;
        let response = self
            .http
            .get(url)
            .timeout(self.config.api_timeout)
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::PoolUnavailable(status.as_u16()));
        }

        let snapshot = response
            .json::<PoolSnapshot>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        tracing::debug!(instances = snapshot.len(), "fetched pool snapshot");
        Ok(snapshot)
    }

    /// Ask the pool service to release an instance's reservation.
    ///
    /// Advisory: the server owns the lock and may have released it
    /// already. Releasing an already-available instance is a server-side
    /// no-op, so 404 counts as success here.
    pub async fn release_instance(&self, instance_id: &str) -> Result<()> {
        let mut url = self.endpoint(&self.config.pool_path)?;
        push_segment(&mut url, instance_id)?;

        let response = self
            .http
            .delete(url)
            .timeout(self.config.api_timeout)
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            tracing::info!(instance_id, "requested pool instance release");
            Ok(())
        } else {
            Err(ApiError::PoolUnavailable(status.as_u16()))
        }
    }

    /// Fetch the descriptor for one content identifier.
    pub async fn fetch_descriptor(&self, content_id: &str) -> Result<StreamDescriptor> {
        let mut url = self.endpoint("/api/stream")?;
        push_segment(&mut url, content_id)?;

        let response = self
            .http
            .get(url)
            .timeout(self.config.api_timeout)
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Http(status.as_u16()));
        }

        response
            .json::<StreamDescriptor>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Fetch a short-lived stream token.
    ///
    /// Every failure maps to `AuthTokenUnavailable`: deployments may run
    /// without authentication, so callers treat this as a cue to degrade
    /// to an anonymous request rather than a fatal error.
    pub async fn fetch_token(&self) -> Result<String> {
        let url = self.endpoint(&self.config.token_path)?;
        let response = self
            .http
            .get(url)
            .timeout(self.config.api_timeout)
            .send()
            .await
            .map_err(|e| ApiError::AuthTokenUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::AuthTokenUnavailable(format!("status {}", status.as_u16())));
        }

        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(|e| ApiError::AuthTokenUnavailable(e.to_string()))?;
        Ok(token.stream_token)
    }

    /// Compose the transport manifest URL for a content identifier.
    ///
    /// The token query parameter is only present when a token is supplied;
    /// anonymous deployments get a bare URL.
    pub fn hls_url(&self, content_id: &str, token: Option<&str>) -> Result<Url> {
        let mut url = self.endpoint("/hls")?;
        push_segment(&mut url, content_id)?;
        if let Some(token) = token {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }

    /// Issue a single bounded availability probe against a transport URL.
    ///
    /// Timeouts and connection failures are a negative probe, not an
    /// error.
    pub async fn probe_source(&self, url: &Url) -> bool {
        match self
            .http
            .get(url.clone())
            .timeout(self.config.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "availability probe failed");
                false
            }
        }
    }

    /// Probe a transport URL until it answers, waiting between attempts.
    ///
    /// Issues at most `max_retries` probes. Returns whether the source
    /// ever answered with success.
    pub async fn wait_for_source_ready(&self, url: &Url, max_retries: u32) -> bool {
        for attempt in 1..=max_retries {
            if self.probe_source(url).await {
                tracing::debug!(attempt, "stream source is ready");
                return true;
            }
            if attempt < max_retries {
                tokio::time::sleep(self.config.probe_wait).await;
            }
        }
        tracing::warn!(max_retries, url = %url, "stream source never became ready");
        false
    }

    /// Resolve a configured path against the base URL, keeping any path
    /// prefix the base carries (reverse-proxy deployments).
    fn endpoint(&self, path: &str) -> Result<Url> {
        let mut url = self.config.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidUrl("base URL cannot have segments".to_string()))?;
            segments.pop_if_empty();
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
        }
        Ok(url)
    }
}

fn push_segment(url: &mut Url, segment: &str) -> Result<()> {
    url.path_segments_mut()
        .map_err(|_| ApiError::InvalidUrl("URL cannot have segments".to_string()))?
        .pop_if_empty()
        .push(segment);
    Ok(())
}
