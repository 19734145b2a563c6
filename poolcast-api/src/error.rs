use thiserror::Error;

/// Errors produced by the poolcast HTTP surface.
///
/// Timeouts and connection trouble are normal, expected failure modes in
/// this system (upstream instances come and go), so they are ordinary
/// values here, never panics.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request hit its bounded timeout and was cancelled.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success status.
    #[error("HTTP error: status {0}")]
    Http(u16),

    /// The pool endpoint answered with a non-success status.
    ///
    /// Kept separate from `Http` so pool polling can be logged and
    /// swallowed without masking playback-path failures.
    #[error("pool unavailable: status {0}")]
    PoolUnavailable(u16),

    /// The response body could not be decoded into the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// Connection-level failure (DNS, refused, reset).
    #[error("network error: {0}")]
    Network(String),

    /// No stream token could be obtained. Callers degrade to an anonymous
    /// request rather than failing the load.
    #[error("stream token unavailable: {0}")]
    AuthTokenUnavailable(String),

    /// An endpoint URL could not be composed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ApiError::Timeout
        } else if error.is_decode() {
            ApiError::Parse(error.to_string())
        } else if let Some(status) = error.status() {
            ApiError::Http(status.as_u16())
        } else {
            ApiError::Network(error.to_string())
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(error: url::ParseError) -> Self {
        ApiError::InvalidUrl(error.to_string())
    }
}
