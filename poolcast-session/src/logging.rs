//! Logging setup
//!
//! Call sites across the SDK log through `tracing`; this module wires a
//! subscriber for hosts that do not bring their own. Embedding
//! applications with an existing subscriber should skip it entirely.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// How chatty the SDK should be on stderr.
#[derive(Debug, Clone, Copy)]
pub enum LoggingMode {
    /// No subscriber installed. The default for embedded use.
    Silent,
    /// Compact stderr output at info level.
    Development,
    /// Verbose output with source locations.
    Debug,
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to initialize tracing subscriber: {0}")]
    TracingInit(String),
}

/// Install a subscriber for the given mode.
///
/// Call once, early, before any SDK activity worth logging.
///
/// # Environment Variables
///
/// - `POOLCAST_LOG_LEVEL` or `RUST_LOG`: override the filter directive
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => {
            let subscriber = Registry::default()
                .with(fmt::layer().with_target(false).compact())
                .with(env_filter("info"));
            subscriber
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
        LoggingMode::Debug => {
            let subscriber = Registry::default()
                .with(fmt::layer().pretty().with_file(true).with_line_number(true))
                .with(env_filter("debug"));
            subscriber
                .try_init()
                .map_err(|e| LoggingError::TracingInit(e.to_string()))
        }
    }
}

/// Pick the mode from `POOLCAST_LOG_MODE` (silent/development/debug),
/// defaulting to silent.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = match std::env::var("POOLCAST_LOG_MODE").as_deref() {
        Ok("development") => LoggingMode::Development,
        Ok("debug") => LoggingMode::Debug,
        _ => LoggingMode::Silent,
    };
    init_logging(mode)
}

fn env_filter(default_level: &str) -> EnvFilter {
    if let Ok(level) = std::env::var("POOLCAST_LOG_LEVEL") {
        EnvFilter::new(level)
    } else if let Ok(rust_log) = std::env::var("RUST_LOG") {
        EnvFilter::new(rust_log)
    } else {
        EnvFilter::new(default_level)
    }
}
