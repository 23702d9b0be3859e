// Logging module for structured logging using the tracing crate

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::config::{LogFormat, LoggingConfig};

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG`, when set, overrides the configured level. Output goes to
/// stdout in the configured format.
///
/// # Errors
///
/// Returns [`LoggingError::AlreadyInitialized`] if a global subscriber is
/// already set, for example on a second call.
///
/// # Examples
///
/// ```
/// use rasterchain::config::LoggingConfig;
/// use rasterchain::logging::init_subscriber;
///
/// init_subscriber(&LoggingConfig::default()).expect("Failed to initialize logging");
/// tracing::info!("Pipeline started");
/// ```
pub fn init_subscriber(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = build_filter(config)?;
    let registry = Registry::default().with(filter);

    let result = match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
    };
    result.map_err(|_| LoggingError::AlreadyInitialized)
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| LoggingError::InvalidFilter(e.to_string()))
}
