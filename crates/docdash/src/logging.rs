//! Process-wide log setup.
//!
//! Library code logs through the `log` facade and opens `tracing` spans;
//! [`init_logging`] bridges the former into the latter and installs a
//! single fmt subscriber.

use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::DocdashError;

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// configured level. Calling this more than once is a no-op.
pub fn init_logging(config: &LoggingConfig) -> Result<(), DocdashError> {
    let filter = build_filter(&config.level)?;

    // Already bridged means a subscriber is installed too.
    if tracing_log::LogTracer::init().is_err() {
        return Ok(());
    }

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.json {
        tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().flatten_event(true).with_writer(std::io::stderr)),
        )
    } else {
        tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_target(false).with_writer(std::io::stderr)),
        )
    };

    if let Err(e) = result {
        log::debug!("Subscriber already installed: {}", e);
    }

    Ok(())
}

fn build_filter(level: &str) -> Result<EnvFilter, DocdashError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|e| DocdashError::Logging(format!("invalid log level '{}': {}", level, e)))
}
