//! Logging
//!
//! Structured logging through the `tracing` crate. The library only emits
//! events; binaries call [`init`] once to install a subscriber.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{Error, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable that overrides the configured level.
pub const LOG_ENV: &str = "RUST_LOG";

/// Installs the global subscriber.
///
/// Returns Ok without doing anything if a subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = build_env_filter(config)?;
    let registry = Registry::default().with(filter);

    let installed = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init(),
    };
    if installed.is_err() {
        tracing::debug!("Subscriber already installed");
    }
    Ok(())
}

/// Builds the filter from the environment, falling back to the configured level.
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| Error::Config(format!("invalid log level {}: {}", config.level, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig::default();
        init(&config).unwrap();
        init(&config).unwrap();
    }

    #[test]
    fn test_level_directives() {
        let config = LoggingConfig {
            level: "entity_assign=trace,warn".to_string(),
            format: LogFormat::Json,
        };
        assert!(build_env_filter(&config).is_ok());
    }
}
