//! Log subscriber setup

use anyhow::{anyhow, Context, Result};
use scene_batch_core::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Build the event filter
///
/// `RUST_LOG` wins over the configured level.
///
/// # Errors
/// Returns an error when the configured level is not a valid directive
pub fn filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("invalid log level '{}'", config.level)),
    }
}

/// Install the global subscriber, writing to stderr
///
/// # Errors
/// Returns an error for an invalid level or when a subscriber is already set
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_parses() {
        let config = LoggingConfig {
            level: "scene_batch_core=debug,warn".to_string(),
            json: false,
        };
        assert!(filter(&config).is_ok());
    }
}
