//! Structured logging setup

use tracing_subscriber::EnvFilter;

use crate::{config::Config, error::Result};

/// Build the log filter for `config`
///
/// `RUST_LOG` wins when set; otherwise the configured log level applies,
/// falling back to `info` when it does not parse.
pub fn env_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| level_filter(&config.service.log_level))
}

/// Filter for a configured level directive, `info` when it does not parse
fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the JSON subscriber
///
/// A second call leaves the first subscriber in place.
pub fn init_tracing(config: &Config) -> Result<()> {
    let installed = tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter(config))
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            environment = %config.service.environment,
            "Tracing initialized for service: {}",
            config.service.name
        );
    }

    Ok(())
}

/// Flush and log shutdown
pub fn shutdown_tracing() {
    tracing::info!("Tracing shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        let config = Config::default();
        assert!(init_tracing(&config).is_ok());
        assert!(init_tracing(&config).is_ok());
    }

    #[test]
    fn test_bad_level_falls_back() {
        assert_eq!(level_filter("not a [level").to_string(), "info");
    }

    #[test]
    fn test_configured_level_is_used() {
        assert_eq!(level_filter("debug").to_string(), "debug");
        assert_eq!(
            level_filter("open311_service=trace").to_string(),
            "open311_service=trace"
        );
    }
}
