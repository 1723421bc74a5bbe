//! Log subscriber setup.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogConfig, LogFormat};
use crate::error::EditorError;

/// Installs the global `tracing` subscriber. `RUST_LOG` takes precedence over
/// `config.level`.
///
/// # Errors
///
/// Returns [`EditorError::Config`] if the level is not a valid filter
/// directive, or [`EditorError::Internal`] if a global subscriber is
/// already installed.
pub fn init_tracing(config: &LogConfig) -> Result<(), EditorError> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(false)).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };
    result.map_err(|e| EditorError::Internal(anyhow::anyhow!(e)))
}

fn build_filter(config: &LogConfig) -> Result<EnvFilter, EditorError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| EditorError::Config {
            message: format!("invalid log level '{}': {e}", config.level),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_fails_cleanly() {
        let config = LogConfig::default();
        // The first call may lose to another test; either way the second must fail.
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }

    #[test]
    fn builds_filter_from_level() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LogConfig {
            level: "geometa_core=debug,warn".to_string(),
            ..LogConfig::default()
        };
        assert!(build_filter(&config).is_ok());
    }
}
