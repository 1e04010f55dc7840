//! Tracing subscriber setup for the binaries.
//!
//! `RUST_LOG` takes precedence over the configured level when set.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{RelayError, Result};

/// Install the global subscriber described by `config`.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string().to_lowercase()));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(config.show_target)
        .with_writer(std::io::stderr);

    let installed = if config.json_format {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };

    installed.map_err(|e| RelayError::ConfigError(format!("Failed to install logger: {e}")))
}
