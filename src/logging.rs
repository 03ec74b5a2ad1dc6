//! Logging and tracing configuration

use crate::config::LoggingConfig;
use crate::shared::Result;
use anyhow::anyhow;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing based on configuration.
///
/// `RUST_LOG` takes precedence over `logging.level`. Must be called once.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| anyhow!("Invalid logging.level '{}': {}", config.level, e))?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let initialized = match config.format.as_str() {
        "json" => registry
            .with(fmt::layer().with_target(false).json())
            .try_init(),
        "pretty" => registry.with(fmt::layer().pretty()).try_init(),
        _ => registry.with(fmt::layer().compact()).try_init(),
    };

    initialized.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}
