pub mod config;
pub mod error;

pub use config::{
    CollectorConfig, Config, GatewayConfig, LoggingConfig, PocketBaseConfig, ValidationResult,
    WeatherConfig,
};
pub use error::{ConfigError, ServiceError};

use anyhow::Result;

/// Initialize tracing for a service process.
///
/// `RUST_LOG` wins over the configured filter when set.
pub fn init(logging: &LoggingConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.filter)),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::info!("Stratus core initialized");
    Ok(())
}
