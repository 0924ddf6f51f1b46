use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "STRATUS_CONFIG";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a summary of all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Collector service settings
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Document store connection
    #[serde(default)]
    pub pocketbase: PocketBaseConfig,

    /// Weather source settings
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Log filter
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Address the collector service binds to
    #[serde(default = "default_bind_host")]
    pub host: String,

    /// Port the collector service listens on
    #[serde(default = "default_collector_port")]
    pub port: u16,

    /// Drop samples whose fetch finishes after the collector was stopped
    #[serde(default = "default_discard_after_stop")]
    pub discard_after_stop: bool,
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_collector_port() -> u16 {
    3001
}

fn default_discard_after_stop() -> bool {
    true
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            host: default_bind_host(),
            port: default_collector_port(),
            discard_after_stop: default_discard_after_stop(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Address the gateway binds to
    #[serde(default = "default_bind_host")]
    pub host: String,

    /// Port the gateway listens on
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Base URL of the collector service
    #[serde(default = "default_collector_url")]
    pub collector_url: String,
}

fn default_gateway_port() -> u16 {
    3003
}

fn default_collector_url() -> String {
    "http://localhost:3001".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_bind_host(),
            port: default_gateway_port(),
            collector_url: default_collector_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PocketBaseConfig {
    /// Base URL of the PocketBase instance
    #[serde(default = "default_pocketbase_url")]
    pub url: String,

    /// Optional auth token sent with every request
    #[serde(default)]
    pub token: Option<String>,
}

fn default_pocketbase_url() -> String {
    "http://localhost:8090".to_string()
}

impl Default for PocketBaseConfig {
    fn default() -> Self {
        Self {
            url: default_pocketbase_url(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// OpenWeatherMap API base URL
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_weather_timeout")]
    pub timeout_secs: u64,

    /// Generate random samples when no API key is configured
    #[serde(default)]
    pub simulate_without_key: bool,
}

fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_weather_timeout() -> u64 {
    10
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            timeout_secs: default_weather_timeout(),
            simulate_without_key: false,
        }
    }
}

impl WeatherConfig {
    /// The API key, if one is set and is not a template placeholder.
    pub fn effective_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && !k.to_lowercase().starts_with("your_"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing-subscriber env filter directive
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// Order: `$STRATUS_CONFIG` (must exist), then the per-user config file if
    /// present, then defaults. Environment overrides are applied last.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.display().to_string()));
                }
                Self::from_file(&path)?
            }
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Validate and log warnings.
    ///
    /// Call after tracing is initialized. Returns an error if validation fails.
    pub fn ensure_valid(&self) -> Result<ValidationResult> {
        let validation = self.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(validation)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::NotFound(format!("{}: {}", path.display(), e)))?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply environment overrides using the given lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("POCKETBASE_URL") {
            self.pocketbase.url = url;
        }
        if let Some(token) = lookup("POCKETBASE_TOKEN") {
            self.pocketbase.token = Some(token);
        }
        if let Some(key) = lookup("OPENWEATHER_API_KEY") {
            self.weather.api_key = Some(key);
        }
        if let Some(url) = lookup("COLLECTOR_SERVICE_URL") {
            self.gateway.collector_url = url;
        }
        if let Some(port) = lookup("COLLECTOR_PORT") {
            self.collector.port = parse_port("COLLECTOR_PORT", &port)?;
        }
        if let Some(port) = lookup("GATEWAY_PORT") {
            self.gateway.port = parse_port("GATEWAY_PORT", &port)?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        validate_url(&self.pocketbase.url, "pocketbase.url", &mut result);
        validate_url(&self.weather.base_url, "weather.base_url", &mut result);
        validate_url(&self.gateway.collector_url, "gateway.collector_url", &mut result);

        if self.collector.port == 0 {
            result.add_error("collector.port", "Port cannot be 0");
        }
        if self.gateway.port == 0 {
            result.add_error("gateway.port", "Port cannot be 0");
        }

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        }

        if self.weather.effective_api_key().is_none() {
            if self.weather.simulate_without_key {
                result.add_warning(
                    "weather.api_key",
                    "No API key configured - collectors will store simulated data",
                );
            } else {
                result.add_warning(
                    "weather.api_key",
                    "No API key configured - every collection will fail",
                );
            }
        }

        result
    }

    /// Per-user config file location
    fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("stratus").join("config.toml"))
    }
}

fn parse_port(name: &str, value: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} is not a valid port: {}", name, value)))
}

/// Validate a URL field
fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.add_error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }

            if url.host().is_none() {
                result.add_error(field_name, "URL must have a host");
            }

            if url.port() == Some(0) {
                result.add_error(field_name, "Port cannot be 0");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}
