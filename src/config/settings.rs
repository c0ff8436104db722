//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Flat environment variables the service has always been deployed with.
/// They take precedence over every other source.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("LEONARDO_API_KEY", "provider.api_key"),
    ("GCP_BUCKET_NAME", "storage.bucket"),
    ("GCP_FOLDER_NAME", "storage.folder"),
    ("LOCAL_SAVE_PATH", "storage.scratch_dir"),
    ("PORT", "server.port"),
    ("GOOGLE_APPLICATION_CREDENTIALS", "storage.credentials_path"),
];

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Generation provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_provider_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_provider_url() -> String {
    "https://cloud.leonardo.ai/api/rest/v1".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_provider_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Status polling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

fn default_max_attempts() -> u32 {
    10
}

fn default_interval() -> u64 {
    10
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_secs: default_interval(),
        }
    }
}

/// Outbound transport retry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_retry_statuses")]
    pub retry_statuses: Vec<u16>,
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_factor() -> f64 {
    0.3
}

fn default_retry_statuses() -> Vec<u16> {
    vec![500, 502, 503, 504]
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_factor: default_backoff_factor(),
            retry_statuses: default_retry_statuses(),
        }
    }
}

/// Object storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub credentials_path: Option<String>,
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: String,
    #[serde(default = "default_gcs_base")]
    pub api_base: String,
    #[serde(default = "default_gcs_base")]
    pub public_base: String,
}

fn default_scratch_dir() -> String {
    "generated_images".to_string()
}

fn default_gcs_base() -> String {
    "https://storage.googleapis.com".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            folder: String::new(),
            credentials_path: None,
            scratch_dir: default_scratch_dir(),
            api_base: default_gcs_base(),
            public_base: default_gcs_base(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Plain-text copy of the log, appended to alongside stdout
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?
            .set_default("polling.max_attempts", i64::from(default_max_attempts()))?
            .set_default("polling.interval_secs", default_interval() as i64)?
            .set_default("transport.max_retries", i64::from(default_max_retries()))?
            .set_default("transport.backoff_factor", default_backoff_factor())?
            // Load from configuration file
            .add_source(
                File::with_name(path.as_ref().to_str().unwrap_or("config/default"))
                    .required(false),
            )
            // Override with environment variables (prefixed with IMG_RELAY__)
            .add_source(
                Environment::with_prefix("IMG_RELAY")
                    .separator("__")
                    .try_parsing(true),
            );

        for (var, key) in ENV_OVERRIDES {
            builder = builder.set_override_option(*key, std::env::var(var).ok())?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }
        if self.provider.api_key.trim().is_empty() {
            return Err(invalid(
                "Provider API key is required (set LEONARDO_API_KEY)",
            ));
        }
        if self.storage.bucket.trim().is_empty() {
            return Err(invalid("Storage bucket is required (set GCP_BUCKET_NAME)"));
        }
        if self.polling.max_attempts == 0 {
            return Err(invalid("polling.max_attempts must be at least 1"));
        }
        if !self.transport.backoff_factor.is_finite() || self.transport.backoff_factor < 0.0 {
            return Err(invalid("transport.backoff_factor must be a non-negative number"));
        }
        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err(invalid(&format!(
                "logging.format '{}' is invalid. Must be 'json' or 'pretty'",
                self.logging.format
            )));
        }
        if matches!(&self.logging.file, Some(path) if path.trim().is_empty()) {
            return Err(invalid("logging.file cannot be empty"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> AppError {
    AppError::Config(config::ConfigError::Message(message.to_string()))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            provider: ProviderConfig::default(),
            polling: PollingConfig::default(),
            transport: TransportConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
