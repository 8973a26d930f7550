use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;

use crate::error::{Result, VerdictError};

/// Configuration for the identity-resolution engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Listen address:port for the API server
    pub listen_addr: String,

    /// Directory where geolocation cache files are stored
    pub cache_dir: PathBuf,

    /// External IP-intelligence service configuration
    pub intel: IntelConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// External lookup service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntelConfig {
    /// Base URL of the geolocation/ISP-intelligence endpoint.
    /// The resolved IP is appended as a path segment.
    pub endpoint: String,

    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,

    /// Total request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when RUST_LOG is not set
    pub level: String,

    /// Whether to log to console
    pub console: bool,
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://ip-api.com/json".to_string(),
            connect_timeout_secs: 3,
            request_timeout_secs: 5,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            cache_dir: PathBuf::from("./geo-cache"),
            intel: IntelConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                console: true,
            },
        }
    }
}

impl EngineConfig {
    /// Load config from file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file_content = fs::read_to_string(path).await.map_err(|e| {
            VerdictError::Configuration(format!("Failed to read config file: {}", e))
        })?;

        let config: Self = serde_json::from_str(&file_content)
            .map_err(|e| VerdictError::Configuration(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Save config to file
    #[allow(dead_code)]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config_json = serde_json::to_string_pretty(self).map_err(|e| {
            VerdictError::Configuration(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, config_json).await.map_err(|e| {
            VerdictError::Configuration(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Create the cache directory if it doesn't exist
    pub async fn ensure_directories(&self) -> Result<()> {
        if !self.cache_dir.exists() {
            fs::create_dir_all(&self.cache_dir).await.map_err(|e| {
                VerdictError::Configuration(format!("Failed to create cache directory: {}", e))
            })?;
        }

        Ok(())
    }

    /// Validate config values
    pub fn validate(&self) -> Result<()> {
        if SocketAddr::from_str(&self.listen_addr).is_err() {
            return Err(VerdictError::Configuration(format!(
                "Invalid listen address: {}",
                self.listen_addr
            )));
        }

        if self.intel.endpoint.is_empty() {
            return Err(VerdictError::Configuration(
                "Intel endpoint cannot be empty".to_string(),
            ));
        }

        if self.intel.connect_timeout_secs == 0 || self.intel.request_timeout_secs == 0 {
            return Err(VerdictError::Configuration(
                "Lookup timeouts cannot be zero".to_string(),
            ));
        }

        Ok(())
    }
}
