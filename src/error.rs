use std::io;
use thiserror::Error;

/// Core error types for the identity-resolution engine
#[derive(Error, Debug)]
pub enum VerdictError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Geolocation error: {0}")]
    Geolocation(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid IP address: {0}")]
    InvalidIp(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, VerdictError>;
