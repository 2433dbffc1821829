//! Error types for the WASM signaling server

use thiserror::Error;

/// Errors that can occur while managing server state
#[derive(Error, Debug)]
pub enum SignalingError {
    /// Client is not connected
    #[error("Unknown client")]
    UnknownClient,

    /// State snapshot could not be read or written
    #[error("State file error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from client requests
#[derive(Error, Debug)]
pub enum ClientRequestError {
    /// Missing or malformed `X-Client-Id` header
    #[error("Missing or invalid X-Client-Id header")]
    MissingClientId,

    /// Body could not be read
    #[error("Failed to read body: {0}")]
    Body(String),

    /// JSON parsing error
    #[error("Invalid event: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
}
