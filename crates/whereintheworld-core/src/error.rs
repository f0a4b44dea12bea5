//! Core error types for whereintheworld-core.
//!
//! Every failure in the location-to-status pipeline is recoverable: the
//! tracking loop reports these errors as events and keeps running.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for whereintheworld-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Credential store errors
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Reverse-geocoding errors
    #[error("Geocoding error: {0}")]
    Resolve(#[from] ResolveError),

    /// Presence publishing errors
    #[error("Presence error: {0}")]
    Publish(#[from] PublishError),

    /// The tracking loop is gone (shut down or panicked)
    #[error("Tracking loop is not running")]
    TrackerClosed,

    /// HTTP client construction errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors produced while turning a coordinate into a place label.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The selected backend needs an API key and none is configured.
    /// Not retryable until settings change.
    #[error("No API key configured for {provider}")]
    MissingCredential { provider: &'static str },

    /// NaN or out-of-range coordinate
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// Transport failure, timeout or non-success response
    #[error("{provider} geocoding unavailable: {message}")]
    Unavailable {
        provider: &'static str,
        message: String,
    },

    /// The backend answered but the body held no usable place
    #[error("Could not parse {provider} response: {message}")]
    Parse {
        provider: &'static str,
        message: String,
    },
}

impl ResolveError {
    /// Whether the next natural event may succeed without a settings change.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Parse { .. })
    }
}

/// Errors produced while pushing a status to the presence service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// Presence API key is empty; no call was made.
    #[error("No Slack API key configured")]
    MissingCredential,

    /// Transport failure, timeout or an API-level error
    #[error("Slack status update failed: {0}")]
    Unavailable(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Dot-path key that does not exist in the config tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Config directory could not be determined or created
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

/// OS keyring errors.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Keyring error for '{key}': {source}")]
    Keyring {
        key: String,
        #[source]
        source: keyring::Error,
    },
}

impl From<reqwest::Error> for PublishError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PublishError::Unavailable("request timed out".to_string())
        } else {
            PublishError::Unavailable(err.to_string())
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
