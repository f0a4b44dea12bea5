mod config;
pub mod credentials;

pub use config::{Config, TrackingConfig};
pub use credentials::{CredentialKey, Credentials};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/whereintheworld[-dev]/` based on WHEREINTHEWORLD_ENV.
///
/// Set WHEREINTHEWORLD_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("WHEREINTHEWORLD_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("whereintheworld-dev")
    } else {
        base_dir.join("whereintheworld")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
