//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Geocoding backend selection
//! - Known locations with their match radius
//! - Permanent status icons and manual status shortcuts
//! - Tracking behavior (auto start, startup delay, request timeout)
//!
//! API keys are not stored here; see [`super::credentials`].
//! Configuration is stored at `~/.config/whereintheworld/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::credentials::Credentials;
use super::data_dir;
use crate::error::ConfigError;
use crate::location::KnownLocation;
use crate::settings::{ManualStatusItem, SettingsSnapshot};

/// Tracking loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Start tracking once the startup delay has elapsed.
    #[serde(default = "default_true")]
    pub auto_start: bool,
    /// Grace period after launch before tracking starts.
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,
    /// Bound on every geocoding and Slack request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/whereintheworld/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Geocode with OpenStreetMap instead of Google.
    #[serde(default)]
    pub use_open_street_map: bool,
    #[serde(default = "default_permanent_status_icons")]
    pub permanent_status_icons: Vec<String>,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub known_locations: Vec<KnownLocation>,
    #[serde(default)]
    pub manual_status_items: Vec<ManualStatusItem>,
}

// Default functions
fn default_true() -> bool {
    true
}
fn default_startup_delay_secs() -> u64 {
    if cfg!(debug_assertions) {
        5
    } else {
        20
    }
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_permanent_status_icons() -> Vec<String> {
    vec![":zoom:".into(), ":around:".into()]
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            auto_start: true,
            startup_delay_secs: default_startup_delay_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl TrackingConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            use_open_street_map: false,
            permanent_status_icons: default_permanent_status_icons(),
            tracking: TrackingConfig::default(),
            known_locations: Vec::new(),
            manual_status_items: Vec::new(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or create the default file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            return Ok(cfg);
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };
        toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        Ok(())
    }

    /// Set a config value by key and persist.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    /// Insert a known location, replacing one with the same name in place.
    pub fn upsert_known_location(&mut self, location: KnownLocation) {
        match self
            .known_locations
            .iter_mut()
            .find(|l| l.name == location.name)
        {
            Some(existing) => *existing = location,
            None => self.known_locations.push(location),
        }
    }

    /// Returns whether a location with that name existed.
    pub fn remove_known_location(&mut self, name: &str) -> bool {
        let before = self.known_locations.len();
        self.known_locations.retain(|l| l.name != name);
        self.known_locations.len() != before
    }

    /// Combine with credentials into the snapshot the pipeline consumes.
    pub fn snapshot(&self, credentials: &Credentials) -> SettingsSnapshot {
        SettingsSnapshot {
            google_api_key: credentials.google_api_key.clone(),
            slack_api_key: credentials.slack_api_key.clone(),
            use_open_street_map: self.use_open_street_map,
            known_locations: self.known_locations.clone(),
            permanent_status_icons: self.permanent_status_icons.clone(),
            manual_status_items: self.manual_status_items.clone(),
        }
    }

    pub fn needs_setup(&self, credentials: &Credentials) -> bool {
        self.snapshot(credentials).needs_setup()
    }
}
