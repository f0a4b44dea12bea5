//! Immutable settings snapshot handed to the pipeline.
//!
//! The settings store owns configuration; the pipeline receives a fresh
//! snapshot at construction and on every change and never writes back.

use serde::{Deserialize, Serialize};

use crate::geocoding::GeocodingConfig;
use crate::location::KnownLocation;
use crate::status::StatusContribution;

/// A configured manual status shortcut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualStatusItem {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// 0 means no expiry.
    #[serde(default)]
    pub expiration_seconds: i64,
}

impl ManualStatusItem {
    pub fn contribution(&self) -> StatusContribution {
        StatusContribution::manual(
            self.text.clone(),
            self.icon.clone().unwrap_or_default(),
            self.expiration_seconds,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsSnapshot {
    pub google_api_key: String,
    pub slack_api_key: String,
    pub use_open_street_map: bool,
    pub known_locations: Vec<KnownLocation>,
    pub permanent_status_icons: Vec<String>,
    pub manual_status_items: Vec<ManualStatusItem>,
}

impl SettingsSnapshot {
    pub fn geocoding(&self) -> GeocodingConfig {
        GeocodingConfig {
            google_api_key: self.google_api_key.clone(),
            use_open_street_map: self.use_open_street_map,
        }
    }

    pub fn permanent_contributions(&self) -> Vec<StatusContribution> {
        self.permanent_status_icons
            .iter()
            .map(StatusContribution::permanent_icon)
            .collect()
    }

    /// Slack key missing, or Google selected without its key.
    pub fn needs_setup(&self) -> bool {
        self.slack_api_key.trim().is_empty()
            || (!self.use_open_street_map && self.google_api_key.trim().is_empty())
    }
}
