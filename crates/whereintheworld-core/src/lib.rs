//! # whereintheworld Core Library
//!
//! Turns a stream of device coordinates into a human-readable location label
//! and publishes it, together with configured icons and manual overrides, as
//! the user's Slack status. The `whereintheworld` CLI is a thin layer over
//! this library.
//!
//! ## Architecture
//!
//! - **Location**: coordinates, known places and the nearest-match lookup
//! - **Geocoding**: reverse geocoding via Google or OpenStreetMap
//! - **Status**: pure composition of label, permanent icons and manual status
//! - **Integrations**: the presence service (Slack) and a deduplicating publisher
//! - **Tracking**: the actor that ties everything together
//! - **Storage**: TOML configuration and keyring-backed credentials
//!
//! ## Key Components
//!
//! - [`LocationTracker`]: spawns the tracking loop, returns a [`TrackerHandle`]
//! - [`ReverseGeocoder`]: the default [`GeoResolver`]
//! - [`SlackPresence`]: the default [`PresenceService`]
//! - [`Config`]: application configuration management

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub mod error;
pub mod events;
pub mod geocoding;
pub mod integrations;
pub mod location;
pub mod settings;
pub mod status;
pub mod storage;
pub mod tracking;

pub use error::{ConfigError, CoreError, CredentialError, PublishError, ResolveError};
pub use events::Event;
pub use geocoding::{GeoProvider, GeoResolver, GeocodingConfig, ReverseGeocoder};
pub use integrations::{PresencePublisher, PresenceService, PublishOutcome, SlackPresence};
pub use location::{
    match_known_location, Coordinate, KnownLocation, LocationFeed, LocationSource, ResolvedLocation,
};
pub use settings::{ManualStatusItem, SettingsSnapshot};
pub use status::{compose, ComposedStatus, ManualStatus, StatusContribution};
pub use storage::{Config, CredentialKey, Credentials, TrackingConfig};
pub use tracking::{LocationTracker, TrackerHandle, TrackerOptions, TrackerSnapshot, TrackingPhase};

/// Boxed future returned by the object-safe service traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Sent with every outbound request; Nominatim rejects anonymous clients.
pub const USER_AGENT: &str = concat!("whereintheworld/", env!("CARGO_PKG_VERSION"));

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, CoreError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}
