//! Reverse geocoding -- coordinates to a human-readable place label.
//!
//! Two backends exist: Google Geocoding (needs an API key) and OpenStreetMap
//! Nominatim (keyless). [`GeocodingConfig::use_open_street_map`] is the only
//! selector; a Google key is ignored while OpenStreetMap is selected.

mod google;
mod openstreetmap;

pub use google::GoogleGeocoder;
pub use openstreetmap::OpenStreetMapGeocoder;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, ResolveError};
use crate::location::{Coordinate, LocationSource, ResolvedLocation};
use crate::{http_client, BoxFuture};

/// Default bound on a single geocoding request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoProvider {
    Google,
    OpenStreetMap,
}

impl GeoProvider {
    pub fn display_name(&self) -> &'static str {
        match self {
            GeoProvider::Google => "Google",
            GeoProvider::OpenStreetMap => "OpenStreetMap",
        }
    }

    pub fn source(&self) -> LocationSource {
        match self {
            GeoProvider::Google => LocationSource::GeocodedGoogle,
            GeoProvider::OpenStreetMap => LocationSource::GeocodedOsm,
        }
    }
}

/// The part of the settings the resolver reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeocodingConfig {
    pub google_api_key: String,
    pub use_open_street_map: bool,
}

impl GeocodingConfig {
    pub fn provider(&self) -> GeoProvider {
        if self.use_open_street_map {
            GeoProvider::OpenStreetMap
        } else {
            GeoProvider::Google
        }
    }
}

/// Anything that can turn a coordinate into a label.
///
/// The tracking loop only talks to this trait, so tests drive it with fakes.
pub trait GeoResolver: Send + Sync {
    fn resolve<'a>(
        &'a self,
        coordinate: Coordinate,
        config: &'a GeocodingConfig,
    ) -> BoxFuture<'a, Result<ResolvedLocation, ResolveError>>;
}

/// HTTP resolver dispatching between the Google and OpenStreetMap backends.
#[derive(Debug, Clone)]
pub struct ReverseGeocoder {
    google: GoogleGeocoder,
    osm: OpenStreetMapGeocoder,
}

impl ReverseGeocoder {
    /// Production endpoints with a shared client bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, CoreError> {
        let client = http_client(timeout)?;
        Ok(Self {
            google: GoogleGeocoder::new(client.clone()),
            osm: OpenStreetMapGeocoder::new(client),
        })
    }

    pub fn with_backends(google: GoogleGeocoder, osm: OpenStreetMapGeocoder) -> Self {
        Self { google, osm }
    }

    pub async fn reverse(
        &self,
        coordinate: Coordinate,
        config: &GeocodingConfig,
    ) -> Result<ResolvedLocation, ResolveError> {
        if !coordinate.is_valid() {
            return Err(ResolveError::InvalidCoordinate(coordinate.to_string()));
        }

        let provider = config.provider();
        let label = match provider {
            GeoProvider::OpenStreetMap => self.osm.reverse(coordinate).await?,
            GeoProvider::Google => {
                if config.google_api_key.trim().is_empty() {
                    return Err(ResolveError::MissingCredential {
                        provider: provider.display_name(),
                    });
                }
                self.google.reverse(coordinate, &config.google_api_key).await?
            }
        };

        debug!(%coordinate, provider = provider.display_name(), %label, "reverse geocoded");
        Ok(ResolvedLocation::new(label, provider.source()))
    }
}

impl GeoResolver for ReverseGeocoder {
    fn resolve<'a>(
        &'a self,
        coordinate: Coordinate,
        config: &'a GeocodingConfig,
    ) -> BoxFuture<'a, Result<ResolvedLocation, ResolveError>> {
        Box::pin(self.reverse(coordinate, config))
    }
}

/// "Place, Country", or whichever of the two exists.
pub(crate) fn format_label(place: Option<&str>, country: Option<&str>) -> Option<String> {
    let place = place.map(str::trim).filter(|s| !s.is_empty());
    let country = country.map(str::trim).filter(|s| !s.is_empty());
    match (place, country) {
        (Some(p), Some(c)) if p != c => Some(format!("{p}, {c}")),
        (Some(p), _) => Some(p.to_string()),
        (None, Some(c)) => Some(c.to_string()),
        (None, None) => None,
    }
}

pub(crate) fn transport_error(provider: GeoProvider, err: reqwest::Error) -> ResolveError {
    let message = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.to_string()
    };
    ResolveError::Unavailable {
        provider: provider.display_name(),
        message,
    }
}
