//! Coordinates, user-registered places and resolved labels.

mod feed;
mod matcher;

pub use feed::LocationFeed;
pub use matcher::match_known_location;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Match radius used when a stored known location carries none.
pub const DEFAULT_RADIUS_METERS: f64 = 100.0;

/// A point on the globe, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite and within [-90, 90] x [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance in meters (haversine).
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().min(1.0).asin()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.latitude, self.longitude)
    }
}

/// A user-curated named place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_radius_meters")]
    pub radius_meters: f64,
}

fn default_radius_meters() -> f64 {
    DEFAULT_RADIUS_METERS
}

impl KnownLocation {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64, radius_meters: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
            radius_meters,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Where a label came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    KnownMatch,
    GeocodedGoogle,
    GeocodedOsm,
    Unknown,
}

/// The label attributed to a coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub label: String,
    pub source: LocationSource,
}

impl ResolvedLocation {
    pub fn new(label: impl Into<String>, source: LocationSource) -> Self {
        Self {
            label: label.into(),
            source,
        }
    }

    pub fn known(location: &KnownLocation) -> Self {
        Self::new(location.name.clone(), LocationSource::KnownMatch)
    }
}
