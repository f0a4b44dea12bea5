//! OpenStreetMap Nominatim reverse lookups. No API key needed.

use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{format_label, transport_error, GeoProvider};
use crate::error::ResolveError;
use crate::location::Coordinate;

const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org/";
const REVERSE_PATH: &str = "reverse";

/// Address keys, most specific first.
const PLACE_KEYS: &[&str] = &[
    "city",
    "town",
    "village",
    "municipality",
    "suburb",
    "county",
    "state",
];

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    address: HashMap<String, serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenStreetMapGeocoder {
    client: Client,
    base_url: Url,
}

impl OpenStreetMapGeocoder {
    pub fn new(client: Client) -> Self {
        let base_url = Url::parse(DEFAULT_BASE_URL).expect("static URL is valid");
        Self::with_base_url(client, base_url)
    }

    pub fn with_base_url(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub async fn reverse(&self, coordinate: Coordinate) -> Result<String, ResolveError> {
        let provider = GeoProvider::OpenStreetMap;
        let endpoint = self
            .base_url
            .join(REVERSE_PATH)
            .map_err(|e| ResolveError::Unavailable {
                provider: provider.display_name(),
                message: e.to_string(),
            })?;

        let lat = coordinate.latitude.to_string();
        let lon = coordinate.longitude.to_string();
        let resp = self
            .client
            .get(endpoint)
            .query(&[
                ("format", "jsonv2"),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("zoom", "14"),
                ("addressdetails", "1"),
            ])
            .send()
            .await
            .map_err(|e| transport_error(provider, e))?;

        if !resp.status().is_success() {
            return Err(ResolveError::Unavailable {
                provider: provider.display_name(),
                message: format!("HTTP {}", resp.status()),
            });
        }

        let body = resp.text().await.map_err(|e| transport_error(provider, e))?;
        parse_response(&body)
    }
}

fn parse_response(body: &str) -> Result<String, ResolveError> {
    let provider = GeoProvider::OpenStreetMap.display_name();
    let parsed: ReverseResponse = serde_json::from_str(body).map_err(|e| ResolveError::Parse {
        provider,
        message: e.to_string(),
    })?;

    if let Some(error) = parsed.error {
        return Err(ResolveError::Parse {
            provider,
            message: error,
        });
    }

    let get = |key: &str| parsed.address.get(key).and_then(|v| v.as_str());
    let place = PLACE_KEYS.iter().find_map(|k| get(k));
    format_label(place, get("country")).ok_or_else(|| ResolveError::Parse {
        provider,
        message: "response has no address".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_city_and_country() {
        let body = r#"{
            "place_id": 1,
            "display_name": "Marylebone, London, Greater London, England, United Kingdom",
            "address": {
                "suburb": "Marylebone",
                "city": "London",
                "state": "England",
                "country": "United Kingdom",
                "country_code": "gb"
            }
        }"#;
        assert_eq!(parse_response(body).unwrap(), "London, United Kingdom");
    }

    #[test]
    fn village_when_no_city_or_town() {
        let body = r#"{"address":{"village":"Hallstatt","state":"Upper Austria","country":"Austria"}}"#;
        assert_eq!(parse_response(body).unwrap(), "Hallstatt, Austria");
    }

    #[test]
    fn unable_to_geocode_is_parse_error() {
        let err = parse_response(r#"{"error":"Unable to geocode"}"#).unwrap_err();
        assert_eq!(
            err,
            ResolveError::Parse {
                provider: "OpenStreetMap",
                message: "Unable to geocode".into()
            }
        );
    }

    #[test]
    fn empty_address_is_parse_error() {
        assert!(matches!(
            parse_response(r#"{"address":{}}"#).unwrap_err(),
            ResolveError::Parse { .. }
        ));
    }
}
