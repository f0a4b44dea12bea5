//! Google Geocoding API reverse lookups.

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::{format_label, transport_error, GeoProvider};
use crate::error::ResolveError;
use crate::location::Coordinate;

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/";
const GEOCODE_PATH: &str = "maps/api/geocode/json";

/// Component types, most specific first.
const PLACE_TYPES: &[&str] = &[
    "locality",
    "postal_town",
    "sublocality",
    "administrative_area_level_2",
    "administrative_area_level_1",
];

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GoogleGeocoder {
    client: Client,
    base_url: Url,
}

impl GoogleGeocoder {
    pub fn new(client: Client) -> Self {
        let base_url = Url::parse(DEFAULT_BASE_URL).expect("static URL is valid");
        Self::with_base_url(client, base_url)
    }

    pub fn with_base_url(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Reverse geocode `coordinate` into a label.
    pub async fn reverse(&self, coordinate: Coordinate, api_key: &str) -> Result<String, ResolveError> {
        let provider = GeoProvider::Google;
        let endpoint = self
            .base_url
            .join(GEOCODE_PATH)
            .map_err(|e| ResolveError::Unavailable {
                provider: provider.display_name(),
                message: e.to_string(),
            })?;

        let latlng = format!("{},{}", coordinate.latitude, coordinate.longitude);
        let resp = self
            .client
            .get(endpoint)
            .query(&[("latlng", latlng.as_str()), ("key", api_key)])
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
    let provider = GeoProvider::Google.display_name();
    let parsed: GeocodeResponse = serde_json::from_str(body).map_err(|e| ResolveError::Parse {
        provider,
        message: e.to_string(),
    })?;

    match parsed.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => {
            return Err(ResolveError::Parse {
                provider,
                message: "no results for coordinate".to_string(),
            })
        }
        other => {
            let detail = parsed.error_message.unwrap_or_default();
            return Err(ResolveError::Unavailable {
                provider,
                message: format!("{other} {detail}").trim().to_string(),
            });
        }
    }

    let find = |wanted: &str| -> Option<&str> {
        parsed
            .results
            .iter()
            .flat_map(|r| r.address_components.iter())
            .find(|c| c.types.iter().any(|t| t == wanted))
            .map(|c| c.long_name.as_str())
    };

    let place = PLACE_TYPES.iter().find_map(|t| find(t));
    format_label(place, find("country")).ok_or_else(|| ResolveError::Parse {
        provider,
        message: "response has no place or country component".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONDON: &str = r#"{
        "status": "OK",
        "results": [{
            "address_components": [
                {"long_name": "10", "short_name": "10", "types": ["street_number"]},
                {"long_name": "London", "short_name": "London", "types": ["postal_town"]},
                {"long_name": "Greater London", "short_name": "Greater London", "types": ["administrative_area_level_2", "political"]},
                {"long_name": "United Kingdom", "short_name": "GB", "types": ["country", "political"]}
            ]
        }]
    }"#;

    #[test]
    fn parses_postal_town_and_country() {
        assert_eq!(parse_response(LONDON).unwrap(), "London, United Kingdom");
    }

    #[test]
    fn locality_beats_postal_town() {
        let body = r#"{"status":"OK","results":[{"address_components":[
            {"long_name":"Shoreditch","types":["postal_town"]},
            {"long_name":"Hackney","types":["locality","political"]}
        ]}]}"#;
        assert_eq!(parse_response(body).unwrap(), "Hackney");
    }

    #[test]
    fn country_only_when_nothing_more_specific() {
        let body = r#"{"status":"OK","results":[{"address_components":[
            {"long_name":"Iceland","types":["country"]}
        ]}]}"#;
        assert_eq!(parse_response(body).unwrap(), "Iceland");
    }

    #[test]
    fn zero_results_is_parse_error() {
        let err = parse_response(r#"{"status":"ZERO_RESULTS","results":[]}"#).unwrap_err();
        assert!(matches!(err, ResolveError::Parse { .. }));
    }

    #[test]
    fn request_denied_is_unavailable() {
        let err = parse_response(
            r#"{"status":"REQUEST_DENIED","error_message":"The provided API key is invalid."}"#,
        )
        .unwrap_err();
        match err {
            ResolveError::Unavailable { message, .. } => {
                assert!(message.starts_with("REQUEST_DENIED"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn garbage_is_parse_error() {
        assert!(matches!(
            parse_response("<html>").unwrap_err(),
            ResolveError::Parse { .. }
        ));
    }
}
