//! Reverse geocoding against mocked Google and Nominatim endpoints.

use mockito::{Matcher, Server};
use reqwest::Client;
use url::Url;
use whereintheworld_core::geocoding::{GoogleGeocoder, OpenStreetMapGeocoder};
use whereintheworld_core::{
    Coordinate, GeocodingConfig, LocationSource, ResolveError, ReverseGeocoder,
};

fn geocoder(server: &Server) -> ReverseGeocoder {
    let base = Url::parse(&server.url()).unwrap();
    let client = Client::new();
    ReverseGeocoder::with_backends(
        GoogleGeocoder::with_base_url(client.clone(), base.clone()),
        OpenStreetMapGeocoder::with_base_url(client, base),
    )
}

fn google(key: &str) -> GeocodingConfig {
    GeocodingConfig {
        google_api_key: key.to_string(),
        use_open_street_map: false,
    }
}

fn osm() -> GeocodingConfig {
    GeocodingConfig {
        google_api_key: String::new(),
        use_open_street_map: true,
    }
}

#[tokio::test]
async fn google_locality_and_country() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/maps/api/geocode/json")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("latlng".into(), "51.5,-0.12".into()),
            Matcher::UrlEncoded("key".into(), "g-key".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "status": "OK",
                "results": [{
                    "address_components": [
                        {"long_name": "10", "types": ["street_number"]},
                        {"long_name": "London", "types": ["postal_town"]},
                        {"long_name": "United Kingdom", "types": ["country", "political"]}
                    ]
                }]
            }"#,
        )
        .create_async()
        .await;

    let resolved = geocoder(&server)
        .reverse(Coordinate::new(51.5, -0.12), &google("g-key"))
        .await
        .unwrap();

    assert_eq!(resolved.label, "London, United Kingdom");
    assert_eq!(resolved.source, LocationSource::GeocodedGoogle);
    mock.assert_async().await;
}

#[tokio::test]
async fn google_denied_maps_to_unavailable() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/maps/api/geocode/json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"status": "REQUEST_DENIED", "error_message": "The provided API key is invalid."}"#)
        .create_async()
        .await;

    let err = geocoder(&server)
        .reverse(Coordinate::new(1.0, 1.0), &google("bad"))
        .await
        .unwrap_err();

    match err {
        ResolveError::Unavailable { message, .. } => assert!(message.contains("invalid")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn google_without_key_never_calls_out() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let err = geocoder(&server)
        .reverse(Coordinate::new(1.0, 1.0), &google("  "))
        .await
        .unwrap_err();

    assert_eq!(err, ResolveError::MissingCredential { provider: "Google" });
    mock.assert_async().await;
}

#[tokio::test]
async fn nominatim_town_without_key() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/reverse")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("format".into(), "jsonv2".into()),
            Matcher::UrlEncoded("lat".into(), "45.9".into()),
            Matcher::UrlEncoded("lon".into(), "6.87".into()),
        ]))
        .match_header("user-agent", Matcher::Regex("^whereintheworld/".into()))
        .with_status(200)
        .with_body(r#"{"address": {"town": "Chamonix", "state": "Auvergne-Rhône-Alpes", "country": "France"}}"#)
        .create_async()
        .await;

    // Client::new() has no user agent; use the library's.
    let base = Url::parse(&server.url()).unwrap();
    let client = Client::builder()
        .user_agent(whereintheworld_core::USER_AGENT)
        .build()
        .unwrap();
    let resolver = ReverseGeocoder::with_backends(
        GoogleGeocoder::with_base_url(client.clone(), base.clone()),
        OpenStreetMapGeocoder::with_base_url(client, base),
    );

    let resolved = resolver
        .reverse(Coordinate::new(45.9, 6.87), &osm())
        .await
        .unwrap();

    assert_eq!(resolved.label, "Chamonix, France");
    assert_eq!(resolved.source, LocationSource::GeocodedOsm);
    mock.assert_async().await;
}

#[tokio::test]
async fn nominatim_server_error_is_unavailable() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/reverse")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let err = geocoder(&server)
        .reverse(Coordinate::new(10.0, 10.0), &osm())
        .await
        .unwrap_err();

    assert!(err.is_transient());
    assert!(matches!(err, ResolveError::Unavailable { provider: "OpenStreetMap", .. }));
}

#[tokio::test]
async fn nominatim_nothing_there_is_parse_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/reverse")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"error": "Unable to geocode"}"#)
        .create_async()
        .await;

    let err = geocoder(&server)
        .reverse(Coordinate::new(0.0, -30.0), &osm())
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::Parse { .. }));
}

#[tokio::test]
async fn invalid_coordinate_rejected_before_network() {
    let server = Server::new_async().await;
    let err = geocoder(&server)
        .reverse(Coordinate::new(120.0, 0.0), &osm())
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::InvalidCoordinate(_)));
}
