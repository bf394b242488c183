use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{ReachError, Result};
use crate::model::Location;

/// Default geocoding endpoint (OpenCage forward-geocoding API).
pub const DEFAULT_BASE_URL: &str = "https://api.opencagedata.com/geocode/v1/json";

/// Resolves a free-text place string to a coordinate pair.
///
/// This is the seam between the pipeline and the external provider: the
/// pipeline only ever talks to `dyn Geocoder`, so caching, retries, or a
/// different provider can be layered in without touching the batch
/// orchestration. Tests substitute in-memory stubs.
pub trait Geocoder {
    /// Resolves a place string such as "Maastricht, Netherlands". Fails with
    /// [`ReachError::LocationNotFound`] when the provider has no match.
    fn resolve(&mut self, place: &str) -> Result<Location>;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    results: Vec<GeocodeMatch>,
}

#[derive(Debug, Deserialize)]
struct GeocodeMatch {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    lat: f64,
    lng: f64,
}

/// HTTP client for the geocoding provider. One blocking request per lookup,
/// first match wins. No retry logic; per-item failure handling lives with the
/// callers.
pub struct GeocodeClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl GeocodeClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }
}

impl Geocoder for GeocodeClient {
    fn resolve(&mut self, place: &str) -> Result<Location> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("q", place),
                ("key", self.api_key.as_str()),
                ("limit", "1"),
                ("no_annotations", "1"),
            ])
            .send()?
            .error_for_status()?;
        let body: GeocodeResponse = response.json()?;

        let first = body
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ReachError::LocationNotFound(place.to_string()))?;
        debug!(place, lat = first.geometry.lat, lon = first.geometry.lng, "resolved location");
        Location::new(first.geometry.lat, first.geometry.lng)
    }
}

/// Memoizes successful lookups by exact query string for the duration of a
/// run, so each unique location costs at most one provider call. The cache
/// is owned by the run and never persisted.
pub struct CachingGeocoder<G> {
    inner: G,
    cache: HashMap<String, Location>,
}

impl<G> CachingGeocoder<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            cache: HashMap::new(),
        }
    }

    /// Number of distinct locations resolved so far.
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }
}

impl<G: Geocoder> Geocoder for CachingGeocoder<G> {
    fn resolve(&mut self, place: &str) -> Result<Location> {
        if let Some(location) = self.cache.get(place) {
            return Ok(*location);
        }
        let location = self.inner.resolve(place)?;
        self.cache.insert(place.to_string(), location);
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::ServerGuard) -> GeocodeClient {
        GeocodeClient::new(format!("{}/geocode/v1/json", server.url()), "test-key")
            .expect("client built")
    }

    #[test]
    fn resolve_takes_first_match() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/geocode/v1/json")
            .match_query(mockito::Matcher::UrlEncoded(
                "q".into(),
                "Venlo, Netherlands".into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"results":[{"geometry":{"lat":51.3704,"lng":6.1724}},{"geometry":{"lat":0.0,"lng":0.0}}]}"#,
            )
            .create();

        let mut client = client_for(&server);
        let location = client.resolve("Venlo, Netherlands").expect("resolved");
        assert_eq!(location, Location { lat: 51.3704, lon: 6.1724 });
        mock.assert();
    }

    #[test]
    fn resolve_reports_zero_matches_as_not_found() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/geocode/v1/json")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"results":[]}"#)
            .create();

        let mut client = client_for(&server);
        let error = client.resolve("Nowhere, Atlantis").unwrap_err();
        assert!(matches!(error, ReachError::LocationNotFound(place) if place == "Nowhere, Atlantis"));
    }

    #[test]
    fn caching_geocoder_calls_inner_once_per_place() {
        struct Counting {
            calls: usize,
        }
        impl Geocoder for Counting {
            fn resolve(&mut self, _place: &str) -> Result<Location> {
                self.calls += 1;
                Location::new(1.0, 2.0)
            }
        }

        let mut geocoder = CachingGeocoder::new(Counting { calls: 0 });
        let first = geocoder.resolve("Venlo, Netherlands").expect("resolved");
        let second = geocoder.resolve("Venlo, Netherlands").expect("resolved");

        assert_eq!(first, second);
        assert_eq!(geocoder.inner.calls, 1);
        assert_eq!(geocoder.cached_count(), 1);
    }
}
