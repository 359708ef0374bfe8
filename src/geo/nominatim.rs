//! Nominatim geocoding backend (OpenStreetMap)
//!
//! Uses the free Nominatim API for geocoding.
//! Rate limit: 1 request per second (enforced by User-Agent requirement)

use crate::config::ServicesConfig;
use crate::error::{Error, Result};
use crate::geo::{GeoLocation, Geocoder};
use serde::Deserialize;
use tracing::debug;

/// Nominatim geocoding backend
#[derive(Debug, Clone)]
pub struct NominatimBackend {
    client: reqwest::Client,
    base_url: String,
    accept_language: String,
}

/// Nominatim search response item
#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    display_name: String,
}

impl NominatimBackend {
    /// Create a backend from the `[services]` config section
    pub fn from_config(services: &ServicesConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(services.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            base_url: services.geocoder_url.trim_end_matches('/').to_string(),
            accept_language: services.accept_language.clone(),
        })
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search?format=json&q={}&limit=1&accept-language={}",
            self.base_url,
            urlencoding::encode(query),
            urlencoding::encode(&self.accept_language)
        )
    }

    /// Parse lat/lng strings to f64
    fn parse_coords(lat: &str, lng: &str) -> Result<(f64, f64)> {
        let lat: f64 = lat
            .parse()
            .map_err(|_| Error::NoResults(format!("Invalid latitude: {}", lat)))?;
        let lng: f64 = lng
            .parse()
            .map_err(|_| Error::NoResults(format!("Invalid longitude: {}", lng)))?;
        Ok((lat, lng))
    }
}

impl Geocoder for NominatimBackend {
    async fn geocode(&self, query: &str) -> Result<Option<GeoLocation>> {
        let url = self.search_url(query);
        debug!(%url, "geocoding request");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Nominatim request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Network(format!(
                "Nominatim returned status: {}",
                response.status()
            )));
        }

        let results: Vec<NominatimResult> = response
            .json()
            .await
            .map_err(|e| Error::NoResults(format!("Failed to parse Nominatim response: {}", e)))?;

        if let Some(result) = results.into_iter().next() {
            let (lat, lng) = Self::parse_coords(&result.lat, &result.lon)?;
            Ok(Some(GeoLocation {
                lat,
                lng,
                display_name: result.display_name,
            }))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coords() {
        let (lat, lng) = NominatimBackend::parse_coords("35.6812", "139.7671").unwrap();
        assert!((lat - 35.6812).abs() < 0.0001);
        assert!((lng - 139.7671).abs() < 0.0001);
    }

    #[test]
    fn test_parse_coords_invalid() {
        assert!(NominatimBackend::parse_coords("invalid", "0").is_err());
        assert!(NominatimBackend::parse_coords("0", "invalid").is_err());
    }

    #[test]
    fn test_search_url() {
        let mut services = ServicesConfig::default();
        services.geocoder_url = "https://geo.example.com/".to_string();
        let backend = NominatimBackend::from_config(&services).unwrap();

        let url = backend.search_url("Eiffel Tower");
        assert_eq!(
            url,
            "https://geo.example.com/search?format=json&q=Eiffel%20Tower&limit=1&accept-language=zh-CN%2Cen"
        );
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"[{"lat":"48.8582602","lon":"2.2944991","display_name":"Tour Eiffel, Paris","importance":0.9}]"#;
        let results: Vec<NominatimResult> = serde_json::from_str(body).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].display_name, "Tour Eiffel, Paris");
    }

    #[tokio::test]
    #[ignore = "Requires network access to Nominatim"]
    async fn test_geocode_live() {
        let backend = NominatimBackend::from_config(&ServicesConfig::default()).unwrap();
        let loc = backend.geocode("Eiffel Tower").await.unwrap().unwrap();
        assert!((loc.lat - 48.858).abs() < 0.01);
    }
}
