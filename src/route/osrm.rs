//! OSRM routing backend
//!
//! Calls the OSRM `route` service for driving directions with GeoJSON
//! geometry and takes the first-ranked candidate.

use crate::config::ServicesConfig;
use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::route::{RouteResult, RoutingBackend};
use serde::Deserialize;
use tracing::debug;

/// OSRM routing backend
#[derive(Debug, Clone)]
pub struct OsrmBackend {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    /// Meters
    distance: f64,
    /// Seconds
    duration: f64,
    geometry: OsrmGeometry,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

impl OsrmBackend {
    /// Create a backend from the `[services]` config section
    pub fn from_config(services: &ServicesConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(services.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            base_url: services.router_url.trim_end_matches('/').to_string(),
        })
    }

    fn route_url(&self, start: Coordinate, end: Coordinate) -> String {
        format!(
            "{}/route/v1/driving/{},{};{},{}?overview=full&geometries=geojson",
            self.base_url, start.longitude, start.latitude, end.longitude, end.latitude
        )
    }

    /// Convert a decoded response into a route, rejecting anything malformed
    fn into_route(response: OsrmResponse) -> Result<RouteResult> {
        if response.code != "Ok" {
            return Err(Error::NoResults(format!(
                "OSRM returned {}: {}",
                response.code,
                response.message.unwrap_or_default()
            )));
        }

        let route = response
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoResults("OSRM returned no routes".to_string()))?;

        let path: Vec<Coordinate> = route
            .geometry
            .coordinates
            .into_iter()
            .map(|[lng, lat]| Coordinate::new(lng, lat))
            .collect();

        if path.len() < 2 {
            return Err(Error::NoResults(format!(
                "OSRM route has {} coordinates",
                path.len()
            )));
        }

        Ok(RouteResult {
            path,
            distance_meters: Some(route.distance),
            duration_seconds: Some(route.duration),
            is_fallback: false,
        })
    }
}

impl RoutingBackend for OsrmBackend {
    async fn route(&self, start: Coordinate, end: Coordinate) -> Result<RouteResult> {
        let url = self.route_url(start, end);
        debug!(%url, "routing request");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("OSRM request failed: {}", e)))?;

        // OSRM reports routing errors (e.g. NoRoute) with 4xx and a JSON body
        let body: OsrmResponse = response
            .json()
            .await
            .map_err(|e| Error::NoResults(format!("Failed to parse OSRM response: {}", e)))?;

        Self::into_route(body)
    }
}
