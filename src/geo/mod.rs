//! Geocoding and device position
//!
//! Provides geocoding (place name to coordinates) and the one-shot
//! geolocation watcher that feeds the map session its starting position.

pub mod ip_location;
pub mod nominatim;

use crate::config::{Config, LocationConfig};
use crate::coord::Coordinate;
use crate::error::{GeolocationError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// A geocoded location result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lng: f64,
    /// Display name (address or description)
    pub display_name: String,
}

impl GeoLocation {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lng, self.lat)
    }
}

/// Trait for geocoding backends
pub trait Geocoder: Send + Sync {
    /// Geocode a free-text query to coordinates
    ///
    /// Returns the best match for the query, or None if the service had no results
    fn geocode(&self, query: &str) -> impl Future<Output = Result<Option<GeoLocation>>> + Send;
}

/// Get the default geocoding backend
pub fn get_geocoder(config: &Config) -> Result<nominatim::NominatimBackend> {
    nominatim::NominatimBackend::from_config(&config.services)
}

/// A source of the device's current position
pub trait PositionSource: Send + Sync {
    /// Acquire the current position once
    fn acquire_once(
        &self,
    ) -> impl Future<Output = std::result::Result<Coordinate, GeolocationError>> + Send;
}

/// Position source selected by configuration
#[derive(Debug)]
pub enum LocationProvider {
    /// IP-based lookup
    Ip(ip_location::IpLocator),
    /// Fixed coordinate from config
    Fixed(Coordinate),
    /// Positioning switched off
    Disabled,
}

impl LocationProvider {
    /// Build the provider named in the `[location]` config section
    pub fn from_config(config: &LocationConfig) -> Self {
        match config.provider.as_str() {
            "ip" => Self::Ip(ip_location::IpLocator::new()),
            "fixed" => match (config.longitude, config.latitude) {
                (Some(lng), Some(lat)) => Self::Fixed(Coordinate::new(lng, lat)),
                _ => {
                    warn!("location.provider is \"fixed\" but no coordinate is set");
                    Self::Disabled
                }
            },
            _ => Self::Disabled,
        }
    }
}

impl PositionSource for LocationProvider {
    async fn acquire_once(&self) -> std::result::Result<Coordinate, GeolocationError> {
        match self {
            Self::Ip(locator) => locator
                .locate()
                .await
                .map(|loc| loc.coordinate())
                .map_err(|e| GeolocationError::Unavailable(e.to_string())),
            Self::Fixed(coord) => Ok(*coord),
            Self::Disabled => Err(GeolocationError::Denied),
        }
    }
}

/// One-shot geolocation with an upper bound on how long to wait
#[derive(Debug)]
pub struct GeolocationWatcher<P> {
    source: P,
    timeout: Duration,
}

impl<P: PositionSource> GeolocationWatcher<P> {
    pub fn new(source: P, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Acquire the position once; never retries
    pub async fn acquire_once(&self) -> std::result::Result<Coordinate, GeolocationError> {
        let coord = tokio::time::timeout(self.timeout, self.source.acquire_once())
            .await
            .map_err(|_| GeolocationError::Timeout)??;

        coord
            .validate()
            .map_err(|e| GeolocationError::Unavailable(e.to_string()))?;
        debug!(%coord, "acquired device position");
        Ok(coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowSource;

    impl PositionSource for SlowSource {
        async fn acquire_once(&self) -> std::result::Result<Coordinate, GeolocationError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Coordinate::new(0.0, 0.0))
        }
    }

    struct BogusSource;

    impl PositionSource for BogusSource {
        async fn acquire_once(&self) -> std::result::Result<Coordinate, GeolocationError> {
            Ok(Coordinate::new(500.0, 0.0))
        }
    }

    #[test]
    fn test_geo_location_serialization() {
        let loc = GeoLocation {
            lat: 35.6812,
            lng: 139.7671,
            display_name: "Tokyo".to_string(),
        };

        let json = serde_json::to_string(&loc).unwrap();
        let parsed: GeoLocation = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.coordinate(), Coordinate::new(139.7671, 35.6812));
        assert_eq!(parsed.display_name, "Tokyo");
    }

    #[tokio::test]
    async fn test_fixed_provider() {
        let watcher = GeolocationWatcher::new(
            LocationProvider::Fixed(Coordinate::new(135.5, 34.7)),
            Duration::from_secs(1),
        );
        assert_eq!(watcher.acquire_once().await, Ok(Coordinate::new(135.5, 34.7)));
    }

    #[tokio::test]
    async fn test_disabled_provider_is_denied() {
        let watcher = GeolocationWatcher::new(LocationProvider::Disabled, Duration::from_secs(1));
        assert_eq!(watcher.acquire_once().await, Err(GeolocationError::Denied));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let watcher = GeolocationWatcher::new(SlowSource, Duration::from_secs(5));
        assert_eq!(watcher.acquire_once().await, Err(GeolocationError::Timeout));
    }

    #[tokio::test]
    async fn test_out_of_range_position_is_unavailable() {
        let watcher = GeolocationWatcher::new(BogusSource, Duration::from_secs(1));
        assert!(matches!(
            watcher.acquire_once().await,
            Err(GeolocationError::Unavailable(_))
        ));
    }

    #[test]
    fn test_provider_from_config() {
        let mut config = LocationConfig::default();
        config.provider = "fixed".to_string();
        assert!(matches!(
            LocationProvider::from_config(&config),
            LocationProvider::Disabled
        ));

        config.longitude = Some(139.0);
        config.latitude = Some(35.0);
        assert!(matches!(
            LocationProvider::from_config(&config),
            LocationProvider::Fixed(_)
        ));

        config.provider = "none".to_string();
        assert!(matches!(
            LocationProvider::from_config(&config),
            LocationProvider::Disabled
        ));
    }
}
