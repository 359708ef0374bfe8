//! IP-based position source
//!
//! Approximates the device position from the public IP address through
//! ip-api.com. Fixes are cached on disk so repeated sessions stay under the
//! service's rate limit.

use crate::config::defaults::APP_DIR_NAME;
use crate::constants::api::IP_API_URL;
use crate::constants::cache::{IP_LOCATION_CACHE_FILE, IP_LOCATION_TTL_SECS};
use crate::error::{Error, Result};
use crate::geo::GeoLocation;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Looks up the approximate position of this host
#[derive(Debug)]
pub struct IpLocator {
    client: reqwest::Client,
    cache_path: Option<PathBuf>,
    ttl: Duration,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    city: Option<String>,
    country: Option<String>,
}

/// A fix as stored in the cache file
#[derive(Debug, Serialize, Deserialize)]
struct CachedFix {
    location: GeoLocation,
    fetched_at: DateTime<Utc>,
}

impl CachedFix {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.fetched_at <= now && now - self.fetched_at < ttl
    }
}

impl IpLocator {
    /// Locator caching under the user cache directory
    pub fn new() -> Self {
        Self::with_cache(
            dirs::cache_dir().map(|dir| dir.join(APP_DIR_NAME).join(IP_LOCATION_CACHE_FILE)),
        )
    }

    pub fn with_cache_path(cache_path: PathBuf) -> Self {
        Self::with_cache(Some(cache_path))
    }

    fn with_cache(cache_path: Option<PathBuf>) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache_path,
            ttl: Duration::seconds(IP_LOCATION_TTL_SECS as i64),
        }
    }

    /// Current approximate position, from cache when still fresh
    pub async fn locate(&self) -> Result<GeoLocation> {
        let now = Utc::now();
        if let Some(location) = self.read_cache(now) {
            debug!(place = %location.display_name, "using cached IP location");
            return Ok(location);
        }

        let location = self.request().await?;
        if let Err(e) = self.write_cache(&location, now) {
            debug!(error = %e, "could not cache IP location");
        }
        Ok(location)
    }

    async fn request(&self) -> Result<GeoLocation> {
        let response = self
            .client
            .get(IP_API_URL)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Network(format!("IP location request failed: {}", e)))?;

        let data: IpApiResponse = response
            .json()
            .await
            .map_err(|e| Error::NoResults(format!("Malformed IP location response: {}", e)))?;

        Self::parse_response(data)
    }

    fn parse_response(data: IpApiResponse) -> Result<GeoLocation> {
        let (lat, lng) = match (data.status.as_str(), data.lat, data.lon) {
            ("success", Some(lat), Some(lng)) => (lat, lng),
            _ => {
                return Err(Error::NoResults(
                    data.message
                        .unwrap_or_else(|| "IP location lookup failed".to_string()),
                ))
            }
        };

        let label: Vec<String> = [data.city, data.country].into_iter().flatten().collect();
        Ok(GeoLocation {
            lat,
            lng,
            display_name: if label.is_empty() {
                "IP location".to_string()
            } else {
                label.join(", ")
            },
        })
    }

    fn read_cache(&self, now: DateTime<Utc>) -> Option<GeoLocation> {
        let content = fs::read_to_string(self.cache_path.as_ref()?).ok()?;
        let fix: CachedFix = serde_json::from_str(&content).ok()?;
        fix.is_fresh(now, self.ttl).then_some(fix.location)
    }

    fn write_cache(&self, location: &GeoLocation, now: DateTime<Utc>) -> Result<()> {
        let Some(path) = &self.cache_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let fix = CachedFix {
            location: location.clone(),
            fetched_at: now,
        };
        fs::write(path, serde_json::to_string_pretty(&fix)?)?;
        Ok(())
    }
}

impl Default for IpLocator {
    fn default() -> Self {
        Self::new()
    }
}
