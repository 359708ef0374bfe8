//! Configuration management
//!
//! Loads and saves configuration from XDG-compliant paths.
//! Config location: ~/.config/navmap/config.toml

pub mod defaults;

use crate::constants::geo::{FALLBACK_ORIGIN_LAT, FALLBACK_ORIGIN_LNG};
use crate::coord::Coordinate;
use crate::error::{Error, Result};
use crate::session::StyleId;
use defaults::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Map session behaviour
    #[serde(default)]
    pub map: MapConfig,

    /// Style references per style id
    #[serde(default)]
    pub styles: StylesConfig,

    /// Remote geocoding and routing services
    #[serde(default)]
    pub services: ServicesConfig,

    /// Device position settings
    #[serde(default)]
    pub location: LocationConfig,

    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// URL generation settings
    #[serde(default)]
    pub url: UrlConfig,
}

/// Map session behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    /// Style shown at startup
    #[serde(default = "default_style")]
    pub default_style: String,

    /// Show extruded buildings at startup
    #[serde(default = "default_buildings")]
    pub buildings: bool,

    /// Routing origin when the device position is unknown
    #[serde(default = "default_fallback_origin")]
    pub fallback_origin: Coordinate,

    /// Delay after a style load before adding custom layers
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Settle waits to spend polling for style readiness
    #[serde(default = "default_settle_max_polls")]
    pub settle_max_polls: u32,
}

/// Style references
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StylesConfig {
    #[serde(default = "default_style_default")]
    pub default: String,

    #[serde(default = "default_style_satellite")]
    pub satellite: String,

    #[serde(default = "default_style_terrain")]
    pub terrain: String,
}

/// Remote services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Nominatim-compatible geocoder base URL
    #[serde(default = "default_geocoder_url")]
    pub geocoder_url: String,

    /// OSRM-compatible router base URL
    #[serde(default = "default_router_url")]
    pub router_url: String,

    /// Accept-Language sent to the geocoder
    #[serde(default = "default_accept_language")]
    pub accept_language: String,

    /// User-Agent sent to all services
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Device position settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// "ip", "fixed" or "none"
    #[serde(default = "default_location_provider")]
    pub provider: String,

    /// Fixed longitude (provider = "fixed")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    /// Fixed latitude (provider = "fixed")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    /// Upper bound on one position request
    #[serde(default = "default_location_timeout")]
    pub timeout_secs: u64,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// URL generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlConfig {
    /// Default URL provider
    #[serde(default = "default_url_provider")]
    pub default: String,

    /// URL provider templates
    #[serde(default = "default_url_providers")]
    pub providers: HashMap<String, String>,
}

// Default value functions for serde
fn default_style() -> String {
    DEFAULT_STYLE.to_string()
}
fn default_buildings() -> bool {
    DEFAULT_BUILDINGS
}
fn default_fallback_origin() -> Coordinate {
    Coordinate::new(FALLBACK_ORIGIN_LNG, FALLBACK_ORIGIN_LAT)
}
fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}
fn default_settle_max_polls() -> u32 {
    DEFAULT_SETTLE_MAX_POLLS
}
fn default_style_default() -> String {
    DEFAULT_STYLE_DEFAULT_URL.to_string()
}
fn default_style_satellite() -> String {
    DEFAULT_STYLE_SATELLITE_URL.to_string()
}
fn default_style_terrain() -> String {
    DEFAULT_STYLE_TERRAIN_URL.to_string()
}
fn default_geocoder_url() -> String {
    DEFAULT_GEOCODER_URL.to_string()
}
fn default_router_url() -> String {
    DEFAULT_ROUTER_URL.to_string()
}
fn default_accept_language() -> String {
    DEFAULT_ACCEPT_LANGUAGE.to_string()
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_location_provider() -> String {
    DEFAULT_LOCATION_PROVIDER.to_string()
}
fn default_location_timeout() -> u64 {
    DEFAULT_LOCATION_TIMEOUT_SECS
}
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_url_provider() -> String {
    DEFAULT_URL_PROVIDER.to_string()
}
fn default_url_providers() -> HashMap<String, String> {
    let mut providers = HashMap::new();
    providers.insert(
        "google".to_string(),
        "https://www.google.com/maps/dir/?api=1&destination={lat},{lng}".to_string(),
    );
    providers.insert(
        "openstreetmap".to_string(),
        "https://www.openstreetmap.org/#map=17/{lat}/{lng}".to_string(),
    );
    providers.insert(
        "apple".to_string(),
        "https://maps.apple.com/?daddr={lat},{lng}".to_string(),
    );
    providers
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_style: default_style(),
            buildings: default_buildings(),
            fallback_origin: default_fallback_origin(),
            settle_delay_ms: default_settle_delay_ms(),
            settle_max_polls: default_settle_max_polls(),
        }
    }
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            default: default_style_default(),
            satellite: default_style_satellite(),
            terrain: default_style_terrain(),
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            geocoder_url: default_geocoder_url(),
            router_url: default_router_url(),
            accept_language: default_accept_language(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            provider: default_location_provider(),
            longitude: None,
            latitude: None,
            timeout_secs: default_location_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            default: default_url_provider(),
            providers: default_url_providers(),
        }
    }
}

impl StylesConfig {
    /// Style reference for a style id
    pub fn reference(&self, style: StyleId) -> &str {
        match style {
            StyleId::Default => &self.default,
            StyleId::Satellite => &self.satellite,
            StyleId::Terrain => &self.terrain,
        }
    }
}

impl MapConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Parsed startup style
    pub fn initial_style(&self) -> Result<StyleId> {
        self.default_style.parse().map_err(Error::Config)
    }
}

impl LocationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {}: {}", key, value)))
}

fn parse_optional<T: std::str::FromStr>(key: &str, value: &str) -> Result<Option<T>> {
    if value.is_empty() {
        Ok(None)
    } else {
        parse_value(key, value).map(Some)
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default path
    ///
    /// Creates default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Get a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns the value as a string, or None if not found
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["map", "default_style"] => Some(self.map.default_style.clone()),
            ["map", "buildings"] => Some(self.map.buildings.to_string()),
            ["map", "fallback_origin"] => Some(self.map.fallback_origin.to_string()),
            ["map", "settle_delay_ms"] => Some(self.map.settle_delay_ms.to_string()),
            ["map", "settle_max_polls"] => Some(self.map.settle_max_polls.to_string()),

            ["styles", "default"] => Some(self.styles.default.clone()),
            ["styles", "satellite"] => Some(self.styles.satellite.clone()),
            ["styles", "terrain"] => Some(self.styles.terrain.clone()),

            ["services", "geocoder_url"] => Some(self.services.geocoder_url.clone()),
            ["services", "router_url"] => Some(self.services.router_url.clone()),
            ["services", "accept_language"] => Some(self.services.accept_language.clone()),
            ["services", "user_agent"] => Some(self.services.user_agent.clone()),

            ["location", "provider"] => Some(self.location.provider.clone()),
            ["location", "longitude"] => {
                Some(self.location.longitude.map(|v| v.to_string()).unwrap_or_default())
            }
            ["location", "latitude"] => {
                Some(self.location.latitude.map(|v| v.to_string()).unwrap_or_default())
            }
            ["location", "timeout_secs"] => Some(self.location.timeout_secs.to_string()),

            ["server", "host"] => Some(self.server.host.clone()),
            ["server", "port"] => Some(self.server.port.to_string()),

            ["url", "default"] => Some(self.url.default.clone()),

            _ => None,
        }
    }

    /// Set a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns error if key is invalid or value type is wrong
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["map", "default_style"] => {
                value.parse::<StyleId>().map_err(Error::Config)?;
                self.map.default_style = value.to_lowercase();
            }
            ["map", "buildings"] => self.map.buildings = parse_value(key, value)?,
            ["map", "fallback_origin"] => self.map.fallback_origin = value.parse()?,
            ["map", "settle_delay_ms"] => self.map.settle_delay_ms = parse_value(key, value)?,
            ["map", "settle_max_polls"] => self.map.settle_max_polls = parse_value(key, value)?,

            ["styles", "default"] => self.styles.default = value.to_string(),
            ["styles", "satellite"] => self.styles.satellite = value.to_string(),
            ["styles", "terrain"] => self.styles.terrain = value.to_string(),

            ["services", "geocoder_url"] => self.services.geocoder_url = value.to_string(),
            ["services", "router_url"] => self.services.router_url = value.to_string(),
            ["services", "accept_language"] => self.services.accept_language = value.to_string(),
            ["services", "user_agent"] => self.services.user_agent = value.to_string(),

            ["location", "provider"] => match value {
                "ip" | "fixed" | "none" => self.location.provider = value.to_string(),
                _ => {
                    return Err(Error::Config(format!(
                        "Unknown location provider: {} (expected ip, fixed or none)",
                        value
                    )))
                }
            },
            ["location", "longitude"] => self.location.longitude = parse_optional(key, value)?,
            ["location", "latitude"] => self.location.latitude = parse_optional(key, value)?,
            ["location", "timeout_secs"] => self.location.timeout_secs = parse_value(key, value)?,

            ["server", "host"] => self.server.host = value.to_string(),
            ["server", "port"] => self.server.port = parse_value(key, value)?,

            ["url", "default"] => self.url.default = value.to_string(),

            _ => {
                return Err(Error::Config(format!("Unknown config key: {}", key)));
            }
        }

        Ok(())
    }

    /// List all available config keys
    pub fn available_keys() -> Vec<&'static str> {
        vec![
            "map.default_style",
            "map.buildings",
            "map.fallback_origin",
            "map.settle_delay_ms",
            "map.settle_max_polls",
            "styles.default",
            "styles.satellite",
            "styles.terrain",
            "services.geocoder_url",
            "services.router_url",
            "services.accept_language",
            "services.user_agent",
            "location.provider",
            "location.longitude",
            "location.latitude",
            "location.timeout_secs",
            "server.host",
            "server.port",
            "url.default",
        ]
    }

    /// Format a URL using the specified provider
    ///
    /// Replaces {lat} and {lng} placeholders with actual values
    pub fn format_url(&self, provider: Option<&str>, coord: Coordinate) -> Result<String> {
        let provider_name = provider.unwrap_or(&self.url.default);

        let template = self
            .url
            .providers
            .get(provider_name)
            .ok_or_else(|| Error::Config(format!("Unknown URL provider: {}", provider_name)))?;

        Ok(template
            .replace("{lat}", &coord.latitude.to_string())
            .replace("{lng}", &coord.longitude.to_string()))
    }

    /// Get server address as "host:port"
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
