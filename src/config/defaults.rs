//! Default configuration values
//!
//! Named constants for all tunable parameters

use crate::constants::api;

/// Style shown at startup
pub const DEFAULT_STYLE: &str = "default";

/// Whether extruded buildings are requested at startup
pub const DEFAULT_BUILDINGS: bool = true;

/// Wait after a style load before touching its sources
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 500;

/// How many settle waits to spend polling for style readiness
pub const DEFAULT_SETTLE_MAX_POLLS: u32 = 10;

/// Style references
pub const DEFAULT_STYLE_DEFAULT_URL: &str = api::STYLE_LIBERTY_URL;
pub const DEFAULT_STYLE_SATELLITE_URL: &str = api::STYLE_SATELLITE_URL;
pub const DEFAULT_STYLE_TERRAIN_URL: &str = api::STYLE_LIBERTY_URL;

/// Geocoding and routing endpoints
pub const DEFAULT_GEOCODER_URL: &str = api::NOMINATIM_URL;
pub const DEFAULT_ROUTER_URL: &str = api::OSRM_URL;

/// Preferred languages for geocoder display names
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "zh-CN,en";

/// User-Agent sent to public services (Nominatim requires one)
pub const DEFAULT_USER_AGENT: &str = concat!("navmap/", env!("CARGO_PKG_VERSION"));

/// Position provider: "ip", "fixed" or "none"
pub const DEFAULT_LOCATION_PROVIDER: &str = "ip";

/// Upper bound on a single position request
pub const DEFAULT_LOCATION_TIMEOUT_SECS: u64 = 10;

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 7979;

/// Default URL provider
pub const DEFAULT_URL_PROVIDER: &str = "google";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory name (for XDG paths)
pub const APP_DIR_NAME: &str = "navmap";
