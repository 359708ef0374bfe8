//! Centralized constants for the navmap crate
//!
//! Values shared between the session controller, the service backends and
//! the configuration defaults.

/// Geographic constants
pub mod geo {
    /// Mean Earth radius in meters (WGS84 approximation)
    pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

    /// Origin used for routing when the device position is unknown (Tokyo Station)
    pub const FALLBACK_ORIGIN_LNG: f64 = 139.7671;
    pub const FALLBACK_ORIGIN_LAT: f64 = 35.6812;
}

/// External API endpoints
pub mod api {
    /// OpenStreetMap Nominatim geocoding API
    pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

    /// Public OSRM demo server
    pub const OSRM_URL: &str = "https://router.project-osrm.org";

    /// IP geolocation API (free, no key required)
    pub const IP_API_URL: &str = "http://ip-api.com/json";

    /// OpenFreeMap vector style with street names and buildings
    pub const STYLE_LIBERTY_URL: &str = "https://tiles.openfreemap.org/styles/liberty";

    /// OpenFreeMap satellite imagery style
    pub const STYLE_SATELLITE_URL: &str = "https://tiles.openfreemap.org/styles/satellite";
}

/// Cache settings
pub mod cache {
    /// IP location cache duration in seconds (1 hour)
    pub const IP_LOCATION_TTL_SECS: u64 = 3600;

    /// IP location cache file name
    pub const IP_LOCATION_CACHE_FILE: &str = "ip_location_cache.json";
}

/// Camera presets
pub mod camera {
    /// Initial world view
    pub const INITIAL_CENTER_LNG: f64 = 0.0;
    pub const INITIAL_CENTER_LAT: f64 = 20.0;
    pub const INITIAL_ZOOM: f64 = 2.0;

    /// Zoom used when centering on the device position
    pub const USER_ZOOM: f64 = 15.0;

    /// Close-in, tilted view of a destination so extruded buildings show
    pub const DESTINATION_ZOOM: f64 = 17.0;
    pub const DESTINATION_PITCH: f64 = 60.0;
    pub const DESTINATION_BEARING: f64 = 0.0;

    /// Route overview framing
    pub const ROUTE_PADDING_PX: f64 = 100.0;
    pub const ROUTE_PITCH: f64 = 45.0;
}

/// Layer, source and marker identifiers
pub mod layers {
    pub const BUILDINGS_LAYER_ID: &str = "3d-buildings";
    pub const ROUTE_SOURCE_ID: &str = "route";
    pub const ROUTE_LAYER_ID: &str = "route";

    /// Extruded buildings are hidden below this zoom
    pub const BUILDINGS_MIN_ZOOM: f64 = 14.0;

    pub const USER_MARKER_COLOR: &str = "#00ff00";
    pub const DESTINATION_MARKER_COLOR: &str = "#ff0000";
    pub const ROUTE_LINE_COLOR: &str = "#0088ff";
}
