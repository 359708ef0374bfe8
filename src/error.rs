//! Error types for navmap

use thiserror::Error;

/// Main error type for navmap operations
#[derive(Error, Debug)]
pub enum Error {
    /// Place resolution failed; carries up to three local-table suggestions
    #[error("Place not found: {query}")]
    NotFound {
        query: String,
        suggestions: Vec<String>,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("No results: {0}")]
    NoResults(String),

    #[error("Map style is not fully loaded")]
    StyleLoadIncomplete,

    #[error("No building data source in style: {0}")]
    SourceNotFound(String),

    #[error("Rendering surface error: {0}")]
    Surface(String),

    #[error("Map session has ended")]
    SessionClosed,

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Geolocation error: {0}")]
    Geolocation(#[from] GeolocationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to acquire the device position
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("position unavailable: {0}")]
    Unavailable(String),

    #[error("position access denied")]
    Denied,

    #[error("position request timed out")]
    Timeout,
}

/// Result type alias for navmap operations
pub type Result<T> = std::result::Result<T, Error>;
