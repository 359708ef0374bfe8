//! Output formatters
//!
//! Provides trait-based output formatting for planned routes.

pub mod gpx;
pub mod json;
pub mod text;
pub mod url;

use crate::config::Config;
use crate::coord::Coordinate;
use crate::error::Result;
use crate::route::RouteResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Information about an output format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatInfo {
    /// Format name
    pub name: String,
    /// Format description
    pub description: String,
}

/// A planned route with the request that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub origin: Coordinate,
    pub destination: Coordinate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_name: Option<String>,
    pub route: RouteResult,
}

impl RouteReport {
    pub fn new(
        origin: Coordinate,
        destination: Coordinate,
        destination_name: Option<String>,
        route: RouteResult,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            origin,
            destination,
            destination_name,
            route,
        }
    }

    /// Destination name, or its coordinate when unnamed
    pub fn destination_label(&self) -> String {
        self.destination_name
            .clone()
            .unwrap_or_else(|| self.destination.to_string())
    }
}

/// Trait for output formatters
pub trait OutputFormatter: Send + Sync {
    /// Get the format name
    fn name(&self) -> &str;

    /// Get the format description
    fn description(&self) -> &str;

    /// Format a route report
    ///
    /// # Arguments
    /// * `report` - The route to format
    /// * `config` - Application config (for url providers, etc.)
    fn format(&self, report: &RouteReport, config: &Config) -> Result<String>;
}

/// Get a formatter by name
pub fn get_formatter(name: &str) -> Option<Box<dyn OutputFormatter>> {
    match name.to_lowercase().as_str() {
        "json" => Some(Box::new(json::JsonFormatter)),
        "text" => Some(Box::new(text::TextFormatter)),
        "gpx" => Some(Box::new(gpx::GpxFormatter)),
        "url" => Some(Box::new(url::UrlFormatter)),
        _ => None,
    }
}

/// List all available formatters
pub fn available_formats() -> Vec<FormatInfo> {
    ["json", "text", "gpx", "url"]
        .into_iter()
        .filter_map(get_formatter)
        .map(|f| FormatInfo {
            name: f.name().to_string(),
            description: f.description().to_string(),
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn sample_report() -> RouteReport {
    let origin = Coordinate::new(139.7671, 35.6812);
    let destination = Coordinate::new(139.7454, 35.6586);
    RouteReport::new(
        origin,
        destination,
        Some("Tokyo Tower".to_string()),
        RouteResult {
            path: vec![origin, Coordinate::new(139.7550, 35.6700), destination],
            distance_meters: Some(3_870.0),
            duration_seconds: Some(610.0),
            is_fallback: false,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_formatter() {
        assert!(get_formatter("json").is_some());
        assert!(get_formatter("text").is_some());
        assert!(get_formatter("gpx").is_some());
        assert!(get_formatter("url").is_some());
        assert!(get_formatter("unknown").is_none());
    }

    #[test]
    fn test_get_formatter_case_insensitive() {
        assert!(get_formatter("JSON").is_some());
        assert!(get_formatter("Text").is_some());
        assert!(get_formatter("GPX").is_some());
    }

    #[test]
    fn test_available_formats() {
        let formats = available_formats();
        assert_eq!(formats.len(), 4);
        assert!(formats.iter().any(|f| f.name == "gpx"));
        assert!(formats.iter().all(|f| !f.description.is_empty()));
    }

    #[test]
    fn test_destination_label() {
        let mut report = sample_report();
        assert_eq!(report.destination_label(), "Tokyo Tower");
        report.destination_name = None;
        assert_eq!(report.destination_label(), "139.745400,35.658600");
    }
}
