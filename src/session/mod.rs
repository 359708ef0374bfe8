//! Map session controller
//!
//! Keeps one rendering surface consistent with the latest `MapIntent`.
//! `plan` maps the intent and the current `SessionState` to a list of
//! steps; `SessionController` executes them against the surface and turns
//! asynchronous work (route fetches, settle waits, position requests) into
//! `Effect`s; `SessionRuntime` runs those effects on tokio and feeds their
//! completions back as events.

pub mod buildings;
pub mod controller;
pub mod plan;
pub mod runtime;

pub use controller::{SessionController, SessionSettings};
pub use runtime::{HeadlessRuntime, SessionEvent, SessionHandle, SessionRuntime, SessionSnapshot};

use crate::coord::Coordinate;
use crate::place::PlaceMatch;
use crate::route::RouteResult;
use crate::surface::MarkerHandle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Basemap style choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleId {
    #[default]
    Default,
    Satellite,
    Terrain,
}

impl StyleId {
    pub const ALL: [StyleId; 3] = [StyleId::Default, StyleId::Satellite, StyleId::Terrain];

    pub fn as_str(&self) -> &'static str {
        match self {
            StyleId::Default => "default",
            StyleId::Satellite => "satellite",
            StyleId::Terrain => "terrain",
        }
    }
}

impl fmt::Display for StyleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StyleId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" => Ok(StyleId::Default),
            "satellite" => Ok(StyleId::Satellite),
            "terrain" => Ok(StyleId::Terrain),
            _ => Err(format!(
                "Unknown style: {}. Use: default, satellite, terrain",
                s
            )),
        }
    }
}

/// Desired session state supplied by the UI shell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapIntent {
    #[serde(default)]
    pub style: StyleId,

    #[serde(default = "default_buildings_visible")]
    pub buildings_visible: bool,

    #[serde(default)]
    pub destination: Option<PlaceMatch>,

    #[serde(default)]
    pub navigation_requested: bool,
}

fn default_buildings_visible() -> bool {
    true
}

impl Default for MapIntent {
    fn default() -> Self {
        Self {
            style: StyleId::Default,
            buildings_visible: default_buildings_visible(),
            destination: None,
            navigation_requested: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleLoadPhase {
    Loading,
    Ready,
}

/// State of the 3D building layer on the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingLayer {
    Absent,
    Shown,
    Hidden,
}

/// Endpoints a route was requested for
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteKey {
    pub origin: Coordinate,
    pub destination: Coordinate,
}

/// Identifies one route request; later tickets supersede earlier ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteTicket(pub u64);

/// Most recent route result and the endpoints it was computed for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRoute {
    pub key: RouteKey,
    pub result: RouteResult,
    /// Planned/fallback notice already emitted
    pub announced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingRoute {
    pub ticket: RouteTicket,
    pub key: RouteKey,
}

/// Controller-owned session state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub current_style: StyleId,
    pub style_phase: StyleLoadPhase,
    /// Bumped on every style load; settle completions carry it
    pub style_generation: u64,
    /// Settle wait finished for the current generation
    pub sources_settled: bool,

    pub buildings: BuildingLayer,
    /// Active style has no building source; cleared by a style load or a toggle off
    pub buildings_unavailable: bool,

    pub user_location: Option<Coordinate>,
    pub user_marker: Option<MarkerHandle>,
    pub destination: Option<PlaceMatch>,
    pub destination_marker: Option<MarkerHandle>,

    /// Endpoints of the route currently drawn, if any
    pub route_overlay: Option<RouteKey>,
    pub route: Option<CachedRoute>,
    pub pending_route: Option<PendingRoute>,
}

impl SessionState {
    pub fn new(style: StyleId) -> Self {
        Self {
            current_style: style,
            style_phase: StyleLoadPhase::Loading,
            style_generation: 0,
            sources_settled: false,
            buildings: BuildingLayer::Absent,
            buildings_unavailable: false,
            user_location: None,
            user_marker: None,
            destination: None,
            destination_marker: None,
            route_overlay: None,
            route: None,
            pending_route: None,
        }
    }

    pub fn buildings_layer_present(&self) -> bool {
        self.buildings == BuildingLayer::Shown
    }

    pub fn route_overlay_present(&self) -> bool {
        self.route_overlay.is_some()
    }

    /// Custom layers may be added
    pub fn is_settled(&self) -> bool {
        self.style_phase == StyleLoadPhase::Ready && self.sources_settled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Human-readable status for the UI shell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

/// Asynchronous work requested by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Fetch a route; deliver with `on_route_ready(ticket, ..)`
    FetchRoute { ticket: RouteTicket, key: RouteKey },
    /// Wait, then deliver `on_settled(generation, attempt)`
    Settle {
        generation: u64,
        attempt: u32,
        delay: Duration,
    },
    /// Acquire the device position once; deliver with `on_position`
    AcquirePosition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_id_parse() {
        assert_eq!("Satellite".parse::<StyleId>(), Ok(StyleId::Satellite));
        assert_eq!(" terrain ".parse::<StyleId>(), Ok(StyleId::Terrain));
        assert!("streets".parse::<StyleId>().is_err());
        for style in StyleId::ALL {
            assert_eq!(style.to_string().parse::<StyleId>(), Ok(style));
        }
    }

    #[test]
    fn test_intent_defaults_from_partial_json() {
        let intent: MapIntent = serde_json::from_str(r#"{"style": "satellite"}"#).unwrap();
        assert_eq!(intent.style, StyleId::Satellite);
        assert!(intent.buildings_visible);
        assert!(intent.destination.is_none());
        assert!(!intent.navigation_requested);
    }
}
