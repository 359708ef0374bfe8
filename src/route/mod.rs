//! Route provider
//!
//! Requests a road-following route from a routing backend and degrades to a
//! straight two-point line when the backend fails, so navigation always has
//! something to draw.

pub mod osrm;

use crate::coord::Coordinate;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{info, warn};

/// A normalized route, whatever produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    /// Ordered path, at least two points
    pub path: Vec<Coordinate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,

    /// True when the path is the straight-line substitute
    pub is_fallback: bool,
}

impl RouteResult {
    /// Straight line from start to end with no metrics
    pub fn fallback(start: Coordinate, end: Coordinate) -> Self {
        Self {
            path: vec![start, end],
            distance_meters: None,
            duration_seconds: None,
            is_fallback: true,
        }
    }

    pub fn start(&self) -> Option<Coordinate> {
        self.path.first().copied()
    }

    pub fn end(&self) -> Option<Coordinate> {
        self.path.last().copied()
    }

    /// Great-circle length of the path; display-only for fallback routes
    pub fn estimated_distance_meters(&self) -> f64 {
        self.path.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
    }

    /// Distance in kilometers, one decimal, if known
    pub fn distance_km(&self) -> Option<f64> {
        self.distance_meters.map(|m| (m / 100.0).round() / 10.0)
    }

    /// Duration in whole minutes, if known
    pub fn duration_minutes(&self) -> Option<u64> {
        self.duration_seconds.map(|s| (s / 60.0).round() as u64)
    }
}

/// Trait for routing backends
pub trait RoutingBackend: Send + Sync {
    /// Request a route from `start` to `end` with full path geometry
    ///
    /// Backends pick the first-ranked candidate and fail on zero candidates
    fn route(
        &self,
        start: Coordinate,
        end: Coordinate,
    ) -> impl Future<Output = Result<RouteResult>> + Send;
}

/// Route provider that never fails
#[derive(Debug)]
pub struct RouteProvider<B> {
    backend: B,
}

impl<B: RoutingBackend> RouteProvider<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Route from `start` to `end`, falling back to a straight line
    pub async fn get_route(&self, start: Coordinate, end: Coordinate) -> RouteResult {
        match self.backend.route(start, end).await {
            Ok(route) if route.path.len() >= 2 => {
                info!(
                    points = route.path.len(),
                    distance_m = ?route.distance_meters,
                    "route planned"
                );
                route
            }
            Ok(route) => {
                warn!(points = route.path.len(), "routing backend returned a degenerate path");
                RouteResult::fallback(start, end)
            }
            Err(e) => {
                warn!(error = %e, "routing failed, using straight line");
                RouteResult::fallback(start, end)
            }
        }
    }
}
