//! Geographic coordinates
//!
//! The `Coordinate` value type used by every other module, plus the few
//! geometric helpers the session needs (great-circle distance, bounds).

use crate::constants::geo::EARTH_RADIUS_METERS;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A geographic coordinate (longitude, latitude) in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinate {
    /// Create new coordinates
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Validate that coordinates are within valid ranges
    ///
    /// Longitude: -180 to 180
    /// Latitude: -90 to 90
    pub fn validate(&self) -> Result<()> {
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::InvalidCoordinates(format!(
                "Longitude {} is out of range [-180, 180]",
                self.longitude
            )));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::InvalidCoordinates(format!(
                "Latitude {} is out of range [-90, 90]",
                self.latitude
            )));
        }
        Ok(())
    }

    /// Great-circle distance to another coordinate in meters (Haversine formula)
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude * PI / 180.0;
        let lat2 = other.latitude * PI / 180.0;
        let delta_lat = (other.latitude - self.latitude) * PI / 180.0;
        let delta_lng = (other.longitude - self.longitude) * PI / 180.0;

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_METERS * c
    }

    /// `[lng, lat]` pair as used by GeoJSON
    pub fn to_pair(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.longitude, self.latitude)
    }
}

/// Parses `"lng,lat"`
impl std::str::FromStr for Coordinate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (lng, lat) = s.split_once(',').ok_or_else(|| {
            Error::InvalidCoordinates(format!("Expected \"lng,lat\", got: {}", s))
        })?;
        let longitude: f64 = lng.trim().parse().map_err(|_| {
            Error::InvalidCoordinates(format!("Invalid longitude: {}", lng))
        })?;
        let latitude: f64 = lat.trim().parse().map_err(|_| {
            Error::InvalidCoordinates(format!("Invalid latitude: {}", lat))
        })?;

        let coord = Coordinate::new(longitude, latitude);
        coord.validate()?;
        Ok(coord)
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

impl Bounds {
    /// Smallest box containing every coordinate, or None for an empty slice
    pub fn from_coords(coords: &[Coordinate]) -> Option<Self> {
        let first = coords.first()?;
        let mut bounds = Bounds {
            south_west: *first,
            north_east: *first,
        };
        for c in &coords[1..] {
            bounds.extend(*c);
        }
        Some(bounds)
    }

    /// Grow the box to include a coordinate
    pub fn extend(&mut self, c: Coordinate) {
        self.south_west.longitude = self.south_west.longitude.min(c.longitude);
        self.south_west.latitude = self.south_west.latitude.min(c.latitude);
        self.north_east.longitude = self.north_east.longitude.max(c.longitude);
        self.north_east.latitude = self.north_east.latitude.max(c.latitude);
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.south_west.longitude + self.north_east.longitude) / 2.0,
            (self.south_west.latitude + self.north_east.latitude) / 2.0,
        )
    }
}
