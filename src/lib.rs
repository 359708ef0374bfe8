//! navmap: 3D navigation map session controller
//!
//! A library and CLI tool that keeps a 3D map rendering surface in line
//! with what the user asked for: basemap style, extruded buildings, a
//! searched destination and a route to it.
//!
//! ## Features
//!
//! - Place resolution through a multilingual local table, then Nominatim
//! - Driving routes from OSRM with a straight-line fallback
//! - Style switching that rebuilds custom layers once the new style settles
//! - One-shot device geolocation with a configurable fallback origin
//! - HTTP API + CLI interface
//!
//! ## Quick Start
//!
//! ```no_run
//! use navmap::session::{HeadlessRuntime, MapIntent, StyleId};
//! use navmap::Config;
//!
//! # async fn demo() -> navmap::Result<()> {
//! let config = Config::default();
//! let (runtime, handle, _notices) = HeadlessRuntime::headless(&config)?;
//! let session = tokio::spawn(runtime.run());
//!
//! handle.apply_intent(MapIntent {
//!     style: StyleId::Satellite,
//!     ..MapIntent::default()
//! })?;
//!
//! handle.shutdown()?;
//! let surface = session.await.unwrap();
//! assert!(surface.is_destroyed());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod coord;
pub mod error;
pub mod format;
pub mod geo;
pub mod place;
pub mod route;
pub mod server;
pub mod session;
pub mod surface;

// Re-export commonly used types
pub use config::Config;
pub use coord::{Bounds, Coordinate};
pub use error::{Error, Result};
pub use place::{PlaceMatch, PlaceResolver};
pub use route::{RouteProvider, RouteResult};
pub use session::{MapIntent, SessionController, SessionHandle, StyleId};
