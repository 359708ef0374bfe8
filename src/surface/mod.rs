//! Rendering surface capability
//!
//! The map engine is an opaque external collaborator that owns a mutable
//! layer/source graph. The session controller talks to it only through
//! `RenderSurface`, which keeps reconciliation testable against the
//! in-memory `HeadlessSurface`.
//!
//! ## Flex Point
//! A new engine binding implements `RenderSurface` and invokes the
//! registered style-loaded callback once per completed `load_style`.

pub mod headless;
pub mod layer;

pub use headless::{HeadlessSurface, StyleCatalog, StyleDescription, SurfaceCall};
pub use layer::{LayerInfo, LayerKind, LayerSpec, SourceData};

use crate::coord::Coordinate;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Opaque handle to a placed marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerHandle(pub u64);

/// Marker with optional popup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    pub coordinate: Coordinate,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popup_html: Option<String>,
}

/// Viewport animation target
///
/// `None` pitch or bearing keeps the current value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraTarget {
    pub center: Coordinate,
    pub zoom: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f64>,
}

/// Construction parameters for a surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceOptions {
    /// Style reference loaded at construction
    pub style_ref: String,
    pub camera: CameraTarget,
}

/// Invoked by the surface when a style load completes
pub type StyleLoadedCallback = Box<dyn FnMut() + Send>;

/// Capability interface of the rendering surface
///
/// Mutations may fail individually; a failed call leaves the surface usable.
pub trait RenderSurface {
    /// Start loading a style; discards every custom layer and source
    fn load_style(&mut self, style_ref: &str) -> Result<()>;

    /// Register the style-loaded callback, replacing any previous one
    fn on_style_loaded(&mut self, callback: StyleLoadedCallback);

    fn is_style_ready(&self) -> bool;

    /// Data sources declared by the active style plus custom ones
    ///
    /// Fails with `StyleLoadIncomplete` while a style is loading.
    fn list_data_sources(&self) -> Result<Vec<String>>;

    /// Layers in draw order (bottom first)
    fn list_layers(&self) -> Result<Vec<LayerInfo>>;

    /// Add a layer, below `before_id` if given, else on top
    fn add_layer(&mut self, spec: &LayerSpec, before_id: Option<&str>) -> Result<()>;

    fn remove_layer(&mut self, id: &str) -> Result<()>;

    fn set_layer_visibility(&mut self, id: &str, visible: bool) -> Result<()>;

    fn add_or_update_source(&mut self, id: &str, data: &SourceData) -> Result<()>;

    fn place_marker(&mut self, marker: &MarkerSpec) -> Result<MarkerHandle>;

    fn remove_marker(&mut self, handle: MarkerHandle) -> Result<()>;

    fn fly_to(&mut self, target: &CameraTarget) -> Result<()>;

    fn fit_bounds(&mut self, coords: &[Coordinate], padding: f64, pitch: f64) -> Result<()>;

    /// Release the surface; called once at session shutdown
    fn destroy(&mut self);
}
