//! In-memory rendering surface
//!
//! Keeps the same layer/source graph a map engine would (style layers plus
//! custom ones, style sources plus custom ones, markers, camera) and records
//! every call in an append-only log. Style loads complete immediately unless
//! the surface is built with deferred loading, in which case
//! `complete_style_load` finishes them.

use crate::config::StylesConfig;
use crate::coord::{Bounds, Coordinate};
use crate::error::{Error, Result};
use crate::session::StyleId;
use crate::surface::layer::{LayerInfo, LayerKind, LayerSpec, SourceData};
use crate::surface::{
    CameraTarget, MarkerHandle, MarkerSpec, RenderSurface, StyleLoadedCallback, SurfaceOptions,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

/// Sources and layers a style declares
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDescription {
    pub sources: Vec<String>,
    pub layers: Vec<LayerInfo>,
}

impl StyleDescription {
    /// OpenMapTiles vector style with buildings and labels (liberty-like)
    pub fn vector_streets() -> Self {
        Self {
            sources: vec!["openmaptiles".to_string(), "ne2_shaded".to_string()],
            layers: vec![
                LayerInfo::new("background", LayerKind::Background),
                LayerInfo::new("natural_earth", LayerKind::Raster),
                LayerInfo::new("park", LayerKind::Fill),
                LayerInfo::new("water", LayerKind::Fill),
                LayerInfo::new("building", LayerKind::Fill),
                LayerInfo::new("road_minor", LayerKind::Line),
                LayerInfo::new("road_major", LayerKind::Line),
                LayerInfo::new("poi_icon", LayerKind::Symbol),
                LayerInfo::label("waterway_line_label"),
                LayerInfo::label("poi_r1"),
                LayerInfo::label("label_city"),
            ],
        }
    }

    /// Raster imagery only, no building geometry
    pub fn satellite() -> Self {
        Self {
            sources: vec!["satellite".to_string()],
            layers: vec![
                LayerInfo::new("background", LayerKind::Background),
                LayerInfo::new("satellite", LayerKind::Raster),
            ],
        }
    }
}

/// Style descriptions keyed by style reference
#[derive(Debug, Clone, Default)]
pub struct StyleCatalog {
    styles: HashMap<String, StyleDescription>,
}

impl StyleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(mut self, style_ref: impl Into<String>, description: StyleDescription) -> Self {
        self.styles.insert(style_ref.into(), description);
        self
    }

    /// Catalog for the configured style references
    ///
    /// Default and terrain are vector street styles; satellite is imagery.
    pub fn from_config(styles: &StylesConfig) -> Self {
        // Insert satellite first so a shared reference resolves to the vector style
        Self::new()
            .with_style(styles.reference(StyleId::Satellite), StyleDescription::satellite())
            .with_style(styles.reference(StyleId::Terrain), StyleDescription::vector_streets())
            .with_style(styles.reference(StyleId::Default), StyleDescription::vector_streets())
    }

    pub fn get(&self, style_ref: &str) -> Option<&StyleDescription> {
        self.styles.get(style_ref)
    }
}

/// One recorded surface call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum SurfaceCall {
    LoadStyle {
        style_ref: String,
    },
    AddLayer {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        before: Option<String>,
    },
    RemoveLayer {
        id: String,
    },
    SetLayerVisibility {
        id: String,
        visible: bool,
    },
    AddOrUpdateSource {
        id: String,
        points: usize,
    },
    PlaceMarker {
        handle: MarkerHandle,
        coordinate: Coordinate,
        color: String,
    },
    RemoveMarker {
        handle: MarkerHandle,
    },
    FlyTo(CameraTarget),
    FitBounds {
        bounds: Bounds,
        padding: f64,
        pitch: f64,
    },
    Destroy,
}

#[derive(Debug, Clone)]
struct LiveLayer {
    info: LayerInfo,
    visible: bool,
    custom: bool,
}

/// Rendering surface kept entirely in memory
pub struct HeadlessSurface {
    catalog: StyleCatalog,
    deferred: bool,
    style_ref: String,
    pending_style: Option<String>,
    ready: bool,
    style_sources: Vec<String>,
    custom_sources: BTreeMap<String, SourceData>,
    layers: Vec<LiveLayer>,
    markers: BTreeMap<MarkerHandle, MarkerSpec>,
    next_marker: u64,
    camera: CameraTarget,
    callback: Option<StyleLoadedCallback>,
    log: Vec<SurfaceCall>,
    destroyed: bool,
}

impl std::fmt::Debug for HeadlessSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessSurface")
            .field("style_ref", &self.style_ref)
            .field("ready", &self.ready)
            .field("layers", &self.layers.len())
            .field("markers", &self.markers.len())
            .field("calls", &self.log.len())
            .finish()
    }
}

impl HeadlessSurface {
    /// Create a surface with the initial style already loaded
    ///
    /// Fails if the initial style is not in the catalog.
    pub fn new(options: &SurfaceOptions, catalog: StyleCatalog) -> Result<Self> {
        let description = catalog.get(&options.style_ref).cloned().ok_or_else(|| {
            Error::Surface(format!("Unknown style reference: {}", options.style_ref))
        })?;

        let mut surface = Self {
            catalog,
            deferred: false,
            style_ref: options.style_ref.clone(),
            pending_style: None,
            ready: true,
            style_sources: Vec::new(),
            custom_sources: BTreeMap::new(),
            layers: Vec::new(),
            markers: BTreeMap::new(),
            next_marker: 1,
            camera: options.camera,
            callback: None,
            log: Vec::new(),
            destroyed: false,
        };
        surface.install(description);
        Ok(surface)
    }

    /// Hold subsequent style loads until `complete_style_load`
    pub fn with_deferred_loading(mut self) -> Self {
        self.deferred = true;
        self
    }

    /// Finish a deferred style load and fire the callback
    pub fn complete_style_load(&mut self) -> bool {
        let Some(style_ref) = self.pending_style.take() else {
            return false;
        };
        if let Some(description) = self.catalog.get(&style_ref).cloned() {
            self.install(description);
        }
        self.style_ref = style_ref;
        self.ready = true;
        self.fire_loaded();
        true
    }

    fn install(&mut self, description: StyleDescription) {
        self.style_sources = description.sources;
        self.layers = description
            .layers
            .into_iter()
            .map(|info| LiveLayer {
                info,
                visible: true,
                custom: false,
            })
            .collect();
    }

    fn fire_loaded(&mut self) {
        if let Some(callback) = self.callback.as_mut() {
            callback();
        }
    }

    fn check_alive(&self) -> Result<()> {
        if self.destroyed {
            return Err(Error::Surface("surface has been destroyed".to_string()));
        }
        Ok(())
    }

    fn check_ready(&self) -> Result<()> {
        self.check_alive()?;
        if !self.ready {
            return Err(Error::StyleLoadIncomplete);
        }
        Ok(())
    }

    fn layer_index(&self, id: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.info.id == id)
    }

    fn record(&mut self, call: SurfaceCall) {
        trace!(?call, "surface call");
        self.log.push(call);
    }

    pub fn style_ref(&self) -> &str {
        &self.style_ref
    }

    /// Every call made so far
    pub fn calls(&self) -> &[SurfaceCall] {
        &self.log
    }

    /// Number of recorded calls
    pub fn mutation_count(&self) -> usize {
        self.log.len()
    }

    pub fn has_layer(&self, id: &str) -> bool {
        self.layer_index(id).is_some()
    }

    /// Visibility of a layer, None if absent
    pub fn layer_visible(&self, id: &str) -> Option<bool> {
        self.layer_index(id).map(|i| self.layers[i].visible)
    }

    /// Layer ids in draw order
    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.info.id.as_str()).collect()
    }

    pub fn source(&self, id: &str) -> Option<&SourceData> {
        self.custom_sources.get(id)
    }

    pub fn markers(&self) -> impl Iterator<Item = (&MarkerHandle, &MarkerSpec)> {
        self.markers.iter()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Markers with the given color
    pub fn markers_with_color(&self, color: &str) -> usize {
        self.markers.values().filter(|m| m.color == color).count()
    }

    pub fn camera(&self) -> &CameraTarget {
        &self.camera
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl RenderSurface for HeadlessSurface {
    fn load_style(&mut self, style_ref: &str) -> Result<()> {
        self.check_alive()?;
        let description = self
            .catalog
            .get(style_ref)
            .cloned()
            .ok_or_else(|| Error::Surface(format!("Unknown style reference: {}", style_ref)))?;

        self.record(SurfaceCall::LoadStyle {
            style_ref: style_ref.to_string(),
        });

        // Custom layers and sources do not survive a style swap; markers do
        self.custom_sources.clear();
        self.layers.retain(|l| !l.custom);

        if self.deferred {
            self.ready = false;
            self.pending_style = Some(style_ref.to_string());
        } else {
            self.install(description);
            self.style_ref = style_ref.to_string();
            self.ready = true;
            self.fire_loaded();
        }
        Ok(())
    }

    fn on_style_loaded(&mut self, callback: StyleLoadedCallback) {
        self.callback = Some(callback);
    }

    fn is_style_ready(&self) -> bool {
        self.ready && !self.destroyed
    }

    fn list_data_sources(&self) -> Result<Vec<String>> {
        self.check_ready()?;
        Ok(self
            .style_sources
            .iter()
            .cloned()
            .chain(self.custom_sources.keys().cloned())
            .collect())
    }

    fn list_layers(&self) -> Result<Vec<LayerInfo>> {
        self.check_ready()?;
        Ok(self.layers.iter().map(|l| l.info.clone()).collect())
    }

    fn add_layer(&mut self, spec: &LayerSpec, before_id: Option<&str>) -> Result<()> {
        self.check_ready()?;
        if self.has_layer(&spec.id) {
            return Err(Error::Surface(format!("Layer already exists: {}", spec.id)));
        }
        let known_source = self.style_sources.contains(&spec.source)
            || self.custom_sources.contains_key(&spec.source);
        if !known_source {
            return Err(Error::Surface(format!("Unknown source: {}", spec.source)));
        }

        let position = match before_id {
            Some(before) => self
                .layer_index(before)
                .ok_or_else(|| Error::Surface(format!("No layer to insert before: {}", before)))?,
            None => self.layers.len(),
        };

        self.layers.insert(
            position,
            LiveLayer {
                info: spec.info(),
                visible: true,
                custom: true,
            },
        );
        self.record(SurfaceCall::AddLayer {
            id: spec.id.clone(),
            before: before_id.map(str::to_string),
        });
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<()> {
        self.check_alive()?;
        let index = self
            .layer_index(id)
            .ok_or_else(|| Error::Surface(format!("No such layer: {}", id)))?;
        self.layers.remove(index);
        self.record(SurfaceCall::RemoveLayer { id: id.to_string() });
        Ok(())
    }

    fn set_layer_visibility(&mut self, id: &str, visible: bool) -> Result<()> {
        self.check_alive()?;
        let index = self
            .layer_index(id)
            .ok_or_else(|| Error::Surface(format!("No such layer: {}", id)))?;
        self.layers[index].visible = visible;
        self.record(SurfaceCall::SetLayerVisibility {
            id: id.to_string(),
            visible,
        });
        Ok(())
    }

    fn add_or_update_source(&mut self, id: &str, data: &SourceData) -> Result<()> {
        self.check_ready()?;
        self.custom_sources.insert(id.to_string(), data.clone());
        self.record(SurfaceCall::AddOrUpdateSource {
            id: id.to_string(),
            points: data.point_count(),
        });
        Ok(())
    }

    fn place_marker(&mut self, marker: &MarkerSpec) -> Result<MarkerHandle> {
        self.check_alive()?;
        let handle = MarkerHandle(self.next_marker);
        self.next_marker += 1;
        self.markers.insert(handle, marker.clone());
        self.record(SurfaceCall::PlaceMarker {
            handle,
            coordinate: marker.coordinate,
            color: marker.color.clone(),
        });
        Ok(handle)
    }

    fn remove_marker(&mut self, handle: MarkerHandle) -> Result<()> {
        self.check_alive()?;
        self.markers
            .remove(&handle)
            .ok_or_else(|| Error::Surface(format!("No such marker: {}", handle.0)))?;
        self.record(SurfaceCall::RemoveMarker { handle });
        Ok(())
    }

    fn fly_to(&mut self, target: &CameraTarget) -> Result<()> {
        self.check_alive()?;
        self.camera = CameraTarget {
            center: target.center,
            zoom: target.zoom,
            pitch: target.pitch.or(self.camera.pitch),
            bearing: target.bearing.or(self.camera.bearing),
        };
        self.record(SurfaceCall::FlyTo(*target));
        Ok(())
    }

    fn fit_bounds(&mut self, coords: &[Coordinate], padding: f64, pitch: f64) -> Result<()> {
        self.check_alive()?;
        let bounds = Bounds::from_coords(coords)
            .ok_or_else(|| Error::Surface("Cannot fit empty bounds".to_string()))?;
        self.camera.center = bounds.center();
        self.camera.pitch = Some(pitch);
        self.record(SurfaceCall::FitBounds {
            bounds,
            padding,
            pitch,
        });
        Ok(())
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.record(SurfaceCall::Destroy);
        self.destroyed = true;
        self.callback = None;
        self.markers.clear();
        self.custom_sources.clear();
        self.layers.clear();
    }
}
