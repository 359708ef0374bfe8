//! Layer and source descriptions handed to the rendering surface
//!
//! Field names serialize the way style documents spell them, so a surface
//! backed by a real map engine can forward these values untouched.

use crate::coord::Coordinate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Layer render type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerKind {
    Background,
    Fill,
    FillExtrusion,
    Line,
    Symbol,
    Raster,
    Circle,
}

/// A layer as listed by the surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    /// Symbol layer that draws text glyphs
    pub has_text_label: bool,
}

impl LayerInfo {
    pub fn new(id: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id: id.into(),
            kind,
            has_text_label: false,
        }
    }

    pub fn label(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: LayerKind::Symbol,
            has_text_label: true,
        }
    }

    pub fn is_label(&self) -> bool {
        self.kind == LayerKind::Symbol && self.has_text_label
    }
}

/// Feature filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Feature carries the named property
    Has(String),
}

/// One stop of a linear color interpolation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub value: f64,
    pub color: String,
}

/// Color interpolated linearly over a numeric feature property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRamp {
    pub property: String,
    pub stops: Vec<ColorStop>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtrusionPaint {
    pub color: ColorRamp,
    /// Property holding the top height in meters
    pub height_property: String,
    /// Property holding the base height; `base_default` when missing
    pub base_property: String,
    pub base_default: f64,
    pub opacity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineJoin {
    Round,
    Miter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCap {
    Round,
    Butt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinePaint {
    pub color: String,
    pub width: f64,
    pub opacity: f64,
    pub join: LineJoin,
    pub cap: LineCap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Paint {
    FillExtrusion(ExtrusionPaint),
    Line(LinePaint),
}

impl Paint {
    pub fn kind(&self) -> LayerKind {
        match self {
            Paint::FillExtrusion(_) => LayerKind::FillExtrusion,
            Paint::Line(_) => LayerKind::Line,
        }
    }
}

/// A custom layer to add to the surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub id: String,
    pub source: String,
    #[serde(rename = "source-layer", skip_serializing_if = "Option::is_none")]
    pub source_layer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(rename = "minzoom", skip_serializing_if = "Option::is_none")]
    pub min_zoom: Option<f64>,
    pub paint: Paint,
}

impl LayerSpec {
    pub fn info(&self) -> LayerInfo {
        LayerInfo::new(self.id.clone(), self.paint.kind())
    }
}

/// Data for a custom source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SourceData {
    /// A single line feature with numeric properties
    LineString {
        coordinates: Vec<Coordinate>,
        #[serde(default)]
        properties: BTreeMap<String, f64>,
    },
}

impl SourceData {
    pub fn point_count(&self) -> usize {
        match self {
            SourceData::LineString { coordinates, .. } => coordinates.len(),
        }
    }
}
