//! 3D building extrusion layer
//!
//! Styles name their vector sources differently, so the layer is built
//! against whichever known building source the active style declares.

use crate::constants::layers::{BUILDINGS_LAYER_ID, BUILDINGS_MIN_ZOOM};
use crate::error::{Error, Result};
use crate::surface::layer::{ColorRamp, ColorStop, ExtrusionPaint, Filter, Paint};
use crate::surface::{LayerInfo, LayerSpec, RenderSurface};
use tracing::debug;

/// Known building sources and their building feature layer, in preference order
pub const KNOWN_BUILDING_SOURCES: &[(&str, &str)] =
    &[("openmaptiles", "building"), ("protomaps", "buildings")];

/// Extrusion color by height in meters
const HEIGHT_COLOR_STOPS: &[(f64, &str)] = &[
    (0.0, "#e0e0e0"),
    (50.0, "#d0d0d0"),
    (100.0, "#c0c0c0"),
    (200.0, "#a0a0a0"),
];

const EXTRUSION_OPACITY: f64 = 0.8;

/// First known building source the style declares, with its feature layer
pub fn find_building_source(sources: &[String]) -> Option<(&'static str, &'static str)> {
    KNOWN_BUILDING_SOURCES
        .iter()
        .copied()
        .find(|(source, _)| sources.iter().any(|s| s == source))
}

/// First symbol layer that draws text
pub fn first_label_layer(layers: &[LayerInfo]) -> Option<&str> {
    layers.iter().find(|l| l.is_label()).map(|l| l.id.as_str())
}

/// Extrusion layer for buildings carrying a height
pub fn extrusion_layer(source: &str, source_layer: &str) -> LayerSpec {
    LayerSpec {
        id: BUILDINGS_LAYER_ID.to_string(),
        source: source.to_string(),
        source_layer: Some(source_layer.to_string()),
        filter: Some(Filter::Has("height".to_string())),
        min_zoom: Some(BUILDINGS_MIN_ZOOM),
        paint: Paint::FillExtrusion(ExtrusionPaint {
            color: ColorRamp {
                property: "height".to_string(),
                stops: HEIGHT_COLOR_STOPS
                    .iter()
                    .map(|(value, color)| ColorStop {
                        value: *value,
                        color: color.to_string(),
                    })
                    .collect(),
            },
            height_property: "height".to_string(),
            base_property: "min_height".to_string(),
            base_default: 0.0,
            opacity: EXTRUSION_OPACITY,
        }),
    }
}

/// Add the building layer below the first label layer
///
/// Returns `Ok(false)` if the layer already exists. Fails with
/// `SourceNotFound` when the style has no known building source.
pub fn add_building_layer<S: RenderSurface>(surface: &mut S, style_ref: &str) -> Result<bool> {
    let layers = surface.list_layers()?;
    if layers.iter().any(|l| l.id == BUILDINGS_LAYER_ID) {
        return Ok(false);
    }

    let sources = surface.list_data_sources()?;
    let (source, source_layer) = find_building_source(&sources)
        .ok_or_else(|| Error::SourceNotFound(style_ref.to_string()))?;

    let before = first_label_layer(&layers);
    debug!(source, source_layer, before, "adding building layer");
    surface.add_layer(&extrusion_layer(source, source_layer), before)?;
    Ok(true)
}
