//! Session controller
//!
//! Sole owner of the rendering surface. Every entry point replans against
//! the latest intent, executes the steps, and returns the asynchronous work
//! the caller must run. Failures become notices; nothing here is fatal
//! except failing to construct the surface.

use crate::config::{Config, StylesConfig};
use crate::constants::camera::{
    DESTINATION_BEARING, DESTINATION_PITCH, DESTINATION_ZOOM, INITIAL_CENTER_LAT,
    INITIAL_CENTER_LNG, INITIAL_ZOOM, ROUTE_PADDING_PX, ROUTE_PITCH, USER_ZOOM,
};
use crate::constants::layers::{
    BUILDINGS_LAYER_ID, DESTINATION_MARKER_COLOR, ROUTE_LAYER_ID, ROUTE_LINE_COLOR,
    ROUTE_SOURCE_ID, USER_MARKER_COLOR,
};
use crate::coord::Coordinate;
use crate::error::{Error, GeolocationError, Result};
use crate::place::PlaceMatch;
use crate::route::RouteResult;
use crate::session::buildings::add_building_layer;
use crate::session::plan::{plan, Step};
use crate::session::{
    BuildingLayer, CachedRoute, Effect, MapIntent, Notice, PendingRoute, RouteKey, RouteTicket,
    SessionState, StyleId, StyleLoadPhase,
};
use crate::surface::layer::{LineCap, LineJoin, LinePaint, Paint};
use crate::surface::{CameraTarget, LayerSpec, MarkerSpec, RenderSurface, SourceData, SurfaceOptions};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Session parameters taken from configuration
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub styles: StylesConfig,
    pub initial_style: StyleId,
    pub buildings: bool,
    pub fallback_origin: Coordinate,
    pub settle_delay: Duration,
    pub settle_max_polls: u32,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let fallback_origin = config.map.fallback_origin;
        fallback_origin.validate()?;

        Ok(Self {
            styles: config.styles.clone(),
            initial_style: config.map.initial_style()?,
            buildings: config.map.buildings,
            fallback_origin,
            settle_delay: config.map.settle_delay(),
            settle_max_polls: config.map.settle_max_polls.max(1),
        })
    }

    /// Options the surface is constructed with
    pub fn surface_options(&self) -> SurfaceOptions {
        SurfaceOptions {
            style_ref: self.styles.reference(self.initial_style).to_string(),
            camera: CameraTarget {
                center: Coordinate::new(INITIAL_CENTER_LNG, INITIAL_CENTER_LAT),
                zoom: INITIAL_ZOOM,
                pitch: Some(0.0),
                bearing: Some(0.0),
            },
        }
    }
}

/// Reconciles one rendering surface against the latest intent
pub struct SessionController<S> {
    surface: S,
    settings: SessionSettings,
    intent: MapIntent,
    state: SessionState,
    notices: Vec<Notice>,
    next_ticket: u64,
    loaded_once: bool,
    recentered: bool,
}

impl<S: RenderSurface> SessionController<S> {
    /// Construct the surface and start the session
    ///
    /// Returns the initial effects: a position request and, if the surface
    /// comes up with its style already loaded, the first settle wait.
    pub fn start<F>(factory: F, settings: SessionSettings) -> Result<(Self, Vec<Effect>)>
    where
        F: FnOnce(&SurfaceOptions) -> Result<S>,
    {
        let options = settings.surface_options();
        let surface = factory(&options).map_err(|e| {
            error!(error = %e, style = %options.style_ref, "failed to create rendering surface");
            e
        })?;

        let intent = MapIntent {
            style: settings.initial_style,
            buildings_visible: settings.buildings,
            ..MapIntent::default()
        };

        let mut controller = Self {
            surface,
            state: SessionState::new(settings.initial_style),
            settings,
            intent,
            notices: Vec::new(),
            next_ticket: 1,
            loaded_once: false,
            recentered: false,
        };
        info!(style = %controller.state.current_style, "map session started");

        let mut effects = vec![Effect::AcquirePosition];
        if controller.surface.is_style_ready() {
            effects.extend(controller.on_style_loaded());
        }
        Ok((controller, effects))
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn intent(&self) -> &MapIntent {
        &self.intent
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Take the notices emitted since the last call
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Reconcile against a new intent
    pub fn apply_intent(&mut self, intent: MapIntent) -> Vec<Effect> {
        if !intent.buildings_visible {
            // A later toggle on retries the building source lookup
            self.state.buildings_unavailable = false;
        }
        self.intent = intent;
        self.reconcile()
    }

    /// The surface finished loading a style
    pub fn on_style_loaded(&mut self) -> Vec<Effect> {
        if self.state.style_phase == StyleLoadPhase::Ready {
            debug!("style already ready, ignoring load event");
            return Vec::new();
        }

        self.state.style_phase = StyleLoadPhase::Ready;
        self.state.sources_settled = false;
        if self.loaded_once {
            self.notify(Notice::success(format!(
                "Switched to {} style",
                self.state.current_style
            )));
        } else {
            self.loaded_once = true;
            self.notify(Notice::success("Map loaded"));
        }

        vec![self.settle_effect(0)]
    }

    /// A settle wait finished
    pub fn on_settled(&mut self, generation: u64, attempt: u32) -> Vec<Effect> {
        if generation != self.state.style_generation
            || self.state.style_phase != StyleLoadPhase::Ready
            || self.state.sources_settled
        {
            debug!(generation, current = self.state.style_generation, "ignoring stale settle");
            return Vec::new();
        }

        if !self.surface.is_style_ready() {
            if attempt + 1 < self.settings.settle_max_polls {
                debug!(generation, attempt, "style sources not ready, waiting");
                return vec![self.settle_effect(attempt + 1)];
            }
            self.state.sources_settled = true;
            self.notify(Notice::error(Error::StyleLoadIncomplete.to_string()));
            return Vec::new();
        }

        debug!(generation, attempt, "style settled");
        self.state.sources_settled = true;
        self.reconcile()
    }

    /// A route fetch completed
    pub fn on_route_ready(&mut self, ticket: RouteTicket, result: RouteResult) -> Vec<Effect> {
        let pending = match self.state.pending_route {
            Some(pending) if pending.ticket == ticket => pending,
            _ => {
                debug!(ticket = ticket.0, "dropping superseded route");
                return Vec::new();
            }
        };

        let current_destination = self.intent.destination.as_ref().map(|d| d.coordinate);
        if current_destination != Some(pending.key.destination) {
            debug!(ticket = ticket.0, "dropping route for a replaced destination");
            self.state.pending_route = None;
            return Vec::new();
        }

        self.state.pending_route = None;
        self.state.route = Some(CachedRoute {
            key: pending.key,
            result,
            announced: false,
        });
        self.reconcile()
    }

    /// The one-shot position request completed
    pub fn on_position(
        &mut self,
        result: std::result::Result<Coordinate, GeolocationError>,
    ) -> Vec<Effect> {
        match result {
            Ok(coord) => {
                self.state.user_location = Some(coord);
                self.place_user_marker(coord);
                if !self.recentered {
                    self.recentered = true;
                    self.fly(CameraTarget {
                        center: coord,
                        zoom: USER_ZOOM,
                        pitch: None,
                        bearing: None,
                    });
                }
                self.notify(Notice::success(format!("Location found: {}", coord)));
            }
            Err(e) => {
                self.notify(Notice::error(format!(
                    "Location unavailable ({}), using default origin",
                    e
                )));
            }
        }
        self.reconcile()
    }

    /// Destroy the surface and hand it back
    pub fn shutdown(mut self) -> S {
        self.surface.destroy();
        info!("map session shut down");
        self.surface
    }

    fn reconcile(&mut self) -> Vec<Effect> {
        let steps = plan(&self.intent, &self.state, self.settings.fallback_origin);
        let mut effects = Vec::new();
        for step in steps {
            debug!(?step, "reconcile");
            self.execute(step, &mut effects);
        }
        effects
    }

    fn execute(&mut self, step: Step, effects: &mut Vec<Effect>) {
        match step {
            Step::LoadStyle(style) => self.load_style(style),
            Step::AddBuildings => self.add_buildings(),
            Step::ShowBuildings => self.set_buildings_visible(true),
            Step::HideBuildings => self.set_buildings_visible(false),
            Step::PlaceDestination(place) => self.place_destination(place),
            Step::ClearDestination => {
                if let Some(handle) = self.state.destination_marker.take() {
                    if let Err(e) = self.surface.remove_marker(handle) {
                        warn!(error = %e, "failed to remove destination marker");
                    }
                }
                self.state.destination = None;
            }
            Step::ClearRoute => self.clear_route(),
            Step::RequestRoute(key) => effects.push(self.request_route(key)),
            Step::DrawRoute => self.draw_route(),
        }
    }

    fn load_style(&mut self, style: StyleId) {
        let style_ref = self.settings.styles.reference(style).to_string();
        if let Err(e) = self.surface.load_style(&style_ref) {
            self.notify(Notice::error(format!("Failed to switch style: {}", e)));
            return;
        }

        // The surface discards custom layers; markers survive
        let state = &mut self.state;
        state.current_style = style;
        state.style_phase = StyleLoadPhase::Loading;
        state.style_generation += 1;
        state.sources_settled = false;
        state.buildings = BuildingLayer::Absent;
        state.buildings_unavailable = false;
        state.route_overlay = None;
        info!(%style, generation = state.style_generation, "loading style");
    }

    fn add_buildings(&mut self) {
        let style_ref = self.settings.styles.reference(self.state.current_style).to_string();
        match add_building_layer(&mut self.surface, &style_ref) {
            Ok(_) => {
                self.state.buildings = BuildingLayer::Shown;
                self.notify(Notice::success("3D buildings enabled"));
            }
            Err(Error::SourceNotFound(_)) => {
                self.state.buildings_unavailable = true;
                self.notify(Notice::error(format!(
                    "3D buildings are not available for the {} style",
                    self.state.current_style
                )));
            }
            Err(e) => self.notify(Notice::error(format!("Failed to add 3D buildings: {}", e))),
        }
    }

    fn set_buildings_visible(&mut self, visible: bool) {
        match self.surface.set_layer_visibility(BUILDINGS_LAYER_ID, visible) {
            Ok(()) => {
                self.state.buildings = if visible {
                    BuildingLayer::Shown
                } else {
                    BuildingLayer::Hidden
                };
                let verb = if visible { "shown" } else { "hidden" };
                self.notify(Notice::info(format!("3D buildings {}", verb)));
            }
            Err(e) => {
                warn!(error = %e, "building layer missing, will re-add");
                self.state.buildings = BuildingLayer::Absent;
            }
        }
    }

    fn place_destination(&mut self, place: PlaceMatch) {
        if let Some(old) = self.state.destination_marker.take() {
            if let Err(e) = self.surface.remove_marker(old) {
                warn!(error = %e, "failed to remove previous destination marker");
            }
        }

        let marker = MarkerSpec {
            coordinate: place.coordinate,
            color: DESTINATION_MARKER_COLOR.to_string(),
            popup_html: Some(format!("<h3>{}</h3>", escape_html(&place.display_name))),
        };
        match self.surface.place_marker(&marker) {
            Ok(handle) => {
                self.state.destination_marker = Some(handle);
                self.fly(CameraTarget {
                    center: place.coordinate,
                    zoom: DESTINATION_ZOOM,
                    pitch: Some(DESTINATION_PITCH),
                    bearing: Some(DESTINATION_BEARING),
                });
                self.notify(Notice::success(format!("Found: {}", place.display_name)));
                self.state.destination = Some(place);
            }
            Err(e) => self.notify(Notice::error(format!("Failed to mark destination: {}", e))),
        }
    }

    fn place_user_marker(&mut self, coord: Coordinate) {
        if let Some(old) = self.state.user_marker.take() {
            if let Err(e) = self.surface.remove_marker(old) {
                warn!(error = %e, "failed to remove previous user marker");
            }
        }
        let marker = MarkerSpec {
            coordinate: coord,
            color: USER_MARKER_COLOR.to_string(),
            popup_html: None,
        };
        match self.surface.place_marker(&marker) {
            Ok(handle) => self.state.user_marker = Some(handle),
            Err(e) => warn!(error = %e, "failed to place user marker"),
        }
    }

    fn clear_route(&mut self) {
        if self.state.route_overlay.take().is_some() {
            if let Err(e) = self.surface.remove_layer(ROUTE_LAYER_ID) {
                warn!(error = %e, "failed to remove route layer");
            }
        }
        if let Some(pending) = self.state.pending_route.take() {
            debug!(ticket = pending.ticket.0, "abandoning route request");
        }
        self.state.route = None;
    }

    fn request_route(&mut self, key: RouteKey) -> Effect {
        let ticket = RouteTicket(self.next_ticket);
        self.next_ticket += 1;
        self.state.pending_route = Some(PendingRoute { ticket, key });
        info!(ticket = ticket.0, origin = %key.origin, destination = %key.destination, "requesting route");
        self.notify(Notice::info("Planning route..."));
        Effect::FetchRoute { ticket, key }
    }

    fn draw_route(&mut self) {
        let Some(cached) = self.state.route.as_ref() else {
            return;
        };
        let key = cached.key;
        let result = cached.result.clone();
        let announce = !cached.announced;

        if let Err(e) = self.render_route(&result) {
            self.notify(Notice::error(format!("Failed to draw route: {}", e)));
            return;
        }
        self.state.route_overlay = Some(key);

        if announce {
            if let Some(cached) = self.state.route.as_mut() {
                cached.announced = true;
            }
            let notice = match (result.is_fallback, result.distance_km(), result.duration_minutes()) {
                (true, _, _) => Notice::error("Routing service unavailable, showing straight line"),
                (false, Some(km), Some(min)) => {
                    Notice::success(format!("Route: {:.1} km, {} min", km, min))
                }
                (false, _, _) => Notice::success("Route planned"),
            };
            self.notify(notice);
        }
    }

    fn render_route(&mut self, result: &RouteResult) -> Result<()> {
        let mut properties = BTreeMap::new();
        if let Some(distance) = result.distance_meters {
            properties.insert("distance".to_string(), distance);
        }
        if let Some(duration) = result.duration_seconds {
            properties.insert("duration".to_string(), duration);
        }
        let data = SourceData::LineString {
            coordinates: result.path.clone(),
            properties,
        };

        self.surface.add_or_update_source(ROUTE_SOURCE_ID, &data)?;
        if self.state.route_overlay.is_none() {
            self.surface.add_layer(&route_layer(), None)?;
        }
        self.surface
            .fit_bounds(&result.path, ROUTE_PADDING_PX, ROUTE_PITCH)?;
        Ok(())
    }

    fn settle_effect(&self, attempt: u32) -> Effect {
        Effect::Settle {
            generation: self.state.style_generation,
            attempt,
            delay: self.settings.settle_delay,
        }
    }

    fn fly(&mut self, target: CameraTarget) {
        if let Err(e) = self.surface.fly_to(&target) {
            warn!(error = %e, "camera animation failed");
        }
    }

    fn notify(&mut self, notice: Notice) {
        if notice.is_error() {
            warn!(message = %notice.message, "notice");
        } else {
            info!(level = ?notice.level, message = %notice.message, "notice");
        }
        self.notices.push(notice);
    }
}

fn route_layer() -> LayerSpec {
    LayerSpec {
        id: ROUTE_LAYER_ID.to_string(),
        source: ROUTE_SOURCE_ID.to_string(),
        source_layer: None,
        filter: None,
        min_zoom: None,
        paint: Paint::Line(LinePaint {
            color: ROUTE_LINE_COLOR.to_string(),
            width: 8.0,
            opacity: 0.8,
            join: LineJoin::Round,
            cap: LineCap::Round,
        }),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::PlaceSource;
    use crate::session::NoticeLevel;
    use crate::surface::{HeadlessSurface, StyleCatalog, SurfaceCall};

    type Controller = SessionController<HeadlessSurface>;

    fn settings() -> SessionSettings {
        SessionSettings::from_config(&Config::default()).unwrap()
    }

    fn start_with(deferred: bool) -> (Controller, Vec<Effect>) {
        let settings = settings();
        let catalog = StyleCatalog::from_config(&settings.styles);
        SessionController::start(
            |options| {
                let surface = HeadlessSurface::new(options, catalog)?;
                Ok(if deferred {
                    surface.with_deferred_loading()
                } else {
                    surface
                })
            },
            settings,
        )
        .unwrap()
    }

    /// Started and settled session with notices drained
    fn settled() -> Controller {
        let (mut c, _) = start_with(false);
        c.on_settled(0, 0);
        c.drain_notices();
        c
    }

    fn place(name: &str, lng: f64, lat: f64) -> PlaceMatch {
        PlaceMatch::new(Coordinate::new(lng, lat), name, PlaceSource::Local)
    }

    fn road(start: Coordinate, end: Coordinate) -> RouteResult {
        let mid = Coordinate::new(
            (start.longitude + end.longitude) / 2.0,
            (start.latitude + end.latitude) / 2.0 + 0.01,
        );
        RouteResult {
            path: vec![start, mid, end],
            distance_meters: Some(8_250.0),
            duration_seconds: Some(1_260.0),
            is_fallback: false,
        }
    }

    fn navigate_to(dest: &PlaceMatch) -> MapIntent {
        MapIntent {
            destination: Some(dest.clone()),
            navigation_requested: true,
            ..MapIntent::default()
        }
    }

    fn fetches(effects: &[Effect]) -> Vec<(RouteTicket, RouteKey)> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::FetchRoute { ticket, key } => Some((*ticket, *key)),
                _ => None,
            })
            .collect()
    }

    fn drawn_path(c: &Controller) -> Option<Vec<Coordinate>> {
        match c.surface().source(ROUTE_SOURCE_ID)? {
            SourceData::LineString { coordinates, .. } => Some(coordinates.clone()),
        }
    }

    fn error_count(notices: &[Notice]) -> usize {
        notices.iter().filter(|n| n.level == NoticeLevel::Error).count()
    }

    #[test]
    fn test_start_requests_position_and_settle() {
        let (c, effects) = start_with(false);
        assert_eq!(effects.len(), 2);
        assert_eq!(effects[0], Effect::AcquirePosition);
        assert!(matches!(effects[1], Effect::Settle { generation: 0, attempt: 0, .. }));
        assert_eq!(c.state().style_phase, StyleLoadPhase::Ready);
        assert!(!c.state().buildings_layer_present());
    }

    #[test]
    fn test_surface_construction_failure_aborts() {
        let result = SessionController::<HeadlessSurface>::start(
            |_| Err(Error::Surface("no GPU".to_string())),
            settings(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_buildings_after_settle() {
        let c = settled();
        assert!(c.state().buildings_layer_present());
        assert!(c.surface().has_layer(BUILDINGS_LAYER_ID));
    }

    #[test]
    fn test_buildings_present_iff_style_has_source() {
        for style in StyleId::ALL {
            let mut c = settled();
            c.apply_intent(MapIntent {
                style,
                ..MapIntent::default()
            });
            let mut effects = c.on_style_loaded();
            if style == StyleId::Default {
                // Same style: nothing was reloaded
                assert!(effects.is_empty());
                assert!(c.state().buildings_layer_present());
                continue;
            }
            assert!(!c.state().buildings_layer_present());

            while let Some(Effect::Settle { generation, attempt, .. }) = effects.pop() {
                effects = c.on_settled(generation, attempt);
            }
            // Redundant load events and settles change nothing
            c.on_style_loaded();
            c.on_settled(c.state().style_generation, 0);
            c.apply_intent(c.intent().clone());

            let notices = c.drain_notices();
            match style {
                StyleId::Satellite => {
                    assert!(!c.state().buildings_layer_present());
                    assert!(!c.surface().has_layer(BUILDINGS_LAYER_ID));
                    assert_eq!(error_count(&notices), 1);
                }
                _ => {
                    assert!(c.state().buildings_layer_present());
                    assert_eq!(error_count(&notices), 0);
                }
            }
        }
    }

    #[test]
    fn test_toggling_buildings() {
        let mut c = settled();
        c.apply_intent(MapIntent {
            buildings_visible: false,
            ..MapIntent::default()
        });
        assert_eq!(c.state().buildings, BuildingLayer::Hidden);
        assert_eq!(c.surface().layer_visible(BUILDINGS_LAYER_ID), Some(false));

        c.apply_intent(MapIntent::default());
        assert_eq!(c.state().buildings, BuildingLayer::Shown);
        assert_eq!(c.surface().layer_visible(BUILDINGS_LAYER_ID), Some(true));
    }

    #[test]
    fn test_one_destination_marker() {
        let mut c = settled();
        let places = [
            place("tokyo tower", 139.7454, 35.6586),
            place("skytree", 139.8107, 35.7101),
            place("shibuya", 139.7016, 35.6580),
        ];
        for p in &places {
            c.apply_intent(MapIntent {
                destination: Some(p.clone()),
                ..MapIntent::default()
            });
            assert_eq!(c.surface().markers_with_color(DESTINATION_MARKER_COLOR), 1);
            assert_eq!(c.surface().camera().center, p.coordinate);
            assert_eq!(c.surface().camera().zoom, DESTINATION_ZOOM);
            assert_eq!(c.surface().camera().pitch, Some(DESTINATION_PITCH));
        }
    }

    #[test]
    fn test_popup_is_escaped() {
        let mut c = settled();
        c.apply_intent(MapIntent {
            destination: Some(place("<b>A & B</b>", 139.0, 35.0)),
            ..MapIntent::default()
        });
        let (_, marker) = c.surface().markers().next().unwrap();
        assert_eq!(
            marker.popup_html.as_deref(),
            Some("<h3>&lt;b&gt;A &amp; B&lt;/b&gt;</h3>")
        );
    }

    #[test]
    fn test_identical_intent_is_idempotent() {
        let mut c = settled();
        let dest = place("kyoto", 135.7681, 35.0116);
        let intent = navigate_to(&dest);

        let effects = c.apply_intent(intent.clone());
        let (ticket, key) = fetches(&effects)[0];
        c.on_route_ready(ticket, road(key.origin, key.destination));

        let before = c.surface().mutation_count();
        assert!(c.apply_intent(intent.clone()).is_empty());
        assert!(c.apply_intent(intent).is_empty());
        assert_eq!(c.surface().mutation_count(), before);
    }

    #[test]
    fn test_navigation_uses_fallback_origin() {
        let mut c = settled();
        c.on_position(Err(GeolocationError::Timeout));
        let notices = c.drain_notices();
        assert_eq!(error_count(&notices), 1);
        assert!(c.state().user_location.is_none());

        let dest = place("osaka", 135.5023, 34.6937);
        let effects = c.apply_intent(navigate_to(&dest));
        let requested = fetches(&effects);
        assert_eq!(requested.len(), 1);
        assert_eq!(requested[0].1.origin, c.settings().fallback_origin);
        assert_eq!(requested[0].1.destination, dest.coordinate);
    }

    #[test]
    fn test_stale_route_is_dropped() {
        let a = place("kyoto", 135.7681, 35.0116);
        let b = place("nara", 135.8048, 34.6851);

        for a_first in [true, false] {
            let mut c = settled();
            let (ticket_a, key_a) = fetches(&c.apply_intent(navigate_to(&a)))[0];
            let (ticket_b, key_b) = fetches(&c.apply_intent(navigate_to(&b)))[0];
            assert_ne!(ticket_a, ticket_b);

            let route_a = road(key_a.origin, key_a.destination);
            let route_b = road(key_b.origin, key_b.destination);
            if a_first {
                assert!(c.on_route_ready(ticket_a, route_a.clone()).is_empty());
                c.on_route_ready(ticket_b, route_b.clone());
            } else {
                c.on_route_ready(ticket_b, route_b.clone());
                c.on_route_ready(ticket_a, route_a.clone());
            }

            assert_eq!(drawn_path(&c), Some(route_b.path.clone()));
            assert_eq!(c.state().route_overlay, Some(key_b));
            let layers = c.surface().layer_ids();
            assert_eq!(layers.iter().filter(|id| **id == ROUTE_LAYER_ID).count(), 1);
        }
    }

    #[test]
    fn test_route_overlay_and_notice() {
        let mut c = settled();
        let dest = place("kyoto", 135.7681, 35.0116);
        let (ticket, key) = fetches(&c.apply_intent(navigate_to(&dest)))[0];
        c.drain_notices();

        c.on_route_ready(ticket, road(key.origin, key.destination));
        assert!(c.state().route_overlay_present());
        assert_eq!(c.surface().camera().pitch, Some(ROUTE_PITCH));
        assert!(c
            .surface()
            .calls()
            .iter()
            .any(|call| matches!(call, SurfaceCall::FitBounds { padding, .. } if *padding == ROUTE_PADDING_PX)));

        let notices = c.drain_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, "Route: 8.3 km, 21 min");
    }

    #[test]
    fn test_fallback_route_notice() {
        let mut c = settled();
        let dest = place("kyoto", 135.7681, 35.0116);
        let (ticket, key) = fetches(&c.apply_intent(navigate_to(&dest)))[0];
        c.drain_notices();

        c.on_route_ready(ticket, RouteResult::fallback(key.origin, key.destination));
        assert_eq!(drawn_path(&c), Some(vec![key.origin, key.destination]));
        assert_eq!(error_count(&c.drain_notices()), 1);
    }

    #[test]
    fn test_style_swap_restores_layers_without_refetch() {
        let mut c = settled();
        let dest = place("kyoto", 135.7681, 35.0116);
        let (ticket, key) = fetches(&c.apply_intent(navigate_to(&dest)))[0];
        let route = road(key.origin, key.destination);
        c.on_route_ready(ticket, route.clone());
        assert!(c.state().buildings_layer_present());
        assert!(c.state().route_overlay_present());

        let mut intent = navigate_to(&dest);
        intent.style = StyleId::Terrain;
        let effects = c.apply_intent(intent);
        assert!(fetches(&effects).is_empty());
        assert!(!c.state().buildings_layer_present());
        assert!(!c.state().route_overlay_present());
        assert!(!c.surface().has_layer(ROUTE_LAYER_ID));

        let settle = c.on_style_loaded();
        assert_eq!(settle.len(), 1);
        let effects = c.on_settled(c.state().style_generation, 0);
        assert!(fetches(&effects).is_empty());

        assert!(c.state().buildings_layer_present());
        assert!(c.state().route_overlay_present());
        assert_eq!(drawn_path(&c), Some(route.path));
        assert_eq!(c.surface().markers_with_color(DESTINATION_MARKER_COLOR), 1);
    }

    #[test]
    fn test_route_arriving_while_loading_waits_for_settle() {
        let (mut c, _) = start_with(true);
        c.on_settled(0, 0);

        let dest = place("kyoto", 135.7681, 35.0116);
        let mut intent = navigate_to(&dest);
        intent.style = StyleId::Satellite;
        let (ticket, key) = fetches(&c.apply_intent(intent))[0];
        assert_eq!(c.state().style_phase, StyleLoadPhase::Loading);

        c.on_route_ready(ticket, road(key.origin, key.destination));
        assert!(!c.state().route_overlay_present());
        assert!(c.state().route.is_some());

        assert!(c.surface_mut().complete_style_load());
        c.on_style_loaded();
        c.on_settled(c.state().style_generation, 0);
        assert!(c.state().route_overlay_present());
    }

    #[test]
    fn test_settle_polls_until_ready() {
        let (mut c, _) = start_with(true);
        c.on_settled(0, 0);
        c.drain_notices();

        c.apply_intent(MapIntent {
            style: StyleId::Satellite,
            ..MapIntent::default()
        });
        // Load event delivered before the sources are queryable
        c.on_style_loaded();
        let generation = c.state().style_generation;

        let retry = c.on_settled(generation, 0);
        assert!(matches!(retry[..], [Effect::Settle { attempt: 1, .. }]));

        c.surface_mut().complete_style_load();
        c.on_settled(generation, 1);
        assert!(c.state().sources_settled);
        // Satellite imagery has no building source
        assert!(c.state().buildings_unavailable);
    }

    #[test]
    fn test_settle_gives_up() {
        let (mut c, _) = start_with(true);
        c.on_settled(0, 0);
        c.apply_intent(MapIntent {
            style: StyleId::Satellite,
            ..MapIntent::default()
        });
        c.on_style_loaded();
        c.drain_notices();

        let generation = c.state().style_generation;
        let mut attempt = 0;
        let mut effects = c.on_settled(generation, attempt);
        while let [Effect::Settle { attempt: next, .. }] = effects[..] {
            attempt = next;
            effects = c.on_settled(generation, attempt);
        }
        assert_eq!(attempt + 1, c.settings().settle_max_polls);
        let notices = c.drain_notices();
        assert_eq!(error_count(&notices), 1);
        assert_eq!(notices[0].message, Error::StyleLoadIncomplete.to_string());
    }

    #[test]
    fn test_stale_settle_ignored() {
        let mut c = settled();
        c.apply_intent(MapIntent {
            style: StyleId::Satellite,
            ..MapIntent::default()
        });
        c.on_style_loaded();
        assert!(c.on_settled(0, 0).is_empty());
        assert!(!c.state().sources_settled);
    }

    #[test]
    fn test_position_fix_places_marker_and_reroutes() {
        let mut c = settled();
        let dest = place("kyoto", 135.7681, 35.0116);
        let (ticket, key) = fetches(&c.apply_intent(navigate_to(&dest)))[0];
        c.on_route_ready(ticket, road(key.origin, key.destination));

        let here = Coordinate::new(139.7005, 35.6938);
        let effects = c.on_position(Ok(here));
        assert_eq!(c.surface().markers_with_color(USER_MARKER_COLOR), 1);
        assert_eq!(c.surface().camera().zoom, USER_ZOOM);

        let requested = fetches(&effects);
        assert_eq!(requested.len(), 1);
        assert_eq!(requested[0].1.origin, here);
        // The old overlay stays until the new route arrives
        assert_eq!(c.state().route_overlay, Some(key));
    }

    #[test]
    fn test_clearing_destination() {
        let mut c = settled();
        let dest = place("kyoto", 135.7681, 35.0116);
        let (ticket, key) = fetches(&c.apply_intent(navigate_to(&dest)))[0];
        c.on_route_ready(ticket, road(key.origin, key.destination));

        c.apply_intent(MapIntent::default());
        assert_eq!(c.surface().markers_with_color(DESTINATION_MARKER_COLOR), 0);
        assert!(!c.surface().has_layer(ROUTE_LAYER_ID));
        assert!(c.state().route.is_none());
        assert!(c.state().destination.is_none());
    }

    #[test]
    fn test_shutdown_destroys_surface() {
        let c = settled();
        let surface = c.shutdown();
        assert!(surface.is_destroyed());
        assert_eq!(surface.marker_count(), 0);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("Tom's \"café\""), "Tom&#39;s &quot;café&quot;");
    }
}
