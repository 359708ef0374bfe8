//! Async session runtime
//!
//! One task owns the controller and handles events strictly in arrival
//! order. Effects run as independent tokio tasks that post their result
//! back onto the event channel, so a slow route fetch never blocks style
//! switching or building toggles.

use crate::config::Config;
use crate::coord::Coordinate;
use crate::error::{Error, GeolocationError, Result};
use crate::geo::{GeolocationWatcher, LocationProvider, PositionSource};
use crate::place::PlaceMatch;
use crate::route::osrm::OsrmBackend;
use crate::route::{RouteProvider, RouteResult, RoutingBackend};
use crate::session::{
    BuildingLayer, Effect, MapIntent, Notice, RouteTicket, SessionController, SessionSettings,
    StyleId, StyleLoadPhase,
};
use crate::surface::{HeadlessSurface, RenderSurface, StyleCatalog};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use uuid::Uuid;

/// Input to the session loop
#[derive(Debug)]
pub enum SessionEvent {
    Intent(MapIntent),
    StyleLoaded,
    Settled { generation: u64, attempt: u32 },
    RouteReady { ticket: RouteTicket, result: RouteResult },
    Position(std::result::Result<Coordinate, GeolocationError>),
    Shutdown,
}

/// Published view of the session after each event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub intent: MapIntent,
    pub style: StyleId,
    pub phase: StyleLoadPhase,
    pub buildings: BuildingLayer,
    pub user_location: Option<Coordinate>,
    pub destination: Option<PlaceMatch>,
    pub route: Option<RouteResult>,
    pub route_pending: bool,
    pub route_overlay_present: bool,
    pub updated_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn capture<S: RenderSurface>(session_id: Uuid, controller: &SessionController<S>) -> Self {
        let state = controller.state();
        Self {
            session_id,
            intent: controller.intent().clone(),
            style: state.current_style,
            phase: state.style_phase,
            buildings: state.buildings,
            user_location: state.user_location,
            destination: state.destination.clone(),
            route: state.route.as_ref().map(|r| r.result.clone()),
            route_pending: state.pending_route.is_some(),
            route_overlay_present: state.route_overlay_present(),
            updated_at: Utc::now(),
        }
    }
}

/// Cloneable handle for feeding a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub fn apply_intent(&self, intent: MapIntent) -> Result<()> {
        self.send(SessionEvent::Intent(intent))
    }

    /// Ask the session to destroy its surface and stop
    pub fn shutdown(&self) -> Result<()> {
        self.send(SessionEvent::Shutdown)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    fn send(&self, event: SessionEvent) -> Result<()> {
        self.events.send(event).map_err(|_| Error::SessionClosed)
    }
}

/// Session loop plus the services its effects call
pub struct SessionRuntime<S, B, P> {
    session_id: Uuid,
    controller: SessionController<S>,
    initial_effects: Vec<Effect>,
    routes: Arc<RouteProvider<B>>,
    watcher: Arc<GeolocationWatcher<P>>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    notices_tx: mpsc::UnboundedSender<Notice>,
}

/// Headless session wired to the configured services
pub type HeadlessRuntime = SessionRuntime<HeadlessSurface, OsrmBackend, LocationProvider>;

impl<S, B, P> SessionRuntime<S, B, P>
where
    S: RenderSurface,
    B: RoutingBackend + 'static,
    P: PositionSource + 'static,
{
    /// Wrap a started controller
    ///
    /// Registers the style-loaded callback on the surface. Returns the
    /// runtime, a handle for sending intents, and the notice stream.
    pub fn new(
        mut controller: SessionController<S>,
        initial_effects: Vec<Effect>,
        routes: RouteProvider<B>,
        watcher: GeolocationWatcher<P>,
    ) -> (Self, SessionHandle, mpsc::UnboundedReceiver<Notice>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (notices_tx, notices_rx) = mpsc::unbounded_channel();

        let loaded_tx = events_tx.clone();
        controller.surface_mut().on_style_loaded(Box::new(move || {
            let _ = loaded_tx.send(SessionEvent::StyleLoaded);
        }));

        let session_id = Uuid::new_v4();
        let (snapshot_tx, snapshot_rx) =
            watch::channel(SessionSnapshot::capture(session_id, &controller));

        let handle = SessionHandle {
            events: events_tx.clone(),
            snapshot: snapshot_rx,
        };

        let runtime = Self {
            session_id,
            controller,
            initial_effects,
            routes: Arc::new(routes),
            watcher: Arc::new(watcher),
            events_tx,
            events_rx,
            snapshot_tx,
            notices_tx,
        };
        (runtime, handle, notices_rx)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Process events until `Shutdown`; returns the destroyed surface
    pub async fn run(mut self) -> S {
        info!(session = %self.session_id, "session loop started");
        let initial = std::mem::take(&mut self.initial_effects);
        self.dispatch(initial);
        self.publish();

        while let Some(event) = self.events_rx.recv().await {
            debug!(?event, "session event");
            let effects = match event {
                SessionEvent::Intent(intent) => self.controller.apply_intent(intent),
                SessionEvent::StyleLoaded => self.controller.on_style_loaded(),
                SessionEvent::Settled {
                    generation,
                    attempt,
                } => self.controller.on_settled(generation, attempt),
                SessionEvent::RouteReady { ticket, result } => {
                    self.controller.on_route_ready(ticket, result)
                }
                SessionEvent::Position(result) => self.controller.on_position(result),
                SessionEvent::Shutdown => break,
            };
            self.dispatch(effects);
            self.publish();
        }

        info!(session = %self.session_id, "session loop stopped");
        self.controller.shutdown()
    }

    fn dispatch(&self, effects: Vec<Effect>) {
        for effect in effects {
            let tx = self.events_tx.clone();
            match effect {
                Effect::FetchRoute { ticket, key } => {
                    let routes = Arc::clone(&self.routes);
                    tokio::spawn(async move {
                        let result = routes.get_route(key.origin, key.destination).await;
                        let _ = tx.send(SessionEvent::RouteReady { ticket, result });
                    });
                }
                Effect::Settle {
                    generation,
                    attempt,
                    delay,
                } => {
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send(SessionEvent::Settled {
                            generation,
                            attempt,
                        });
                    });
                }
                Effect::AcquirePosition => {
                    let watcher = Arc::clone(&self.watcher);
                    tokio::spawn(async move {
                        let result = watcher.acquire_once().await;
                        let _ = tx.send(SessionEvent::Position(result));
                    });
                }
            }
        }
    }

    fn publish(&mut self) {
        for notice in self.controller.drain_notices() {
            let _ = self.notices_tx.send(notice);
        }
        self.snapshot_tx
            .send_replace(SessionSnapshot::capture(self.session_id, &self.controller));
    }
}

impl HeadlessRuntime {
    /// Start a session on an in-memory surface using the configured services
    pub fn headless(
        config: &Config,
    ) -> Result<(Self, SessionHandle, mpsc::UnboundedReceiver<Notice>)> {
        let settings = SessionSettings::from_config(config)?;
        let catalog = StyleCatalog::from_config(&settings.styles);
        let (controller, effects) =
            SessionController::start(|options| HeadlessSurface::new(options, catalog), settings)?;

        let routes = RouteProvider::new(OsrmBackend::from_config(&config.services)?);
        let watcher = GeolocationWatcher::new(
            LocationProvider::from_config(&config.location),
            config.location.timeout(),
        );
        Ok(Self::new(controller, effects, routes, watcher))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::PlaceSource;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Slow for one destination, quick for the rest
    struct DelayedBackend {
        slow: Coordinate,
        calls: Arc<AtomicUsize>,
    }

    impl RoutingBackend for DelayedBackend {
        async fn route(&self, start: Coordinate, end: Coordinate) -> Result<RouteResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = if end == self.slow { 5 } else { 1 };
            tokio::time::sleep(Duration::from_secs(delay)).await;
            Ok(RouteResult {
                path: vec![start, Coordinate::new(136.0, 35.0), end],
                distance_meters: Some(400_000.0),
                duration_seconds: Some(18_000.0),
                is_fallback: false,
            })
        }
    }

    struct NoPosition;

    impl PositionSource for NoPosition {
        async fn acquire_once(&self) -> std::result::Result<Coordinate, GeolocationError> {
            Err(GeolocationError::Denied)
        }
    }

    fn runtime(
        slow: Coordinate,
        calls: Arc<AtomicUsize>,
    ) -> (
        SessionRuntime<HeadlessSurface, DelayedBackend, NoPosition>,
        SessionHandle,
        mpsc::UnboundedReceiver<Notice>,
    ) {
        let settings = SessionSettings::from_config(&Config::default()).unwrap();
        let catalog = StyleCatalog::from_config(&settings.styles);
        let (controller, effects) =
            SessionController::start(|options| HeadlessSurface::new(options, catalog), settings)
                .unwrap();
        SessionRuntime::new(
            controller,
            effects,
            RouteProvider::new(DelayedBackend { slow, calls }),
            GeolocationWatcher::new(NoPosition, Duration::from_secs(1)),
        )
    }

    fn navigate(name: &str, coord: Coordinate) -> MapIntent {
        MapIntent {
            destination: Some(PlaceMatch::new(coord, name, PlaceSource::Local)),
            navigation_requested: true,
            ..MapIntent::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_destination_wins() {
        let a = Coordinate::new(135.7681, 35.0116);
        let b = Coordinate::new(135.8048, 34.6851);
        let calls = Arc::new(AtomicUsize::new(0));
        let (runtime, handle, _notices) = runtime(a, calls.clone());
        let task = tokio::spawn(runtime.run());

        handle.apply_intent(navigate("kyoto", a)).unwrap();
        handle.apply_intent(navigate("nara", b)).unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;

        let snapshot = handle.snapshot();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(snapshot.route_overlay_present);
        assert!(!snapshot.route_pending);
        assert_eq!(snapshot.route.and_then(|r| r.end()), Some(b));
        assert_eq!(snapshot.destination.map(|d| d.coordinate), Some(b));

        handle.shutdown().unwrap();
        let surface = task.await.unwrap();
        assert!(surface.is_destroyed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_notices_and_snapshot_flow() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (runtime, handle, mut notices) = runtime(Coordinate::new(0.0, 0.0), calls);
        let mut updates = handle.subscribe();
        let task = tokio::spawn(runtime.run());

        handle
            .apply_intent(MapIntent {
                style: StyleId::Satellite,
                ..MapIntent::default()
            })
            .unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(updates.has_changed().unwrap());
        let snapshot = updates.borrow_and_update().clone();
        assert_eq!(snapshot.style, StyleId::Satellite);
        assert_eq!(snapshot.phase, StyleLoadPhase::Ready);
        assert_eq!(snapshot.buildings, BuildingLayer::Absent);

        handle.shutdown().unwrap();
        task.await.unwrap();

        let mut messages = Vec::new();
        while let Ok(notice) = notices.try_recv() {
            messages.push(notice.message);
        }
        assert_eq!(messages.first().map(String::as_str), Some("Map loaded"));
        assert!(messages.iter().any(|m| m == "Switched to satellite style"));
        assert!(messages.iter().any(|m| m.starts_with("Location unavailable")));
    }

    #[tokio::test]
    async fn test_handle_after_shutdown() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (runtime, handle, _notices) = runtime(Coordinate::new(0.0, 0.0), calls);
        handle.shutdown().unwrap();
        runtime.run().await;
        // The runtime keeps no receiver once it returns
        assert!(matches!(
            handle.apply_intent(MapIntent::default()),
            Err(Error::SessionClosed)
        ));
    }
}
