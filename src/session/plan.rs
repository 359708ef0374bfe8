//! Reconciliation planner
//!
//! Pure function from `(MapIntent, SessionState)` to the ordered steps that
//! bring the surface in line with the intent. An intent the state already
//! satisfies plans nothing.

use crate::coord::Coordinate;
use crate::place::PlaceMatch;
use crate::session::{BuildingLayer, MapIntent, RouteKey, SessionState, StyleId, StyleLoadPhase};

/// One reconciliation step
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Swap the basemap; custom layers are rebuilt after it settles
    LoadStyle(StyleId),
    AddBuildings,
    ShowBuildings,
    HideBuildings,
    /// Replace the destination marker and fly to it
    PlaceDestination(PlaceMatch),
    ClearDestination,
    /// Drop the drawn route, the cached result and any request in flight
    ClearRoute,
    RequestRoute(RouteKey),
    /// Draw the cached route
    DrawRoute,
}

/// Routing origin: the device position, else the fallback
pub fn origin(state: &SessionState, fallback: Coordinate) -> Coordinate {
    state.user_location.unwrap_or(fallback)
}

/// Endpoints the intent wants routed, if navigation is on
pub fn wanted_route(intent: &MapIntent, state: &SessionState, fallback: Coordinate) -> Option<RouteKey> {
    if !intent.navigation_requested {
        return None;
    }
    intent.destination.as_ref().map(|dest| RouteKey {
        origin: origin(state, fallback),
        destination: dest.coordinate,
    })
}

/// Whether the route state belongs to something other than `wanted`
fn route_stale(state: &SessionState, wanted: Option<RouteKey>) -> bool {
    let keys = state
        .pending_route
        .map(|p| p.key)
        .into_iter()
        .chain(state.route.as_ref().map(|r| r.key))
        .chain(state.route_overlay);

    match wanted {
        None => keys.count() > 0,
        Some(want) => keys
            .into_iter()
            .any(|key| key.destination != want.destination),
    }
}

/// Plan the steps that reconcile `state` with `intent`
pub fn plan(intent: &MapIntent, state: &SessionState, fallback_origin: Coordinate) -> Vec<Step> {
    let mut steps = Vec::new();

    let style_changes = intent.style != state.current_style;
    if style_changes {
        steps.push(Step::LoadStyle(intent.style));
    }
    let ready = !style_changes && state.style_phase == StyleLoadPhase::Ready;
    let settled = !style_changes && state.is_settled();

    if ready {
        match (intent.buildings_visible, state.buildings) {
            (true, BuildingLayer::Hidden) => steps.push(Step::ShowBuildings),
            (true, BuildingLayer::Absent) if settled && !state.buildings_unavailable => {
                steps.push(Step::AddBuildings)
            }
            (false, BuildingLayer::Shown) => steps.push(Step::HideBuildings),
            _ => {}
        }
    }

    match (&intent.destination, &state.destination) {
        (Some(want), have) if have.as_ref() != Some(want) => {
            steps.push(Step::PlaceDestination(want.clone()))
        }
        (None, Some(_)) => steps.push(Step::ClearDestination),
        _ => {}
    }

    let wanted = wanted_route(intent, state, fallback_origin);
    let cleared = route_stale(state, wanted);
    if cleared {
        steps.push(Step::ClearRoute);
    }

    if let Some(key) = wanted {
        let (cached, pending, overlay) = if cleared {
            (None, None, None)
        } else {
            (
                state.route.as_ref().map(|r| r.key),
                state.pending_route.map(|p| p.key),
                state.route_overlay,
            )
        };

        if cached != Some(key) && pending != Some(key) {
            steps.push(Step::RequestRoute(key));
        } else if cached == Some(key) && settled && overlay != Some(key) {
            steps.push(Step::DrawRoute);
        }
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::PlaceSource;
    use crate::route::RouteResult;
    use crate::session::{CachedRoute, PendingRoute, RouteTicket};

    fn settled_state() -> SessionState {
        let mut state = SessionState::new(StyleId::Default);
        state.style_phase = StyleLoadPhase::Ready;
        state.sources_settled = true;
        state
    }

    fn place(name: &str, lng: f64, lat: f64) -> PlaceMatch {
        PlaceMatch::new(Coordinate::new(lng, lat), name, PlaceSource::Local)
    }

    fn fallback() -> Coordinate {
        Coordinate::new(139.7671, 35.6812)
    }

    #[test]
    fn test_style_change_defers_buildings() {
        let state = settled_state();
        let intent = MapIntent {
            style: StyleId::Satellite,
            ..MapIntent::default()
        };
        assert_eq!(plan(&intent, &state, fallback()), vec![Step::LoadStyle(StyleId::Satellite)]);
    }

    #[test]
    fn test_buildings_wait_for_settle() {
        let mut state = settled_state();
        state.sources_settled = false;
        assert!(plan(&MapIntent::default(), &state, fallback()).is_empty());

        state.sources_settled = true;
        assert_eq!(plan(&MapIntent::default(), &state, fallback()), vec![Step::AddBuildings]);
    }

    #[test]
    fn test_buildings_toggle() {
        let mut state = settled_state();
        state.buildings = BuildingLayer::Shown;
        let hide = MapIntent {
            buildings_visible: false,
            ..MapIntent::default()
        };
        assert_eq!(plan(&hide, &state, fallback()), vec![Step::HideBuildings]);

        state.buildings = BuildingLayer::Hidden;
        assert!(plan(&hide, &state, fallback()).is_empty());
        assert_eq!(plan(&MapIntent::default(), &state, fallback()), vec![Step::ShowBuildings]);
    }

    #[test]
    fn test_unavailable_buildings_not_retried() {
        let mut state = settled_state();
        state.buildings_unavailable = true;
        assert!(plan(&MapIntent::default(), &state, fallback()).is_empty());
    }

    #[test]
    fn test_satisfied_intent_plans_nothing() {
        let dest = place("tokyo tower", 139.7454, 35.6586);
        let key = RouteKey {
            origin: fallback(),
            destination: dest.coordinate,
        };
        let mut state = settled_state();
        state.buildings = BuildingLayer::Shown;
        state.destination = Some(dest.clone());
        state.route = Some(CachedRoute {
            key,
            result: RouteResult::fallback(key.origin, key.destination),
            announced: true,
        });
        state.route_overlay = Some(key);

        let intent = MapIntent {
            destination: Some(dest),
            navigation_requested: true,
            ..MapIntent::default()
        };
        assert!(plan(&intent, &state, fallback()).is_empty());
    }

    #[test]
    fn test_navigation_requests_route_from_fallback() {
        let dest = place("osaka", 135.5023, 34.6937);
        let mut state = settled_state();
        state.buildings = BuildingLayer::Shown;
        state.destination = Some(dest.clone());

        let intent = MapIntent {
            destination: Some(dest.clone()),
            navigation_requested: true,
            ..MapIntent::default()
        };
        assert_eq!(
            plan(&intent, &state, fallback()),
            vec![Step::RequestRoute(RouteKey {
                origin: fallback(),
                destination: dest.coordinate,
            })]
        );

        state.user_location = Some(Coordinate::new(139.0, 35.0));
        assert_eq!(
            plan(&intent, &state, fallback()),
            vec![Step::RequestRoute(RouteKey {
                origin: Coordinate::new(139.0, 35.0),
                destination: dest.coordinate,
            })]
        );
    }

    #[test]
    fn test_pending_route_not_requested_twice() {
        let dest = place("osaka", 135.5023, 34.6937);
        let key = RouteKey {
            origin: fallback(),
            destination: dest.coordinate,
        };
        let mut state = settled_state();
        state.buildings = BuildingLayer::Shown;
        state.destination = Some(dest.clone());
        state.pending_route = Some(PendingRoute {
            ticket: RouteTicket(1),
            key,
        });

        let intent = MapIntent {
            destination: Some(dest),
            navigation_requested: true,
            ..MapIntent::default()
        };
        assert!(plan(&intent, &state, fallback()).is_empty());
    }

    #[test]
    fn test_new_destination_clears_route() {
        let a = place("kyoto", 135.7681, 35.0116);
        let b = place("nara", 135.8048, 34.6851);
        let key_a = RouteKey {
            origin: fallback(),
            destination: a.coordinate,
        };
        let mut state = settled_state();
        state.buildings = BuildingLayer::Shown;
        state.destination = Some(a);
        state.pending_route = Some(PendingRoute {
            ticket: RouteTicket(1),
            key: key_a,
        });

        let intent = MapIntent {
            destination: Some(b.clone()),
            navigation_requested: true,
            ..MapIntent::default()
        };
        assert_eq!(
            plan(&intent, &state, fallback()),
            vec![
                Step::PlaceDestination(b.clone()),
                Step::ClearRoute,
                Step::RequestRoute(RouteKey {
                    origin: fallback(),
                    destination: b.coordinate,
                }),
            ]
        );
    }

    #[test]
    fn test_clearing_destination_clears_route() {
        let dest = place("nara", 135.8048, 34.6851);
        let key = RouteKey {
            origin: fallback(),
            destination: dest.coordinate,
        };
        let mut state = settled_state();
        state.buildings = BuildingLayer::Shown;
        state.destination = Some(dest);
        state.route = Some(CachedRoute {
            key,
            result: RouteResult::fallback(key.origin, key.destination),
            announced: true,
        });
        state.route_overlay = Some(key);

        assert_eq!(
            plan(&MapIntent::default(), &state, fallback()),
            vec![Step::ClearDestination, Step::ClearRoute]
        );
    }

    #[test]
    fn test_cached_route_redrawn_after_settle() {
        let dest = place("nara", 135.8048, 34.6851);
        let key = RouteKey {
            origin: fallback(),
            destination: dest.coordinate,
        };
        let mut state = settled_state();
        state.buildings = BuildingLayer::Shown;
        state.destination = Some(dest.clone());
        state.route = Some(CachedRoute {
            key,
            result: RouteResult::fallback(key.origin, key.destination),
            announced: true,
        });

        let intent = MapIntent {
            destination: Some(dest),
            navigation_requested: true,
            ..MapIntent::default()
        };

        state.sources_settled = false;
        assert!(plan(&intent, &state, fallback()).is_empty());

        state.sources_settled = true;
        assert_eq!(plan(&intent, &state, fallback()), vec![Step::DrawRoute]);
    }
}
