//! HTTP API routes
//!
//! Defines all REST API endpoints for the server.

use crate::coord::Coordinate;
use crate::error::Error;
use crate::format::{available_formats, get_formatter, FormatInfo, RouteReport};
use crate::place::PlaceMatch;
use crate::server::state::AppState;
use crate::session::{MapIntent, Notice, SessionSnapshot, StyleId, StyleLoadPhase};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::debug;
use uuid::Uuid;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/styles", get(styles_handler))
        .route("/api/formats", get(formats_handler))
        .route("/api/search", get(search_handler))
        .route("/api/route", post(route_handler))
        .route("/api/intent", post(intent_handler))
        .route("/api/session", get(session_handler))
        .nest_service("/", ServeDir::new(static_dir()).append_index_html_on_directories(true))
        .with_state(state)
}

/// Static files directory: `./static`, else next to the executable
fn static_dir() -> String {
    if std::path::Path::new("static").exists() {
        return "static".to_string();
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("static")))
        .filter(|path| path.exists())
        .map(|path| path.to_string_lossy().to_string())
        .unwrap_or_else(|| "static".to_string())
}

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    /// Close local place names for a failed search
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "SESSION_CLOSED" => StatusCode::SERVICE_UNAVAILABLE,
            "INTERNAL_ERROR" => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::NotFound { .. } => "NOT_FOUND",
            Error::InvalidCoordinates(_) => "INVALID_COORDINATES",
            Error::SessionClosed => "SESSION_CLOSED",
            Error::Config(_) => "CONFIG_ERROR",
            _ => "INTERNAL_ERROR",
        };
        let suggestions = match &err {
            Error::NotFound { suggestions, .. } => suggestions.clone(),
            _ => Vec::new(),
        };
        ApiError {
            error: err.to_string(),
            code: code.to_string(),
            suggestions,
        }
    }
}

/// Status response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub running: bool,
    pub version: String,
    pub session_id: Uuid,
    pub style: StyleId,
    pub phase: StyleLoadPhase,
    pub uptime_secs: u64,
}

/// Server status endpoint
///
/// GET /api/status
async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let snapshot = state.session.snapshot();
    Json(StatusResponse {
        running: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        session_id: snapshot.session_id,
        style: snapshot.style,
        phase: snapshot.phase,
        uptime_secs: state.uptime_secs(),
    })
}

/// A selectable basemap
#[derive(Debug, Serialize, Deserialize)]
pub struct StyleInfo {
    pub id: StyleId,
    pub reference: String,
}

/// Styles response
#[derive(Debug, Serialize, Deserialize)]
pub struct StylesResponse {
    pub styles: Vec<StyleInfo>,
    pub current: StyleId,
}

/// List basemap styles
///
/// GET /api/styles
async fn styles_handler(State(state): State<Arc<AppState>>) -> Json<StylesResponse> {
    let config = state.config.read().await;
    let styles = StyleId::ALL
        .iter()
        .map(|&id| StyleInfo {
            id,
            reference: config.styles.reference(id).to_string(),
        })
        .collect();

    Json(StylesResponse {
        styles,
        current: state.session.snapshot().style,
    })
}

/// Formats response
#[derive(Debug, Serialize, Deserialize)]
pub struct FormatsResponse {
    pub formats: Vec<FormatInfo>,
}

/// List route output formats
///
/// GET /api/formats
async fn formats_handler() -> Json<FormatsResponse> {
    Json(FormatsResponse {
        formats: available_formats(),
    })
}

/// Search query string
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

/// Resolve a place name
///
/// GET /api/search?q=...
async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<PlaceMatch>, ApiError> {
    debug!(query = %query.q, "search");
    let place = state.resolver.resolve(&query.q).await?;
    Ok(Json(place))
}

/// Route request body
#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub start: Coordinate,
    pub end: Coordinate,
    /// Destination label for the report
    pub name: Option<String>,
    /// Also render the report in this output format
    pub format: Option<String>,
}

/// Route response
#[derive(Debug, Serialize, Deserialize)]
pub struct RouteResponse {
    pub report: RouteReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Plan a route between two points
///
/// POST /api/route
///
/// Never fails once the endpoints are valid: an unreachable router yields
/// a straight-line fallback.
async fn route_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RouteRequest>,
) -> Result<Json<RouteResponse>, ApiError> {
    req.start.validate()?;
    req.end.validate()?;

    let formatter = match req.format.as_deref() {
        Some(name) => Some(get_formatter(name).ok_or_else(|| ApiError {
            error: format!("Unknown format: {}", name),
            code: "INVALID_FORMAT".to_string(),
            suggestions: Vec::new(),
        })?),
        None => None,
    };

    let route = state.routes.get_route(req.start, req.end).await;
    let report = RouteReport::new(req.start, req.end, req.name, route);

    let output = match formatter {
        Some(formatter) => {
            let config = state.config.read().await;
            Some(formatter.format(&report, &config)?)
        }
        None => None,
    };

    Ok(Json(RouteResponse { report, output }))
}

/// Replace the session's intent
///
/// POST /api/intent
async fn intent_handler(
    State(state): State<Arc<AppState>>,
    Json(intent): Json<MapIntent>,
) -> Result<StatusCode, ApiError> {
    if let Some(place) = &intent.destination {
        place.coordinate.validate()?;
    }
    state.session.apply_intent(intent)?;
    Ok(StatusCode::ACCEPTED)
}

/// Session response
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub snapshot: SessionSnapshot,
    pub notices: Vec<Notice>,
}

/// Current session view and recent notices
///
/// GET /api/session
async fn session_handler(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    Json(SessionResponse {
        snapshot: state.session.snapshot(),
        notices: state.recent_notices().await,
    })
}
