//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::app::AppState;
use crate::game::MatchPhase;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;
use crate::ws::protocol::{ModeId, ZoneState};

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - "*" or multiple comma-separated origins
    let cors = if state.config.client_origin.trim() == "*" {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let allowed_origins: Vec<header::HeaderValue> = state
            .config
            .client_origin
            .split(',')
            .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/state", get(state_handler))
        .route("/mode", post(mode_handler))
        .route("/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    phase: MatchPhase,
    players: usize,
    alive: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        phase: state.coordinator.phase(),
        players: state.coordinator.roster().len(),
        alive: state.coordinator.roster().alive_count(),
    })
}

// ============================================================================
// Pull-style state query (late joiners reconcile here; broadcasts retain
// no history)
// ============================================================================

#[derive(Serialize)]
struct StateResponse {
    phase: MatchPhase,
    mode: ModeId,
    zone: ZoneState,
}

async fn state_handler(State(state): State<AppState>) -> Json<StateResponse> {
    Json(StateResponse {
        phase: state.coordinator.phase(),
        mode: state.coordinator.mode(),
        zone: state.coordinator.zone().snapshot(),
    })
}

// ============================================================================
// Mode change
// ============================================================================

#[derive(Deserialize)]
struct ModeRequest {
    mode: ModeId,
}

#[derive(Serialize)]
struct ModeResponse {
    status: &'static str,
    mode: ModeId,
}

async fn mode_handler(
    State(state): State<AppState>,
    Json(req): Json<ModeRequest>,
) -> Result<Json<ModeResponse>, AppError> {
    if !state.coordinator.request_mode_change(req.mode) {
        return Err(AppError::BadRequest(
            "Mode can only be changed in the lobby".to_string(),
        ));
    }

    Ok(Json(ModeResponse {
        status: "ok",
        mode: req.mode,
    }))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
