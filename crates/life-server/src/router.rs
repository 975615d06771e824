//! Axum router construction for the viewer API.
//!
//! Assembles all routes into a single [`Router`] with CORS middleware
//! enabled so a browser client served from elsewhere can reach it.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Header carrying the session token in both directions.
pub const SESSION_HEADER: &str = "x-life-session";

/// Build the complete Axum router for the viewer server.
///
/// The router includes:
/// - `POST /api/view` -- get or create a session, open a view
/// - `GET /api/frame` -- next frame for a view
/// - `POST /api/control` -- apply a control command
/// - `GET /api/updates` -- long-poll for a notification
/// - `DELETE /api/updates` -- withdraw a pending long-poll
/// - `GET /api/status` -- session summary
/// - `GET /api/health` -- liveness check
///
/// CORS allows any origin and exposes the session header so scripts can
/// read the token.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([axum::http::HeaderName::from_static(SESSION_HEADER)]);

    Router::new()
        .route("/api/view", post(handlers::open_view))
        .route("/api/frame", get(handlers::next_frame))
        .route("/api/control", post(handlers::control))
        .route(
            "/api/updates",
            get(handlers::updates).delete(handlers::remove_listener),
        )
        .route("/api/status", get(handlers::status))
        .route("/api/health", get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
