//! Axum router construction for the relay server.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` -- frameset page
/// - `GET /data` -- viewer page
/// - `GET|POST /fire` -- append demonstration entries
/// - `GET /load` -- redirect to `/fire`
/// - `GET /ws` -- `WebSocket` update stream
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/data", get(handlers::data))
        .route("/fire", get(handlers::fire).post(handlers::fire))
        .route("/load", get(handlers::load))
        .route("/ws", get(ws::ws_updates))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
