//! Page endpoint handlers for the relay server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Frameset holding the viewer and the controls |
//! | `GET` | `/data` | Viewer page: one poll cycle plus the upgrade script |
//! | `GET`, `POST` | `/fire` | Append demonstration entries to the log |
//! | `GET` | `/load` | Redirect to `/fire` |
//!
//! Other methods on `/` and `/data` are answered with `405` by the router.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse};
use tickrelay_core::format_last_mod;
use tickrelay_log::StreamLog;
use tracing::info;

use crate::error::RelayError;
use crate::state::AppState;

/// Host used in the upgrade URL when the request carries none.
const FALLBACK_HOST: &str = "localhost";

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

/// Serve the frameset page.
pub async fn home(State(state): State<Arc<AppState>>) -> Result<Html<String>, RelayError> {
    Ok(Html(state.pages.home()?))
}

// ---------------------------------------------------------------------------
// GET /data
// ---------------------------------------------------------------------------

/// Serve the viewer page.
///
/// Runs one poll cycle, so entries shown here are consumed like any
/// session's. A failed poll shows the error text and a zero `lastMod`.
pub async fn data(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Html<String>, RelayError> {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or(FALLBACK_HOST);

    let (payload, last_mod) = match state.poller.poll().await {
        Ok(snapshot) => (snapshot.payload, format_last_mod(snapshot.observed_at)),
        Err(e) => (e.to_string(), String::from("0")),
    };

    Ok(Html(state.pages.data(host, &payload, &last_mod)?))
}

// ---------------------------------------------------------------------------
// GET|POST /fire
// ---------------------------------------------------------------------------

/// Append `fire.count` entries (`tick = 0..count`), pausing
/// `fire.interval` between appends, then serve the controls page.
pub async fn fire(State(state): State<Arc<AppState>>) -> Result<Html<String>, RelayError> {
    let log = state.poller.log();
    let interval = state.fire.interval();
    for tick in 0..state.fire.count {
        log.append(vec![(String::from("tick"), tick.to_string())])
            .await?;
        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }
    info!(count = state.fire.count, "Appended demonstration entries");
    Ok(Html(state.pages.fire()?))
}

// ---------------------------------------------------------------------------
// GET /load
// ---------------------------------------------------------------------------

/// Redirect to `/fire` with `302 Found`.
pub async fn load() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/fire")])
}
